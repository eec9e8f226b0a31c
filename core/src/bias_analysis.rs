//! Bias analyzer: disparate-impact signals over the consolidated dataset.
//!
//! Seven analyses, all built on one aggregation primitive:
//!   1. Rejection rate by nationality
//!   2. Rejection rate by locality (comuna)
//!   3. Rejection rate by sex
//!   4. Rejection rate by age bracket (natural bracket order)
//!   5. Rejection rate by ethnicity (records without ethnicity excluded)
//!   6. Localities with above-median income yet above-baseline rejection
//!   7. Mean risk score by nationality within each income quartile
//!
//! Every analysis is a pure function of the record slice; input order never
//! affects the result.

use crate::{
    error::{AuditError, AuditResult},
    record::ConsolidatedRecord,
    stats::{mean, median, percentage, quantile_sorted, round2},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Aggregation primitive ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Percentage of REJECTED decisions in the group, 2 decimals.
    pub rejection_rate: f64,
    pub mean_score: f64,
    pub mean_income: f64,
    pub count: usize,
}

/// Group records by `key_fn` and summarize each group.
///
/// Records for which `key_fn` returns `None` belong to no group. Groups
/// exist only for observed keys, so no group is ever empty.
pub fn aggregate_by<K, F>(records: &[ConsolidatedRecord], key_fn: F) -> BTreeMap<K, GroupStats>
where
    K: Ord,
    F: Fn(&ConsolidatedRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<&ConsolidatedRecord>> = BTreeMap::new();
    for record in records {
        if let Some(key) = key_fn(record) {
            groups.entry(key).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let rejected = members.iter().filter(|r| r.is_rejected()).count();
            let stats = GroupStats {
                rejection_rate: round2(percentage(rejected, members.len())),
                mean_score: round2(mean(members.iter().map(|r| r.risk_score))),
                mean_income: round2(mean(members.iter().map(|r| r.monthly_income))),
                count: members.len(),
            };
            (key, stats)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow<K> {
    pub key: K,
    #[serde(flatten)]
    pub stats: GroupStats,
}

/// Highest rejection rate first; ties keep key order.
pub fn rank_by_rejection<K>(groups: BTreeMap<K, GroupStats>) -> Vec<GroupRow<K>> {
    let mut rows: Vec<GroupRow<K>> = groups
        .into_iter()
        .map(|(key, stats)| GroupRow { key, stats })
        .collect();
    rows.sort_by(|a, b| b.stats.rejection_rate.total_cmp(&a.stats.rejection_rate));
    rows
}

// ── Age brackets ─────────────────────────────────────────────────────────────

pub const MAX_SUPPORTED_AGE: i64 = 100;

/// Right-inclusive age brackets: (0,25], (25,35], ... (65,100].
/// Age 0 falls in the first bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "18-25")]
    UpTo25,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "36-45")]
    From36To45,
    #[serde(rename = "46-55")]
    From46To55,
    #[serde(rename = "56-65")]
    From56To65,
    #[serde(rename = "66+")]
    Over65,
}

impl AgeBracket {
    /// `None` for negative ages and ages above [`MAX_SUPPORTED_AGE`].
    pub fn for_age(age: i64) -> Option<Self> {
        match age {
            0..=25 => Some(AgeBracket::UpTo25),
            26..=35 => Some(AgeBracket::From26To35),
            36..=45 => Some(AgeBracket::From36To45),
            46..=55 => Some(AgeBracket::From46To55),
            56..=65 => Some(AgeBracket::From56To65),
            66..=MAX_SUPPORTED_AGE => Some(AgeBracket::Over65),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeBracket::UpTo25 => "18-25",
            AgeBracket::From26To35 => "26-35",
            AgeBracket::From36To45 => "36-45",
            AgeBracket::From46To55 => "46-55",
            AgeBracket::From56To65 => "56-65",
            AgeBracket::Over65 => "66+",
        }
    }
}

/// Aggregation by age bracket, in bracket order.
pub fn age_breakdown(records: &[ConsolidatedRecord]) -> AuditResult<Vec<GroupRow<AgeBracket>>> {
    if let Some(r) = records
        .iter()
        .find(|r| AgeBracket::for_age(r.age).is_none())
    {
        return Err(AuditError::AgeOutOfRange {
            subject_id: r.subject_id,
            age: r.age,
        });
    }
    Ok(aggregate_by(records, |r| AgeBracket::for_age(r.age))
        .into_iter()
        .map(|(key, stats)| GroupRow { key, stats })
        .collect())
}

// ── Ethnicity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "groups", rename_all = "snake_case")]
pub enum EthnicityBreakdown {
    /// No record carries an ethnicity value.
    NoData,
    Groups(Vec<GroupRow<String>>),
}

pub fn ethnicity_breakdown(records: &[ConsolidatedRecord]) -> EthnicityBreakdown {
    let groups = aggregate_by(records, |r| r.ethnicity.clone());
    if groups.is_empty() {
        EthnicityBreakdown::NoData
    } else {
        EthnicityBreakdown::Groups(rank_by_rejection(groups))
    }
}

// ── Locality cross-tabulation ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityCrossTab {
    /// Median monthly income over all records.
    pub income_median: f64,
    /// Overall rejection percentage over all records.
    pub baseline_rejection_rate: f64,
    /// Localities above both thresholds, highest rejection first.
    pub localities: Vec<GroupRow<String>>,
}

pub fn baseline_rejection_rate(records: &[ConsolidatedRecord]) -> f64 {
    let rejected = records.iter().filter(|r| r.is_rejected()).count();
    percentage(rejected, records.len())
}

/// Localities whose mean income exceeds the dataset median while their
/// rejection rate exceeds the baseline.
pub fn suspicious_localities(
    by_locality: &[GroupRow<String>],
    records: &[ConsolidatedRecord],
    limit: usize,
) -> LocalityCrossTab {
    let incomes: Vec<f64> = records.iter().map(|r| r.monthly_income).collect();
    let income_median = median(&incomes);
    let baseline = baseline_rejection_rate(records);

    let mut localities: Vec<GroupRow<String>> = by_locality
        .iter()
        .filter(|row| {
            row.stats.mean_income > income_median && row.stats.rejection_rate > baseline
        })
        .cloned()
        .collect();
    localities.sort_by(|a, b| b.stats.rejection_rate.total_cmp(&a.stats.rejection_rate));
    localities.truncate(limit);

    LocalityCrossTab {
        income_median,
        baseline_rejection_rate: round2(baseline),
        localities,
    }
}

// ── Income-controlled nationality comparison ─────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncomeQuartile {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl IncomeQuartile {
    pub const ALL: [IncomeQuartile; 4] = [
        IncomeQuartile::Q1,
        IncomeQuartile::Q2,
        IncomeQuartile::Q3,
        IncomeQuartile::Q4,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IncomeQuartile::Q1 => "Q1",
            IncomeQuartile::Q2 => "Q2",
            IncomeQuartile::Q3 => "Q3",
            IncomeQuartile::Q4 => "Q4",
        }
    }
}

/// The five quantile cut-points (min, 25%, 50%, 75%, max) of monthly income.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuartileEdges(pub [f64; 5]);

impl QuartileEdges {
    pub fn from_records(records: &[ConsolidatedRecord]) -> Self {
        let mut incomes: Vec<f64> = records.iter().map(|r| r.monthly_income).collect();
        incomes.sort_by(f64::total_cmp);
        let mut edges = [0.0; 5];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = quantile_sorted(&incomes, i as f64 / 4.0);
        }
        QuartileEdges(edges)
    }

    /// Bins are right-inclusive and the lowest edge is inclusive, so every
    /// income inside [min, max] lands in exactly one quartile. Repeated
    /// cut-points leave the later quartile empty.
    pub fn quartile_of(&self, income: f64) -> IncomeQuartile {
        IncomeQuartile::ALL
            .into_iter()
            .zip(self.0[1..].iter())
            .find(|(_, upper)| income <= **upper)
            .map(|(q, _)| q)
            .unwrap_or(IncomeQuartile::Q4)
    }

    pub fn bounds(&self, quartile: IncomeQuartile) -> (f64, f64) {
        let i = quartile as usize;
        (self.0[i], self.0[i + 1])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalityScore {
    pub nationality: String,
    pub mean_score: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuartileComparison {
    pub quartile: IncomeQuartile,
    pub income_lower: f64,
    pub income_upper: f64,
    /// All records in the quartile, with or without nationality.
    pub count: usize,
    /// Lowest mean score first.
    pub scores: Vec<NationalityScore>,
}

pub fn income_controlled_scores(records: &[ConsolidatedRecord]) -> Vec<QuartileComparison> {
    let edges = QuartileEdges::from_records(records);

    let mut buckets: BTreeMap<IncomeQuartile, Vec<&ConsolidatedRecord>> = IncomeQuartile::ALL
        .into_iter()
        .map(|q| (q, Vec::new()))
        .collect();
    for record in records {
        buckets
            .entry(edges.quartile_of(record.monthly_income))
            .or_default()
            .push(record);
    }

    buckets
        .into_iter()
        .map(|(quartile, members)| {
            let mut by_nationality: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            for r in &members {
                if let Some(nat) = r.nationality.as_deref() {
                    by_nationality.entry(nat).or_default().push(r.risk_score);
                }
            }
            let mut scores: Vec<NationalityScore> = by_nationality
                .into_iter()
                .map(|(nat, s)| NationalityScore {
                    nationality: nat.to_string(),
                    mean_score: round2(mean(s.iter().copied())),
                    count: s.len(),
                })
                .collect();
            scores.sort_by(|a, b| a.mean_score.total_cmp(&b.mean_score));

            let (income_lower, income_upper) = edges.bounds(quartile);
            QuartileComparison {
                quartile,
                income_lower,
                income_upper,
                count: members.len(),
                scores,
            }
        })
        .collect()
}

// ── Analyzer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub by_nationality: Vec<GroupRow<String>>,
    pub by_locality: Vec<GroupRow<String>>,
    pub by_sex: Vec<GroupRow<String>>,
    pub by_age: Vec<GroupRow<AgeBracket>>,
    pub by_ethnicity: EthnicityBreakdown,
    pub suspicious_localities: LocalityCrossTab,
    pub income_controlled: Vec<QuartileComparison>,
}

pub struct BiasAnalyzer {
    suspicious_locality_limit: usize,
}

impl Default for BiasAnalyzer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SUSPICIOUS_LOCALITY_LIMIT)
    }
}

impl BiasAnalyzer {
    pub fn new(suspicious_locality_limit: usize) -> Self {
        Self {
            suspicious_locality_limit,
        }
    }

    pub fn analyze(&self, records: &[ConsolidatedRecord]) -> AuditResult<BiasReport> {
        if records.is_empty() {
            log::warn!("Bias analysis started on an empty dataset");
        }
        log::info!("Analyzing {} consolidated records", records.len());

        let by_age = age_breakdown(records)?;
        let by_nationality = rank_by_rejection(aggregate_by(records, |r| r.nationality.clone()));
        let by_locality = rank_by_rejection(aggregate_by(records, |r| Some(r.locality.clone())));
        let by_sex = rank_by_rejection(aggregate_by(records, |r| Some(r.sex.clone())));
        let by_ethnicity = ethnicity_breakdown(records);
        if by_ethnicity == EthnicityBreakdown::NoData {
            log::info!("No ethnicity data available; ethnicity breakdown skipped");
        }

        let suspicious =
            suspicious_localities(&by_locality, records, self.suspicious_locality_limit);
        log::debug!(
            "Locality cross-tab: median income {:.2}, baseline rejection {:.2}%, {} flagged",
            suspicious.income_median,
            suspicious.baseline_rejection_rate,
            suspicious.localities.len()
        );

        let income_controlled = income_controlled_scores(records);

        Ok(BiasReport {
            generated_at: Utc::now(),
            total_records: records.len(),
            by_nationality,
            by_locality,
            by_sex,
            by_age,
            by_ethnicity,
            suspicious_localities: suspicious,
            income_controlled,
        })
    }
}
