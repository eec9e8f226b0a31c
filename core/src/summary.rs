//! Headline figures for a consolidated dataset.

use crate::{
    record::ConsolidatedRecord,
    stats::{percentage, round2},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub approved: usize,
    pub rejected: usize,
    pub approved_pct: f64,
    pub rejected_pct: f64,
    /// Distinct non-missing nationalities.
    pub nationalities: usize,
    /// Distinct non-empty localities.
    pub localities: usize,
}

impl DatasetSummary {
    pub fn of(records: &[ConsolidatedRecord]) -> Self {
        let rejected = records.iter().filter(|r| r.is_rejected()).count();
        let approved = records.len() - rejected;
        let nationalities: BTreeSet<&str> = records
            .iter()
            .filter_map(|r| r.nationality.as_deref())
            .filter(|n| !n.is_empty())
            .collect();
        let localities: BTreeSet<&str> = records
            .iter()
            .map(|r| r.locality.as_str())
            .filter(|l| !l.is_empty())
            .collect();

        Self {
            total_records: records.len(),
            approved,
            rejected,
            approved_pct: round2(percentage(approved, records.len())),
            rejected_pct: round2(percentage(rejected, records.len())),
            nationalities: nationalities.len(),
            localities: localities.len(),
        }
    }
}
