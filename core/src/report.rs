//! Rendering of a [`BiasReport`]. Presentation only; the analyzer never
//! formats anything itself.

use crate::{
    bias_analysis::{BiasReport, EthnicityBreakdown, GroupRow},
    summary::DatasetSummary,
};
use std::io::{self, Write};

pub trait ReportRenderer {
    fn render(&self, report: &BiasReport, out: &mut dyn Write) -> io::Result<()>;
}

/// Plain-text tables for a terminal.
pub struct TextRenderer {
    /// Rows shown in the per-locality table.
    pub locality_rows: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self { locality_rows: 10 }
    }
}

impl ReportRenderer for TextRenderer {
    fn render(&self, report: &BiasReport, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "=== BIAS AUDIT ({} records) ===", report.total_records)?;
        writeln!(out, "  generated: {}", report.generated_at.to_rfc3339())?;

        section(out, "1. By nationality")?;
        group_table(out, &report.by_nationality)?;

        section(
            out,
            &format!("2. By locality (top {} by rejection)", self.locality_rows),
        )?;
        let shown = report.by_locality.len().min(self.locality_rows);
        group_table(out, &report.by_locality[..shown])?;

        section(out, "3. By sex")?;
        group_table(out, &report.by_sex)?;

        section(out, "4. By age bracket")?;
        header(out)?;
        for row in &report.by_age {
            group_line(out, row.key.label(), row)?;
        }

        section(out, "5. By ethnicity")?;
        match &report.by_ethnicity {
            EthnicityBreakdown::NoData => writeln!(out, "  No ethnicity data available")?,
            EthnicityBreakdown::Groups(rows) => group_table(out, rows)?,
        }

        let cross = &report.suspicious_localities;
        section(out, "6. High rejection despite above-median income")?;
        writeln!(
            out,
            "  median income: {:.2} | baseline rejection: {:.2}%",
            cross.income_median, cross.baseline_rejection_rate
        )?;
        if cross.localities.is_empty() {
            writeln!(out, "  (none)")?;
        } else {
            group_table(out, &cross.localities)?;
        }

        section(out, "7. Mean score by nationality within income quartiles")?;
        for q in &report.income_controlled {
            writeln!(
                out,
                "  {} [{:.2} .. {:.2}] ({} records)",
                q.quartile.label(),
                q.income_lower,
                q.income_upper,
                q.count
            )?;
            for s in &q.scores {
                writeln!(out, "    {:<24} {:>10.2} ({})", s.nationality, s.mean_score, s.count)?;
            }
        }
        Ok(())
    }
}

/// The report as pretty JSON, for dashboards and archiving.
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn render(&self, report: &BiasReport, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)
    }
}

pub fn render_summary(summary: &DatasetSummary, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "=== DATASET SUMMARY ===")?;
    writeln!(out, "  records:        {}", summary.total_records)?;
    writeln!(
        out,
        "  approved:       {} ({:.2}%)",
        summary.approved, summary.approved_pct
    )?;
    writeln!(
        out,
        "  rejected:       {} ({:.2}%)",
        summary.rejected, summary.rejected_pct
    )?;
    writeln!(out, "  nationalities:  {}", summary.nationalities)?;
    writeln!(out, "  localities:     {}", summary.localities)
}

fn section(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "-- {title}")
}

fn header(out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "  {:<24} {:>10} {:>10} {:>14} {:>8}",
        "group", "% reject", "score", "income", "count"
    )
}

fn group_table(out: &mut dyn Write, rows: &[GroupRow<String>]) -> io::Result<()> {
    header(out)?;
    for row in rows {
        group_line(out, &row.key, row)?;
    }
    Ok(())
}

fn group_line<K>(out: &mut dyn Write, label: &str, row: &GroupRow<K>) -> io::Result<()> {
    writeln!(
        out,
        "  {:<24} {:>10.2} {:>10.2} {:>14.2} {:>8}",
        label, row.stats.rejection_rate, row.stats.mean_score, row.stats.mean_income, row.stats.count
    )
}
