//! Pipeline stages, wired against the collaborator traits.
//!
//! STAGE ORDER (each stage is a separate, run-to-completion batch):
//!   1. Scoring:       record source → scoring service → predictions file
//!   2. Consolidation: record source + predictions → consolidated snapshot
//!   3. Analysis:      consolidated snapshot → bias report
//!
//! RULES:
//!   - Any collaborator failure aborts the stage; nothing partial is kept.
//!   - Unmatched predictions are dropped, never fatal.

use crate::{
    bias_analysis::{BiasAnalyzer, BiasReport},
    consolidation::{consolidate, index_subjects, join_diagnostics, JoinDiagnostics},
    error::{AuditError, AuditResult},
    scoring::{predictions_in, Scorer},
    source::{DatasetStore, PredictionSource, RecordSource},
    store::SubjectStore,
    summary::DatasetSummary,
};
use serde::{Deserialize, Serialize};

/// Fetch scoring features, score them in one batch and persist the
/// service response at `predictions_path`. Returns the prediction count.
pub fn run_scoring(
    store: &SubjectStore,
    scorer: &dyn Scorer,
    predictions_path: &str,
) -> AuditResult<usize> {
    let features = store.scoring_features()?;
    log::info!("Scoring {} subjects", features.len());

    let response = scorer.predict_batch(&features)?;
    let predictions = predictions_in(&response)?;

    let json = serde_json::to_string_pretty(&response)?;
    std::fs::write(predictions_path, json).map_err(|e| AuditError::io(predictions_path, e))?;
    log::info!(
        "Wrote {} predictions to {predictions_path}",
        predictions.len()
    );
    Ok(predictions.len())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationOutcome {
    pub summary: DatasetSummary,
    pub diagnostics: JoinDiagnostics,
}

pub fn run_consolidation(
    records: &dyn RecordSource,
    predictions: &dyn PredictionSource,
    dataset: &dyn DatasetStore,
) -> AuditResult<ConsolidationOutcome> {
    log::info!("Fetching subject records");
    let subjects = index_subjects(records.fetch_subjects()?);

    log::info!("Fetching predictions");
    let predictions = predictions.fetch_predictions()?;

    let consolidated = consolidate(&subjects, &predictions);
    let diagnostics = join_diagnostics(&subjects, &predictions);
    log::info!(
        "Consolidated {} of {} predictions ({} without a subject record)",
        diagnostics.matched,
        diagnostics.predictions,
        diagnostics.unmatched
    );

    dataset.write(&consolidated)?;

    Ok(ConsolidationOutcome {
        summary: DatasetSummary::of(&consolidated),
        diagnostics,
    })
}

pub fn run_analysis(
    dataset: &dyn DatasetStore,
    analyzer: &BiasAnalyzer,
) -> AuditResult<BiasReport> {
    let records = dataset.read()?;
    analyzer.analyze(&records)
}
