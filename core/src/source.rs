//! Collaborator seams of the pipeline.
//!
//! RULE: The consolidator and analyzer never open files, sockets or
//! databases themselves. Every input arrives through one of these traits,
//! so a run can be driven by fakes in tests.

use crate::{
    error::{AuditError, AuditResult},
    record::{ConsolidatedRecord, Prediction, SubjectRecord},
};
use serde::Deserialize;

/// Yields subject rows (demographic, financial, employment, product).
pub trait RecordSource {
    fn fetch_subjects(&self) -> AuditResult<Vec<SubjectRecord>>;
}

/// Yields previously computed predictions.
pub trait PredictionSource {
    fn fetch_predictions(&self) -> AuditResult<Vec<Prediction>>;
}

/// Durable snapshot of the consolidated dataset.
pub trait DatasetStore {
    fn write(&self, records: &[ConsolidatedRecord]) -> AuditResult<()>;
    fn read(&self) -> AuditResult<Vec<ConsolidatedRecord>>;
}

#[derive(Debug, Deserialize)]
struct PredictionEnvelope {
    data: Vec<Prediction>,
}

/// Predictions file as written by the scoring step: `{"data": [...]}`.
pub struct PredictionFile {
    path: String,
}

impl PredictionFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl PredictionSource for PredictionFile {
    fn fetch_predictions(&self) -> AuditResult<Vec<Prediction>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| AuditError::io(&self.path, e))?;
        let envelope: PredictionEnvelope = serde_json::from_str(&content)?;
        log::debug!(
            "Loaded {} predictions from {}",
            envelope.data.len(),
            self.path
        );
        Ok(envelope.data)
    }
}
