//! Consolidated dataset snapshot: the full record collection to/from JSON.
//!
//! The file is a flat JSON array of records whose keys never change
//! between versions; the analyzer and the dashboard both read it.

use crate::{
    error::{AuditError, AuditResult},
    record::ConsolidatedRecord,
    source::DatasetStore,
};

pub struct JsonSnapshot {
    path: String,
}

impl JsonSnapshot {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl DatasetStore for JsonSnapshot {
    fn write(&self, records: &[ConsolidatedRecord]) -> AuditResult<()> {
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, json).map_err(|e| AuditError::io(&self.path, e))?;
        log::info!("Wrote {} consolidated records to {}", records.len(), self.path);
        Ok(())
    }

    fn read(&self) -> AuditResult<Vec<ConsolidatedRecord>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| AuditError::io(&self.path, e))?;
        let records: Vec<ConsolidatedRecord> = serde_json::from_str(&content)?;
        log::debug!("Read {} consolidated records from {}", records.len(), self.path);
        Ok(records)
    }
}
