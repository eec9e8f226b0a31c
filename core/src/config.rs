use serde::{Deserialize, Serialize};

pub const DEFAULT_SCORING_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SUSPICIOUS_LOCALITY_LIMIT: usize = 10;

/// Everything a pipeline run needs to locate its collaborators.
///
/// Passed explicitly into each source/store constructor; nothing in the
/// library reads process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// SQLite database holding `clientes`, `solicitudes_credito`,
    /// `historial_pagos` and `bienes_raices`.
    pub database_path: String,
    /// Predictions file written by the scoring step (`{"data": [...]}`).
    pub predictions_path: String,
    /// Consolidated snapshot read by the analyzer.
    pub consolidated_path: String,
    /// Batch endpoint of the scoring service.
    pub scoring_url: String,
    #[serde(default = "default_scoring_timeout")]
    pub scoring_timeout_secs: u64,
    #[serde(default = "default_locality_limit")]
    pub suspicious_locality_limit: usize,
}

fn default_scoring_timeout() -> u64 {
    DEFAULT_SCORING_TIMEOUT_SECS
}

fn default_locality_limit() -> usize {
    DEFAULT_SUSPICIOUS_LOCALITY_LIMIT
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            database_path: "banco.db".into(),
            predictions_path: "data.json".into(),
            consolidated_path: "datos_consolidados.json".into(),
            scoring_url: "http://localhost:8000/predict_batch".into(),
            scoring_timeout_secs: DEFAULT_SCORING_TIMEOUT_SECS,
            suspicious_locality_limit: DEFAULT_SUSPICIOUS_LOCALITY_LIMIT,
        }
    }
}

impl AuditConfig {
    /// Load from a JSON config file. Missing optional keys take defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AuditConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        config.validate()?;
        log::debug!("Loaded audit config from {path}");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path cannot be empty");
        }
        if !self.scoring_url.starts_with("http://") && !self.scoring_url.starts_with("https://") {
            anyhow::bail!("scoring_url must start with http:// or https://");
        }
        if self.suspicious_locality_limit == 0 {
            anyhow::bail!("suspicious_locality_limit must be at least 1");
        }
        Ok(())
    }

    /// Config with in-memory database and temp-dir files, for tests.
    pub fn default_test() -> Self {
        let dir = std::env::temp_dir();
        Self {
            database_path: ":memory:".into(),
            predictions_path: dir.join("audit_test_data.json").display().to_string(),
            consolidated_path: dir
                .join("audit_test_consolidated.json")
                .display()
                .to_string(),
            ..Self::default()
        }
    }
}
