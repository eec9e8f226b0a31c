//! Shared primitive types used across the whole pipeline.

use serde::{Deserialize, Serialize};

/// Customer identifier as stored in the source database (`id_cliente`).
pub type SubjectId = i64;

/// Outcome of the legacy credit model.
///
/// Persisted with the labels the downstream dashboard reads
/// (`APROBADO` / `RECHAZADO`); the English labels are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "APROBADO", alias = "APPROVED")]
    Approved,
    #[serde(rename = "RECHAZADO", alias = "REJECTED")]
    Rejected,
}

impl Decision {
    pub fn is_rejected(self) -> bool {
        matches!(self, Decision::Rejected)
    }
}
