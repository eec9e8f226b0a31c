use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scoring request failed: {0}")]
    ScoringTransport(#[from] reqwest::Error),

    #[error("Scoring service returned {status}: {body}")]
    ScoringRejected { status: u16, body: String },

    #[error("Age {age} is outside the supported range 0..=100 (subject {subject_id})")]
    AgeOutOfRange { subject_id: i64, age: i64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuditError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AuditError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AuditResult<T> = Result<T, AuditError>;
