// riskwatch/src/error.rs
//
// Request-level failures. Scoring itself never fails: degraded inputs fall
// back to documented scores inside the workers, and alert failures are
// logged and swallowed by the dispatcher.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ScoringError {
    /// Caller sent an unusable request (missing user_id, malformed body).
    #[error("{0}")]
    Validation(String),

    /// The score record could not be written. Fatal: the record is the audit trail.
    #[error("failed to persist fraud score for {user_id}: {source}")]
    Persistence {
        user_id: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to encode response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScoringError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Persistence { .. } | Self::Serialization(_) => 500,
        }
    }
}
