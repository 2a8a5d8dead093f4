use thiserror::Error;

/// Failures of the coach workflows, tagged with a machine-readable kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoachError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A rewritten summary did not keep the shape of its source.
    #[error("{0}")]
    Validation(String),
}

impl CoachError {
    pub fn code(&self) -> &'static str {
        match self {
            CoachError::BadRequest(_) => "BAD_REQUEST",
            CoachError::NotFound(_) => "NOT_FOUND",
            CoachError::Conflict(_) => "CONFLICT",
            CoachError::Validation(_) => "VALIDATION",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CoachError::BadRequest(m)
            | CoachError::NotFound(m)
            | CoachError::Conflict(m)
            | CoachError::Validation(m) => m,
        }
    }
}
