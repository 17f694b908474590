// WHY: Engine failures are local and deterministic, so they get a typed enum
// I/O-facing code (reader, export, CLI) stays on anyhow

use thiserror::Error;

/// Errors raised by the search engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElsError {
    /// A caller-supplied parameter is outside its valid domain
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// A dedicated worker pool could not be started
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl ElsError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// True for rejected input, as opposed to an execution failure
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}

pub type Result<T> = std::result::Result<T, ElsError>;
