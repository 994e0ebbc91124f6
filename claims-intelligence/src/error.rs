use std::time::Duration;

use claims_flow::GraphError;
use thiserror::Error;

/// Errors raised by the claims pipelines.
///
/// `Input`, `Service`, `Parse` and `Schema` are the user-facing taxonomy; the
/// remaining variants cover configuration and local storage.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// Missing or empty required input. The caller should re-prompt.
    #[error("invalid input: {0}")]
    Input(String),

    /// The completion, embedding or OCR service was unreachable or rejected the call.
    #[error("service error: {0}")]
    Service(String),

    /// Model output did not have the required shape.
    #[error("could not parse model output: {0}")]
    Parse(String),

    /// A persisted audit log does not carry the expected columns.
    #[error("audit schema mismatch: expected {expected:?}, found {found:?}")]
    Schema {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClaimsError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::Service(format!("timeout after {}s", limit.as_secs_f64()))
    }

    /// Recover a `ClaimsError` raised inside a workflow task.
    pub fn from_graph_error(error: &GraphError) -> Option<&ClaimsError> {
        match error {
            GraphError::Other(source) => source.downcast_ref::<ClaimsError>(),
            _ => None,
        }
    }
}

impl From<ClaimsError> for GraphError {
    fn from(error: ClaimsError) -> Self {
        GraphError::Other(anyhow::Error::new(error))
    }
}

pub type Result<T> = std::result::Result<T, ClaimsError>;
