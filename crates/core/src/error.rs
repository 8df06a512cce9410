use providers::ServiceError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// How a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Rejected locally before any request was sent.
    Validation,
    /// The service answered with an error, or could not be reached.
    RequestFailure,
    /// Some items of a batch failed.
    PartialBatchFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::RequestFailure => write!(f, "REQUEST_FAILURE"),
            Self::PartialBatchFailure => write!(f, "PARTIAL_BATCH_FAILURE"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Request {
        action: &'static str,
        message: String,
        #[source]
        source: Option<ServiceError>,
    },
    #[error("{succeeded} succeeded, {failed} failed")]
    PartialBatch { succeeded: usize, failed: usize },
}

impl BrowserError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wraps a service failure, preferring the server's own message over
    /// the per-action fallback (e.g. "Failed to move document").
    pub fn request(action: &'static str, fallback: &str, err: ServiceError) -> Self {
        let message = err
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string());
        Self::Request {
            action,
            message,
            source: Some(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Request { .. } => ErrorKind::RequestFailure,
            Self::PartialBatch { .. } => ErrorKind::PartialBatchFailure,
        }
    }
}
