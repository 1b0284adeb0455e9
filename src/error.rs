//! Error taxonomy for the audit log retrieval pipeline.
//!
//! Library code returns [`PipelineError`]. The orchestrator turns every
//! operational failure into a structured response and only lets
//! [`PipelineError::Validation`] escape as an `Err`, since that one signals a
//! caller mistake rather than a runtime condition.

use crate::audit::export::ExportState;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing filter fields. Raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A service or client name could not be resolved.
    #[error("{0}")]
    NotFound(String),

    /// The remote export job reported `FAILED` or `CANCELLED`.
    #[error("Export job {job_id} ended in state {state}: {reason}")]
    RemoteJob {
        job_id: String,
        state: ExportState,
        reason: String,
    },

    /// The polling budget ran out before the job reached a terminal state.
    #[error("Export job {job_id} did not complete within {}s", waited.as_secs())]
    Timeout { job_id: String, waited: Duration },

    /// The console API answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Missing or unusable response payload.
    #[error("{0}")]
    Transport(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// OAuth token acquisition failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Audit log retrieval was cancelled")]
    Cancelled,
}

/// Category of a [`PipelineError`], as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Resolution,
    RemoteJobFailure,
    Timeout,
    TransportFailure,
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::Resolution,
            Self::RemoteJob { .. } => ErrorKind::RemoteJobFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Api { .. } | Self::Transport(_) | Self::Http(_) | Self::Io(_) | Self::Auth(_) => {
                ErrorKind::TransportFailure
            }
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status of an API error, if this is one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
