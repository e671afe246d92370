//! Error types module
//!
//! All failures of the deposit pipeline are unified under [`DepositError`].
//! The split that matters operationally is unprocessable-input vs.
//! possibly-transient: the HTTP surface maps the former to a status the
//! upstream queue will not retry and the latter to one that it will.

use std::io;

use crate::pmc::MetadataError;
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum DepositError {
    /// Manifest failed schema/business-rule checks. Never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One or more local-storage files absent at their expected path.
    /// Aggregated across all files before reporting. Not retried.
    #[error("Missing files: {}", .0.join(", "))]
    MissingFiles(Vec<String>),

    /// PMC metadata generation failed (no reviewer contact, unknown
    /// funder). An input problem, so not retried.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Remote fetch failed (non-2xx, network fault, truncated body).
    /// Potentially transient.
    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    /// Local compression/tooling fault while building the package.
    #[error("Error creating tar.gz file: {0}")]
    Archive(String),

    /// SFTP connect/mkdir/put failure. Potentially transient.
    #[error("SFTP upload failed: {0}")]
    Upload(String),

    /// Failure notifying the external job tracker. Best-effort only;
    /// callers log and swallow this.
    #[error("Status callback failed: {0}")]
    Callback(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DepositError {
    /// True for failures caused by the input itself, where redelivering
    /// the same request cannot succeed.
    pub fn is_unprocessable(&self) -> bool {
        matches!(
            self,
            DepositError::Validation(_)
                | DepositError::MissingFiles(_)
                | DepositError::Metadata(_)
        )
    }

    /// Pipeline stage this error belongs to, for log context.
    pub fn stage(&self) -> &'static str {
        match self {
            DepositError::Validation(_) => "validation",
            DepositError::MissingFiles(_) => "acquisition",
            DepositError::Metadata(_) => "generation",
            DepositError::Acquisition(_) => "acquisition",
            DepositError::Archive(_) => "archiving",
            DepositError::Upload(_) => "upload",
            DepositError::Callback(_) => "callback",
            DepositError::Internal(_) => "internal",
        }
    }
}

impl From<io::Error> for DepositError {
    fn from(err: io::Error) -> Self {
        DepositError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for DepositError {
    fn from(err: serde_json::Error) -> Self {
        DepositError::Internal(format!("JSON error: {}", err))
    }
}
