use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid provisioning configuration: {0}")]
    Configuration(String),

    #[error("unable to resolve component stream '{stream}' (repositories: [{}], offline: {offline})", .repositories.join(", "))]
    Resolution {
        stream: String,
        repositories: Vec<String>,
        offline: bool,
    },

    #[error("invalid update candidate target {}: {reason}", .path.display())]
    InvalidCandidateTarget { path: PathBuf, reason: String },

    #[error("{} is not a provisioned installation", .path.display())]
    InvalidInstallation { path: PathBuf },

    #[error("installation metadata error at {}: {reason}", .path.display())]
    Metadata { path: PathBuf, reason: String },

    #[error("update apply failed during {stage}: {reason}")]
    Apply { stage: &'static str, reason: String },

    #[error("installation at {} could not be fully restored after a failed update; rollback error: {rollback_error}; original error: {apply_error}", .path.display())]
    CorruptInstallation {
        path: PathBuf,
        apply_error: String,
        rollback_error: String,
    },
}
