//! Error types for lpbuild-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a [`RemoteGateway`](crate::gateway::RemoteGateway).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The named remote object does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The remote system refused the request.
    #[error("remote rejected request: {message}")]
    Rejected { message: String },
}

/// All errors that can arise while reconciling or applying a project.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Gateway(GatewayError),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The remote project is owned by someone other than the configured team.
    #[error("project '{project}' is owned by '{owner}', not '{team}'")]
    OwnershipMismatch {
        project: String,
        owner: String,
        team: String,
    },

    #[error("no repository available for project '{project}': {reason}")]
    RepositoryUnavailable { project: String, reason: String },

    /// `sync` was invoked without confirmation.
    #[error("sync not confirmed: pass --i-really-mean-it to apply changes")]
    NotConfirmed,

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote state snapshot (de)serialization error.
    #[error("remote state JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GatewayError> for SyncError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { kind, name } => SyncError::NotFound { kind, name },
            other => SyncError::Gateway(other),
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
