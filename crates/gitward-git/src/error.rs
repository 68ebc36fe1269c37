//! Git error types.

use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while parsing commands or running git.
#[derive(Debug, Error)]
pub enum GitError {
    /// The SSH command does not name an `owner/repo` path.
    #[error("invalid repository path: {0}")]
    InvalidRepositoryPath(String),

    /// The SSH command verb is not allow-listed.
    #[error("unknown git command '{0}'")]
    UnknownCommand(String),

    /// A revision handed to git is not a plain object id.
    #[error("invalid revision '{0}'")]
    InvalidRevision(String),

    /// The program could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("'{program}' exited with {status}")]
    Exit {
        /// Program that failed.
        program: String,
        /// Exit status.
        status: ExitStatus,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Message safe to show the git client.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::InvalidRepositoryPath(_) => "Invalid repository path",
            Self::UnknownCommand(_) => "Unknown git command",
            Self::InvalidRevision(_) | Self::Spawn { .. } | Self::Exit { .. } | Self::Io(_) => {
                "Internal error"
            }
        }
    }
}
