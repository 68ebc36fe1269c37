//! Hook error types.

use gitward_auth::AuthError;
use gitward_git::GitError;
use thiserror::Error;

/// Errors that can occur while processing a git hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// A ref update was refused by branch protection.
    #[error("{0}")]
    Denied(String),

    /// Git invoked the hook with unexpected arguments.
    #[error("{0}")]
    InvalidArguments(String),

    /// The hook environment is present but malformed.
    #[error("invalid hook environment: {0}")]
    Context(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authorization store error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Git error.
    #[error(transparent)]
    Git(#[from] GitError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HookError {
    /// Message shown to the pusher.
    pub fn client_message(&self) -> String {
        match self {
            Self::Denied(reason) | Self::InvalidArguments(reason) => reason.clone(),
            Self::Auth(e) => e.client_message().to_string(),
            Self::Git(e) => e.client_message().to_string(),
            Self::Context(_) | Self::Http(_) | Self::Io(_) => "Internal error".to_string(),
        }
    }
}

/// Result type for hook operations.
pub type Result<T> = std::result::Result<T, HookError>;
