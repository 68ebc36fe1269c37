//! Error types for the auth crate.

use gitward_git::GitError;
use gitward_types::{AccessMode, KeyId, RepoId};
use thiserror::Error;

/// Shown when the caller cannot even read the repository, so that its
/// existence is not revealed.
pub const ACCESS_DENIED_MESSAGE: &str = "Repository does not exist or you do not have access";

/// Errors that can occur in authorization operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The `key-<id>` argument is malformed.
    #[error("invalid key id '{0}'")]
    InvalidKeyId(String),

    /// No key with this id exists.
    #[error("key {0} does not exist")]
    KeyNotFound(KeyId),

    /// A deploy key was presented against a repository it is not bound to.
    #[error("deploy key access denied: [key_id: {key_id}, repo_id: {repo_id}]")]
    KeyAccessDenied {
        /// Presented key.
        key_id: KeyId,
        /// Target repository.
        repo_id: RepoId,
    },

    /// A deploy key's fixed mode is below what the command needs.
    #[error("deploy key {key_id} cannot be used for {required} access")]
    KeyPermissionDenied {
        /// Presented key.
        key_id: KeyId,
        /// Mode the command needs.
        required: AccessMode,
    },

    /// The resolved mode is below what the command needs.
    #[error("user '{user}' does not have level '{required}' access to repository '{repo}' (has '{effective}')")]
    InsufficientAccess {
        /// Account name.
        user: String,
        /// Repository full name.
        repo: String,
        /// Mode the command needs.
        required: AccessMode,
        /// Mode the account resolved to.
        effective: AccessMode,
    },

    /// A record the gateway depends on is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Git error.
    #[error(transparent)]
    Git(#[from] GitError),
}

impl AuthError {
    /// Message safe to show the git client.
    ///
    /// Authorization failures only get specific once the caller is known to
    /// be able to read the repository.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::InvalidKeyId(_) | Self::KeyNotFound(_) => "Invalid key ID",
            Self::KeyAccessDenied { .. } => "Key access denied",
            Self::KeyPermissionDenied { .. } => "Key permission denied",
            Self::InsufficientAccess { effective, .. } if effective.has(AccessMode::Read) => {
                "You do not have sufficient authorization for this action"
            }
            Self::InsufficientAccess { .. } => ACCESS_DENIED_MESSAGE,
            Self::Git(e) => e.client_message(),
            Self::NotFound(_) | Self::Store(_) | Self::Serialization(_) | Self::Io(_) => {
                "Internal error"
            }
        }
    }
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
