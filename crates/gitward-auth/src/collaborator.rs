//! Repository collaborator records.

use gitward_types::{unix_now, AccessMode, AccountId, RepoId};
use serde::{Deserialize, Serialize};

/// A direct access grant on one repository.
///
/// Collaborators are accounts explicitly granted access to a repository,
/// separate from ownership or team membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    /// Repository the grant applies to.
    pub repo_id: RepoId,
    /// Account receiving the grant.
    pub account_id: AccountId,
    /// Mode granted.
    pub mode: AccessMode,
    /// When the grant was made (Unix timestamp).
    #[serde(default)]
    pub created_at: u64,
}

impl Collaborator {
    /// Create a new grant.
    pub fn new(repo_id: RepoId, account_id: AccountId, mode: AccessMode) -> Self {
        Self {
            repo_id,
            account_id,
            mode,
            created_at: unix_now(),
        }
    }

    /// Check if this collaborator has at least the required mode.
    pub fn has_mode(&self, required: AccessMode) -> bool {
        self.mode.has(required)
    }
}
