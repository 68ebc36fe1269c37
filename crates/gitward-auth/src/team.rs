//! Team types for group-based repository access.

use gitward_types::{AccessMode, AccountId, RepoId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A team within an organization.
///
/// A team grants one mode on every repository it lists to every member.
/// Organization owners are modeled as a team carrying `Owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team ID.
    pub id: u64,
    /// Organization account the team belongs to.
    pub org_id: AccountId,
    /// Team name (unique within org).
    pub name: String,
    /// Mode granted on team repositories.
    pub mode: AccessMode,
    /// Member accounts.
    #[serde(default)]
    pub members: BTreeSet<AccountId>,
    /// Repositories the team has access to.
    #[serde(default)]
    pub repos: BTreeSet<RepoId>,
}

impl Team {
    /// Create a new team.
    pub fn new(id: u64, org_id: AccountId, name: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            id,
            org_id,
            name: name.into(),
            mode,
            members: BTreeSet::new(),
            repos: BTreeSet::new(),
        }
    }

    /// Check if an account is a member of this team.
    pub fn is_member(&self, account: AccountId) -> bool {
        self.members.contains(&account)
    }

    /// Add a member to the team.
    pub fn add_member(&mut self, account: AccountId) -> bool {
        self.members.insert(account)
    }

    /// Add a repository to the team.
    pub fn add_repo(&mut self, repo: RepoId) -> bool {
        self.repos.insert(repo)
    }

    /// Mode this team gives `account` on `repo`, if any.
    pub fn mode_for(&self, account: AccountId, repo: RepoId) -> Option<AccessMode> {
        (self.is_member(account) && self.repos.contains(&repo)).then_some(self.mode)
    }
}
