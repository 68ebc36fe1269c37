//! Protected branch rules.

use crate::account::AccountId;
use crate::repository::RepoId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Protection rule for one branch of one repository.
///
/// At most one rule exists per (repository, branch); a missing rule means
/// the branch is unprotected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedBranchRule {
    /// Repository the rule belongs to.
    pub repo_id: RepoId,
    /// Short branch name (e.g. `main`).
    pub branch: String,
    /// Master switch; an unprotected rule behaves as no rule.
    #[serde(default)]
    pub protected: bool,
    /// Direct pushes are refused; changes must land through a pull request.
    #[serde(default)]
    pub require_pull_request: bool,
    /// Only listed users may push.
    #[serde(default)]
    pub enable_whitelist: bool,
    /// Users allowed to push when the whitelist is enabled.
    #[serde(default)]
    pub whitelist_user_ids: BTreeSet<AccountId>,
}

impl ProtectedBranchRule {
    /// Create an enabled rule with no further restrictions.
    pub fn new(repo_id: RepoId, branch: impl Into<String>) -> Self {
        Self {
            repo_id,
            branch: branch.into(),
            protected: true,
            require_pull_request: false,
            enable_whitelist: false,
            whitelist_user_ids: BTreeSet::new(),
        }
    }

    /// Require pull requests for this branch.
    pub fn with_pull_request(mut self) -> Self {
        self.require_pull_request = true;
        self
    }

    /// Enable the push whitelist with the given users.
    pub fn with_whitelist(mut self, users: impl IntoIterator<Item = AccountId>) -> Self {
        self.enable_whitelist = true;
        self.whitelist_user_ids.extend(users);
        self
    }

    /// Check if a user is on the push whitelist.
    pub fn is_whitelisted(&self, user: AccountId) -> bool {
        self.whitelist_user_ids.contains(&user)
    }
}
