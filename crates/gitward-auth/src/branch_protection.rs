//! Protected branch enforcement for incoming ref updates.

use crate::error::Result;
use crate::store::BranchProtectionStore;
use gitward_git::GitEngine;
use gitward_types::{AccountId, ProtectedBranchRule, RefUpdate, RepoId};
use std::path::Path;

/// Decision for one ref update or a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The update may proceed.
    Allow,
    /// The update is refused, with the reason shown to the pusher.
    Deny(String),
}

impl Verdict {
    /// Check if this verdict allows the update.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Evaluate one update against the rule for its branch.
///
/// Checks run in order and the first failure wins:
/// whitelist membership, pull-request requirement (waived for whitelisted
/// pushers), deletion, then force push. `force_probe` is only called when
/// it matters, and must report whether the old commit has history the new
/// one does not.
pub fn evaluate_rule<F>(
    rule: &ProtectedBranchRule,
    update: &RefUpdate,
    branch: &str,
    whitelisted: bool,
    force_probe: F,
) -> Result<Verdict>
where
    F: FnOnce() -> Result<bool>,
{
    if !rule.protected {
        return Ok(Verdict::Allow);
    }

    let mut bypass_pull_request = false;
    if rule.enable_whitelist {
        if !whitelisted {
            return Ok(Verdict::Deny(format!(
                "Branch '{branch}' is protected and you are not in the push whitelist"
            )));
        }
        bypass_pull_request = true;
    }

    if rule.require_pull_request && !bypass_pull_request {
        return Ok(Verdict::Deny(format!(
            "Branch '{branch}' is protected and commits must be merged through pull request"
        )));
    }

    if update.is_delete() {
        return Ok(Verdict::Deny(format!(
            "Branch '{branch}' is protected from deletion"
        )));
    }

    // A freshly created branch has nothing to rewrite.
    if !update.is_create() && force_probe()? {
        return Ok(Verdict::Deny(format!(
            "Branch '{branch}' is protected from force push"
        )));
    }

    Ok(Verdict::Allow)
}

/// Applies the protected branch rules of one repository.
pub struct BranchGuard<'a, S: ?Sized, G: ?Sized> {
    store: &'a S,
    git: &'a G,
    repo_id: RepoId,
    repo_path: &'a Path,
}

impl<'a, S, G> BranchGuard<'a, S, G>
where
    S: BranchProtectionStore + ?Sized,
    G: GitEngine + ?Sized,
{
    /// Create a guard for the repository stored at `repo_path`.
    pub fn new(store: &'a S, git: &'a G, repo_id: RepoId, repo_path: &'a Path) -> Self {
        Self {
            store,
            git,
            repo_id,
            repo_path,
        }
    }

    /// Check a single ref update.
    ///
    /// Only branches can be protected; tags and other refs always pass.
    /// Anonymous pushers are never on a whitelist.
    pub fn check(&self, update: &RefUpdate, pusher: Option<AccountId>) -> Result<Verdict> {
        let Some(branch) = update.branch() else {
            return Ok(Verdict::Allow);
        };
        let Some(rule) = self.store.get_protected_branch_rule(self.repo_id, branch)? else {
            return Ok(Verdict::Allow);
        };

        let whitelisted = match pusher {
            Some(account) if rule.enable_whitelist => {
                self.store
                    .is_user_in_push_whitelist(self.repo_id, account, branch)?
            }
            _ => false,
        };

        let verdict = evaluate_rule(&rule, update, branch, whitelisted, || {
            Ok(self.git.has_commits_not_in(
                self.repo_path,
                &update.old_commit_id,
                &update.new_commit_id,
            )?)
        })?;

        if let Verdict::Deny(reason) = &verdict {
            tracing::info!(
                repo_id = self.repo_id,
                ref_name = %update.ref_name,
                pusher = ?pusher,
                %reason,
                "Ref update denied"
            );
        }
        Ok(verdict)
    }

    /// Check a batch of updates; the first denial rejects the whole batch.
    pub fn check_all<'u, I>(&self, updates: I, pusher: Option<AccountId>) -> Result<Verdict>
    where
        I: IntoIterator<Item = &'u RefUpdate>,
    {
        for update in updates {
            let verdict = self.check(update, pusher)?;
            if !verdict.is_allowed() {
                return Ok(verdict);
            }
        }
        Ok(Verdict::Allow)
    }
}
