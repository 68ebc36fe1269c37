//! Read interface to the key, permission and branch-protection records.
//!
//! All calls are synchronous; each invocation is a fresh process that reads
//! what it needs once.

use crate::error::Result;
use gitward_types::{
    AccessMode, Account, AccountId, KeyId, PrincipalKey, ProtectedBranchRule, PushEvent, RepoId,
    Repository,
};

/// Key lookups and activity tracking.
pub trait KeyStore {
    /// Load a key by id.
    fn get_key_by_id(&self, id: KeyId) -> Result<Option<PrincipalKey>>;

    /// Whether a deploy key is bound to the repository.
    fn is_deploy_key_bound_to_repo(&self, key_id: KeyId, repo_id: RepoId) -> Result<bool>;

    /// Record that the key was just used.
    fn touch_key(&self, id: KeyId) -> Result<()>;

    /// Record that the deploy key was just used against this repository.
    fn touch_deploy_key(&self, key_id: KeyId, repo_id: RepoId) -> Result<()>;
}

/// Account and repository lookups.
pub trait RepositoryStore {
    /// Load an account by id.
    fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Load a repository by id.
    fn get_repository(&self, id: RepoId) -> Result<Option<Repository>>;

    /// Load a repository by lower-case owner and name.
    fn get_repository_by_owner_and_name(&self, owner: &str, name: &str)
        -> Result<Option<Repository>>;
}

/// Explicit grants consulted by the permission resolver.
pub trait AccessRecords: RepositoryStore {
    /// Mode granted to a direct collaborator.
    fn collaborator_mode(&self, account: AccountId, repo: RepoId) -> Result<Option<AccessMode>>;

    /// Modes granted through every team the account belongs to.
    fn team_modes(&self, account: AccountId, repo: RepoId) -> Result<Vec<AccessMode>>;
}

/// Protected branch lookups.
pub trait BranchProtectionStore {
    /// Rule for a branch, `None` when the branch is unprotected.
    ///
    /// Branch names match case-insensitively, so a rule for `main` also
    /// governs `Main`.
    fn get_protected_branch_rule(
        &self,
        repo_id: RepoId,
        branch: &str,
    ) -> Result<Option<ProtectedBranchRule>>;

    /// Whether the account may push to a whitelisted branch.
    fn is_user_in_push_whitelist(
        &self,
        repo_id: RepoId,
        account: AccountId,
        branch: &str,
    ) -> Result<bool>;
}

/// Persistence of accepted pushes.
pub trait PushEventStore {
    /// Record one push event.
    fn create_push_event(&self, event: &PushEvent) -> Result<()>;
}

/// Everything the SSH gateway reads.
pub trait GatewayStore: KeyStore + AccessRecords {}

impl<T: KeyStore + AccessRecords + ?Sized> GatewayStore for T {}

/// Everything the hook processor reads and writes.
pub trait HookStore: BranchProtectionStore + PushEventStore {}

impl<T: BranchProtectionStore + PushEventStore + ?Sized> HookStore for T {}
