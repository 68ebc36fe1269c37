//! Common types used throughout `gitward`.
//!
//! This crate provides the data model shared by the SSH gateway and the
//! git hook processor:
//! - **Access modes**: the ordered privilege ladder `None < Read < Write < Admin < Owner`
//! - **Accounts and repositories**: read-only snapshots fetched once per invocation
//! - **Principal keys**: user keys and repository-bound deploy keys
//! - **Branch rules**: protected branch configuration
//! - **Ref updates and push events**: what git feeds the hooks, and what gets persisted

mod access;
mod account;
mod branch;
mod key;
mod push;
mod repository;

pub use access::AccessMode;
pub use account::{Account, AccountId};
pub use branch::ProtectedBranchRule;
pub use key::{KeyId, KeyKind, PrincipalKey};
pub use push::{ref_short_name, PushEvent, RefUpdate, BRANCH_PREFIX, ZERO_COMMIT_ID};
pub use repository::{RepoId, Repository};

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
