//! Authorization for gitward.
//!
//! This crate decides who may do what:
//! - **Key authentication**: map a `key-<id>` argument to a principal
//! - **Permission resolution**: ownership, collaborators, teams and fork inheritance
//! - **Branch protection**: whitelist, pull-request, deletion and force-push guards
//! - **Storage**: the store traits, plus a bundled in-memory store with JSON snapshots
//!
//! # Example
//!
//! ```
//! use gitward_auth::{resolve_access_mode, Collaborator, MemoryStore};
//! use gitward_types::{AccessMode, Account, Repository};
//!
//! let store = MemoryStore::new();
//! let repo = Repository::new(1, 10, "acme", "widgets").private();
//! store.insert_repository(repo.clone());
//! store.set_collaborator(Collaborator::new(1, 2, AccessMode::Write));
//!
//! let bob = Account::new(2, "bob", "salt");
//! let mode = resolve_access_mode(&store, Some(&bob), &repo).unwrap();
//! assert_eq!(mode, AccessMode::Write);
//! ```

mod branch_protection;
mod collaborator;
mod error;
mod key;
mod memory;
mod permission;
mod snapshot;
mod store;
mod team;

pub use branch_protection::{evaluate_rule, BranchGuard, Verdict};
pub use collaborator::Collaborator;
pub use error::{AuthError, Result, ACCESS_DENIED_MESSAGE};
pub use key::{parse_key_arg, AuthOptions, KeyAuthenticator, Principal};
pub use memory::MemoryStore;
pub use permission::resolve_access_mode;
pub use snapshot::{DeployKeyBinding, Snapshot};
pub use store::{
    AccessRecords, BranchProtectionStore, GatewayStore, HookStore, KeyStore, PushEventStore,
    RepositoryStore,
};
pub use team::Team;
