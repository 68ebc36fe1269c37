//! Repository snapshots.

use crate::account::AccountId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unique identifier for a repository.
pub type RepoId = u64;

/// A repository as seen by the gateway.
///
/// Fetched once per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Unique repository ID.
    pub id: RepoId,
    /// Owning account (user or organization).
    pub owner_id: AccountId,
    /// Owner login name, lower-case.
    pub owner_name: String,
    /// Repository name, lower-case, without `.git`.
    pub name: String,
    /// Private repositories are invisible to callers without a grant.
    #[serde(default)]
    pub is_private: bool,
    /// Mirrors never accept writes.
    #[serde(default)]
    pub is_mirror: bool,
    /// Repository this one was forked from.
    #[serde(default)]
    pub base_repo_id: Option<RepoId>,
}

impl Repository {
    /// Create a public, non-mirror repository.
    pub fn new(
        id: RepoId,
        owner_id: AccountId,
        owner_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner_id,
            owner_name: owner_name.into().to_lowercase(),
            name: name.into().to_lowercase(),
            is_private: false,
            is_mirror: false,
            base_repo_id: None,
        }
    }

    /// Mark the repository as private.
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Mark the repository as a read-only mirror.
    pub fn mirror(mut self) -> Self {
        self.is_mirror = true;
        self
    }

    /// Mark the repository as a fork of `base`.
    pub fn fork_of(mut self, base: RepoId) -> Self {
        self.base_repo_id = Some(base);
        self
    }

    /// Returns the full name (owner/name).
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }

    /// Path of the bare repository (or its wiki) under the storage root.
    pub fn storage_path(&self, root: &Path, wiki: bool) -> PathBuf {
        let suffix = if wiki { ".wiki.git" } else { ".git" };
        root.join(&self.owner_name).join(format!("{}{}", self.name, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_builders() {
        let repo = Repository::new(3, 1, "Acme", "Widgets").private().fork_of(2);
        assert_eq!(repo.full_name(), "acme/widgets");
        assert!(repo.is_private);
        assert!(!repo.is_mirror);
        assert_eq!(repo.base_repo_id, Some(2));
    }

    #[test]
    fn test_storage_path() {
        let repo = Repository::new(1, 1, "acme", "widgets");
        let root = Path::new("/srv/git");
        assert_eq!(
            repo.storage_path(root, false),
            PathBuf::from("/srv/git/acme/widgets.git")
        );
        assert_eq!(
            repo.storage_path(root, true),
            PathBuf::from("/srv/git/acme/widgets.wiki.git")
        );
    }

    #[test]
    fn test_repository_defaults_from_json() {
        let repo: Repository = serde_json::from_str(
            r#"{"id":1,"owner_id":2,"owner_name":"acme","name":"widgets"}"#,
        )
        .unwrap();
        assert!(!repo.is_private);
        assert!(!repo.is_mirror);
        assert!(repo.base_repo_id.is_none());
    }
}
