//! The hook context: what the gateway tells the hooks git runs on its behalf.
//!
//! The gateway only gets to talk to hooks through the environment git passes
//! down, so the context is encoded into `GITWARD_*` variables on the way out
//! and decoded again in the hook process.

use crate::error::{HookError, Result};
use gitward_types::{Account, AccountId, RepoId, Repository};
use std::path::{Path, PathBuf};

/// Authenticated account id; empty for deploy keys.
pub const ENV_AUTH_USER_ID: &str = "GITWARD_AUTH_USER_ID";
/// Authenticated account name; empty for deploy keys.
pub const ENV_AUTH_USER_NAME: &str = "GITWARD_AUTH_USER_NAME";
/// Repository owner id.
pub const ENV_REPO_OWNER_ID: &str = "GITWARD_REPO_OWNER_ID";
/// Repository owner name.
pub const ENV_REPO_OWNER_NAME: &str = "GITWARD_REPO_OWNER_NAME";
/// Secret used to authenticate the task trigger.
pub const ENV_REPO_OWNER_SECRET: &str = "GITWARD_REPO_OWNER_SECRET";
/// Repository id. Its presence marks a gateway-initiated push.
pub const ENV_REPO_ID: &str = "GITWARD_REPO_ID";
/// Repository name.
pub const ENV_REPO_NAME: &str = "GITWARD_REPO_NAME";
/// Absolute path of the repository receiving the push.
pub const ENV_REPO_PATH: &str = "GITWARD_REPO_PATH";
/// `true` when the push targets the wiki repository.
pub const ENV_REPO_IS_WIKI: &str = "GITWARD_REPO_IS_WIKI";

const CUSTOM_HOOKS_DIR: &str = "custom_hooks";

/// Who is pushing to which repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    /// Authenticated account, `None` for deploy keys.
    pub pusher_id: Option<AccountId>,
    /// Authenticated account name, empty for deploy keys.
    pub pusher_name: String,
    /// Repository owner.
    pub repo_owner_id: AccountId,
    /// Repository owner name.
    pub repo_owner_name: String,
    /// Owner secret for the task trigger.
    pub repo_owner_secret: String,
    /// Repository id.
    pub repo_id: RepoId,
    /// Repository name.
    pub repo_name: String,
    /// Path of the repository (or wiki) on disk.
    pub repo_path: PathBuf,
    /// The push targets the wiki.
    pub is_wiki: bool,
}

impl HookContext {
    /// Build the context for a push the gateway is about to dispatch.
    pub fn for_push(
        pusher: Option<&Account>,
        owner: &Account,
        repo: &Repository,
        repo_path: impl Into<PathBuf>,
        is_wiki: bool,
    ) -> Self {
        Self {
            pusher_id: pusher.map(|a| a.id),
            pusher_name: pusher.map(|a| a.name.clone()).unwrap_or_default(),
            repo_owner_id: owner.id,
            repo_owner_name: repo.owner_name.clone(),
            repo_owner_secret: owner.owner_secret(),
            repo_id: repo.id,
            repo_name: repo.name.clone(),
            repo_path: repo_path.into(),
            is_wiki,
        }
    }

    /// Encode as environment variables.
    pub fn to_env(&self) -> Vec<(String, String)> {
        let pairs = [
            (
                ENV_AUTH_USER_ID,
                self.pusher_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            (ENV_AUTH_USER_NAME, self.pusher_name.clone()),
            (ENV_REPO_OWNER_ID, self.repo_owner_id.to_string()),
            (ENV_REPO_OWNER_NAME, self.repo_owner_name.clone()),
            (ENV_REPO_OWNER_SECRET, self.repo_owner_secret.clone()),
            (ENV_REPO_ID, self.repo_id.to_string()),
            (ENV_REPO_NAME, self.repo_name.clone()),
            (ENV_REPO_PATH, self.repo_path.display().to_string()),
            (ENV_REPO_IS_WIKI, self.is_wiki.to_string()),
        ];
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Decode from an environment lookup.
    ///
    /// Returns `Ok(None)` when the repository id is absent: the hook was not
    /// triggered through the gateway and has nothing to do.
    pub fn from_env<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let Some(repo_id) = get(ENV_REPO_ID) else {
            return Ok(None);
        };
        let require = |name: &str| {
            get(name).ok_or_else(|| HookError::Context(format!("{name} is not set")))
        };

        Ok(Some(Self {
            pusher_id: get(ENV_AUTH_USER_ID)
                .map(|v| parse_id(ENV_AUTH_USER_ID, &v))
                .transpose()?,
            pusher_name: get(ENV_AUTH_USER_NAME).unwrap_or_default(),
            repo_owner_id: parse_id(ENV_REPO_OWNER_ID, &require(ENV_REPO_OWNER_ID)?)?,
            repo_owner_name: require(ENV_REPO_OWNER_NAME)?,
            repo_owner_secret: get(ENV_REPO_OWNER_SECRET).unwrap_or_default(),
            repo_id: parse_id(ENV_REPO_ID, &repo_id)?,
            repo_name: require(ENV_REPO_NAME)?,
            repo_path: PathBuf::from(require(ENV_REPO_PATH)?),
            is_wiki: get(ENV_REPO_IS_WIKI).is_some_and(|v| v == "true"),
        }))
    }

    /// Decode from this process's environment.
    pub fn from_process_env() -> Result<Option<Self>> {
        Self::from_env(|name| std::env::var(name).ok())
    }

    /// Directory holding site-supplied hook scripts.
    pub fn custom_hooks_dir(&self) -> PathBuf {
        self.repo_path.join(CUSTOM_HOOKS_DIR)
    }

    /// Repository path on disk.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Returns the full name (owner/name).
    pub fn repo_full_name(&self) -> String {
        format!("{}/{}", self.repo_owner_name, self.repo_name)
    }
}

fn parse_id(name: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| HookError::Context(format!("{name}={value} is not a valid id")))
}
