//! On-disk records of the bundled store.
//!
//! The snapshot itself is owned by the administrator and only ever read.
//! Everything a gateway or hook process records goes to append-only JSON
//! lines files next to it, so concurrent processes never rewrite shared
//! state.

use crate::collaborator::Collaborator;
use crate::error::Result;
use crate::team::Team;
use gitward_types::{Account, KeyId, PrincipalKey, ProtectedBranchRule, RepoId, Repository};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Binding of a deploy key to one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployKeyBinding {
    /// Deploy key.
    pub key_id: KeyId,
    /// Repository the key may access.
    pub repo_id: RepoId,
    /// Last time the key was used against this repository (Unix seconds).
    #[serde(default)]
    pub last_used_at: Option<u64>,
}

impl DeployKeyBinding {
    /// Create a binding that has never been used.
    pub fn new(key_id: KeyId, repo_id: RepoId) -> Self {
        Self {
            key_id,
            repo_id,
            last_used_at: None,
        }
    }
}

/// Every record the bundled store knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// User and organization accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// User and deploy keys.
    #[serde(default)]
    pub keys: Vec<PrincipalKey>,
    /// Repositories.
    #[serde(default)]
    pub repositories: Vec<Repository>,
    /// Direct collaborator grants.
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    /// Teams.
    #[serde(default)]
    pub teams: Vec<Team>,
    /// Deploy key bindings.
    #[serde(default)]
    pub deploy_keys: Vec<DeployKeyBinding>,
    /// Protected branch rules.
    #[serde(default)]
    pub branch_rules: Vec<ProtectedBranchRule>,
}

impl Snapshot {
    /// Read a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

/// One recorded use of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Activity {
    /// A key was used.
    Key { key_id: KeyId, at: u64 },
    /// A deploy key was used against one repository.
    DeployKey {
        key_id: KeyId,
        repo_id: RepoId,
        at: u64,
    },
}

/// `<snapshot><suffix>`, e.g. `store.json.events`.
pub(crate) fn sidecar_path(snapshot: &Path, suffix: &str) -> PathBuf {
    let mut path = snapshot.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Append one record as a single JSON line.
///
/// The line goes out in one `write` on an `O_APPEND` handle, so lines from
/// concurrent processes do not interleave.
pub(crate) fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(&line)?;
    Ok(())
}

/// Read every well-formed line of a JSON lines file; a missing file is empty.
pub(crate) fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (index, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping malformed record"
                );
            }
        }
    }
    Ok(records)
}
