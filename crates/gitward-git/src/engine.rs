//! Queries against the git object database.

use crate::error::GitError;
use crate::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

/// History queries the policy engine needs from git.
pub trait GitEngine {
    /// Whether `old` has commits that are not reachable from `new`.
    ///
    /// `false` means `old` is an ancestor of `new` (a fast-forward). Fully
    /// unrelated histories report `true`.
    fn has_commits_not_in(&self, repo_path: &Path, old: &str, new: &str) -> Result<bool>;
}

/// [`GitEngine`] backed by the git binary.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    binary: PathBuf,
}

impl CommandEngine {
    /// Create an engine that runs `binary` (usually `git`).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new("git")
    }
}

fn check_revision(rev: &str) -> Result<()> {
    if rev.is_empty() || !rev.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(GitError::InvalidRevision(rev.to_string()));
    }
    Ok(())
}

impl GitEngine for CommandEngine {
    fn has_commits_not_in(&self, repo_path: &Path, old: &str, new: &str) -> Result<bool> {
        check_revision(old)?;
        check_revision(new)?;

        let program = self.binary.display().to_string();
        let output = Command::new(&self.binary)
            .args(["rev-list", "--max-count=1", old, &format!("^{new}")])
            .current_dir(repo_path)
            .output()
            .map_err(|source| GitError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::error!(
                repo = %repo_path.display(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "rev-list failed"
            );
            return Err(GitError::Exit {
                program,
                status: output.status,
            });
        }

        Ok(!output.stdout.iter().all(u8::is_ascii_whitespace))
    }
}
