//! Ref updates fed to hooks, and the push events built from them.

use crate::account::AccountId;
use crate::repository::RepoId;
use serde::{Deserialize, Serialize};

/// The all-zero object id git uses for "no commit".
pub const ZERO_COMMIT_ID: &str = "0000000000000000000000000000000000000000";

/// Prefix of branch refs.
pub const BRANCH_PREFIX: &str = "refs/heads/";

const TAG_PREFIX: &str = "refs/tags/";
const REMOTE_PREFIX: &str = "refs/remotes/";

/// Strip the well-known ref namespace (`refs/heads/`, `refs/tags/`, `refs/remotes/`).
pub fn ref_short_name(full_ref: &str) -> &str {
    [BRANCH_PREFIX, TAG_PREFIX, REMOTE_PREFIX]
        .iter()
        .find_map(|prefix| full_ref.strip_prefix(prefix))
        .unwrap_or(full_ref)
}

fn is_zero_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b == b'0')
}

/// One `<old> <new> <ref>` line from hook stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    /// Commit the ref pointed to before the push.
    pub old_commit_id: String,
    /// Commit the ref will point to.
    pub new_commit_id: String,
    /// Full ref name (e.g. `refs/heads/main`).
    pub ref_name: String,
}

impl RefUpdate {
    /// Create a ref update.
    pub fn new(
        old_commit_id: impl Into<String>,
        new_commit_id: impl Into<String>,
        ref_name: impl Into<String>,
    ) -> Self {
        Self {
            old_commit_id: old_commit_id.into(),
            new_commit_id: new_commit_id.into(),
            ref_name: ref_name.into(),
        }
    }

    /// Parse a hook stdin line.
    ///
    /// Returns `None` unless the line has exactly three whitespace-separated
    /// fields; git may emit such lines for internal refs and they are skipped.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let old = fields.next()?;
        let new = fields.next()?;
        let name = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self::new(old, new, name))
    }

    /// The ref did not exist before this push.
    pub fn is_create(&self) -> bool {
        is_zero_id(&self.old_commit_id)
    }

    /// The ref is being deleted.
    pub fn is_delete(&self) -> bool {
        is_zero_id(&self.new_commit_id)
    }

    /// Branch name when the ref is under `refs/heads/`.
    pub fn branch(&self) -> Option<&str> {
        self.ref_name.strip_prefix(BRANCH_PREFIX)
    }

    /// Short name with any well-known namespace removed.
    pub fn short_name(&self) -> &str {
        ref_short_name(&self.ref_name)
    }
}

/// A persisted record of one accepted ref update.
///
/// Created once per ref in the post-receive phase and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Commit before the push.
    pub old_commit_id: String,
    /// Commit after the push.
    pub new_commit_id: String,
    /// Full ref name.
    pub ref_name: String,
    /// Authenticated pusher, absent for deploy keys.
    pub pusher_id: Option<AccountId>,
    /// Pusher login name, empty for deploy keys.
    pub pusher_name: String,
    /// Repository that received the push.
    pub repo_id: RepoId,
    /// Repository owner name.
    pub repo_owner_name: String,
    /// Repository name.
    pub repo_name: String,
    /// When the event was recorded (Unix seconds).
    pub created_at: u64,
}

impl PushEvent {
    /// Short ref name (branch or tag) used in notifications.
    pub fn short_ref(&self) -> &str {
        ref_short_name(&self.ref_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let update = RefUpdate::parse_line("a1b2 c3d4 refs/heads/main").unwrap();
        assert_eq!(update.old_commit_id, "a1b2");
        assert_eq!(update.new_commit_id, "c3d4");
        assert_eq!(update.ref_name, "refs/heads/main");
        assert_eq!(update.branch(), Some("main"));
    }

    #[test]
    fn test_parse_line_wrong_field_count() {
        assert!(RefUpdate::parse_line("").is_none());
        assert!(RefUpdate::parse_line("a1b2 c3d4").is_none());
        assert!(RefUpdate::parse_line("a1b2 c3d4 refs/heads/main extra").is_none());
    }

    #[test]
    fn test_create_and_delete() {
        let create = RefUpdate::new(ZERO_COMMIT_ID, "c3d4", "refs/heads/topic");
        assert!(create.is_create());
        assert!(!create.is_delete());

        let delete = RefUpdate::new("a1b2", ZERO_COMMIT_ID, "refs/heads/topic");
        assert!(delete.is_delete());
        assert!(!delete.is_create());
    }

    #[test]
    fn test_short_names() {
        assert_eq!(ref_short_name("refs/heads/feature/x"), "feature/x");
        assert_eq!(ref_short_name("refs/tags/v1.0"), "v1.0");
        assert_eq!(ref_short_name("refs/remotes/origin/main"), "origin/main");
        assert_eq!(ref_short_name("refs/pull/1/head"), "refs/pull/1/head");

        let tag = RefUpdate::new("a", "b", "refs/tags/v1.0");
        assert_eq!(tag.branch(), None);
        assert_eq!(tag.short_name(), "v1.0");
    }
}
