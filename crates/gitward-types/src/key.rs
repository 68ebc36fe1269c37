//! Principal keys: the identity presented over SSH.

use crate::access::AccessMode;
use crate::account::AccountId;
use serde::{Deserialize, Serialize};

/// Unique identifier for a public key.
pub type KeyId = u64;

/// What a key is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyKind {
    /// Account-bound key; grants whatever the account resolves to.
    User {
        /// Account that owns the key.
        owner_id: AccountId,
    },
    /// Repository-bound machine key with a fixed mode.
    Deploy {
        /// Stored mode. Never honoured above `Write`.
        mode: AccessMode,
    },
}

/// A public key known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalKey {
    /// Unique key ID.
    pub id: KeyId,
    /// User-provided title.
    pub name: String,
    /// SHA256 fingerprint.
    #[serde(default)]
    pub fingerprint: String,
    /// User or deploy binding.
    pub kind: KeyKind,
    /// Last time the key was used (Unix seconds).
    #[serde(default)]
    pub last_used_at: Option<u64>,
}

impl PrincipalKey {
    /// Create a key owned by an account.
    pub fn user(id: KeyId, name: impl Into<String>, owner_id: AccountId) -> Self {
        Self {
            id,
            name: name.into(),
            fingerprint: String::new(),
            kind: KeyKind::User { owner_id },
            last_used_at: None,
        }
    }

    /// Create a deploy key. The mode is capped at `Write`.
    pub fn deploy(id: KeyId, name: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            id,
            name: name.into(),
            fingerprint: String::new(),
            kind: KeyKind::Deploy {
                mode: mode.cap(AccessMode::Write),
            },
            last_used_at: None,
        }
    }

    /// Check if this is a deploy key.
    pub fn is_deploy_key(&self) -> bool {
        matches!(self.kind, KeyKind::Deploy { .. })
    }

    /// Fixed mode of a deploy key, `None` for user keys.
    pub fn deploy_mode(&self) -> Option<AccessMode> {
        match self.kind {
            KeyKind::Deploy { mode } => Some(mode.cap(AccessMode::Write)),
            KeyKind::User { .. } => None,
        }
    }

    /// Owning account of a user key, `None` for deploy keys.
    pub fn owner_id(&self) -> Option<AccountId> {
        match self.kind {
            KeyKind::User { owner_id } => Some(owner_id),
            KeyKind::Deploy { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_key_mode_is_capped() {
        let key = PrincipalKey::deploy(1, "ci", AccessMode::Owner);
        assert!(key.is_deploy_key());
        assert_eq!(key.deploy_mode(), Some(AccessMode::Write));
        assert_eq!(key.owner_id(), None);
    }

    #[test]
    fn test_stored_deploy_mode_is_capped_on_read() {
        let key: PrincipalKey = serde_json::from_str(
            r#"{"id":4,"name":"ci","kind":{"type":"deploy","mode":"admin"}}"#,
        )
        .unwrap();
        assert_eq!(key.deploy_mode(), Some(AccessMode::Write));
    }

    #[test]
    fn test_user_key() {
        let key = PrincipalKey::user(2, "laptop", 9);
        assert!(!key.is_deploy_key());
        assert_eq!(key.owner_id(), Some(9));
        assert_eq!(key.deploy_mode(), None);
    }
}
