//! User and organization accounts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Unique identifier for an account.
pub type AccountId = u64;

/// A user or organization account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Login name (lower-case, unique).
    pub name: String,
    /// Site administrators resolve to `Owner` on every repository.
    #[serde(default)]
    pub is_admin: bool,
    /// Per-account random salt; never leaves the server in clear.
    #[serde(default)]
    pub salt: String,
}

impl Account {
    /// Create a regular (non-admin) account.
    pub fn new(id: AccountId, name: impl Into<String>, salt: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_admin: false,
            salt: salt.into(),
        }
    }

    /// Mark the account as a site administrator.
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Secret derived from the salt, used to authenticate the task-trigger
    /// callback issued on behalf of this account's repositories.
    pub fn owner_secret(&self) -> String {
        hex::encode(Sha256::digest(self.salt.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_secret_is_stable_and_salted() {
        let alice = Account::new(1, "alice", "s3cr3t");
        let again = Account::new(1, "alice", "s3cr3t");
        let other = Account::new(1, "alice", "different");

        assert_eq!(alice.owner_secret(), again.owner_secret());
        assert_ne!(alice.owner_secret(), other.owner_secret());
        assert_eq!(alice.owner_secret().len(), 64);
        assert!(!alice.owner_secret().contains("s3cr3t"));
    }

    #[test]
    fn test_admin_flag() {
        let account = Account::new(7, "root", "x");
        assert!(!account.is_admin);
        assert!(account.admin().is_admin);
    }
}
