//! Access modes and ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege level over a repository.
///
/// Modes are ordered: None < Read < Write < Admin < Owner. The ordering is
/// used both for `effective >= required` checks and for capping indirect
/// access (see [`AccessMode::cap`]).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// No access at all.
    #[default]
    None,
    /// Can clone, fetch and download archives.
    Read,
    /// Can push.
    Write,
    /// Can manage repository settings.
    Admin,
    /// Full ownership.
    Owner,
}

impl AccessMode {
    /// Check if this mode grants at least the required level.
    pub fn has(self, required: AccessMode) -> bool {
        self >= required
    }

    /// Limit this mode to at most `ceiling`.
    pub fn cap(self, ceiling: AccessMode) -> AccessMode {
        self.min(ceiling)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::None => write!(f, "none"),
            AccessMode::Read => write!(f, "read"),
            AccessMode::Write => write!(f, "write"),
            AccessMode::Admin => write!(f, "admin"),
            AccessMode::Owner => write!(f, "owner"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mode_strategy() -> impl Strategy<Value = AccessMode> {
        prop_oneof![
            Just(AccessMode::None),
            Just(AccessMode::Read),
            Just(AccessMode::Write),
            Just(AccessMode::Admin),
            Just(AccessMode::Owner),
        ]
    }

    fn rank(mode: AccessMode) -> u8 {
        match mode {
            AccessMode::None => 0,
            AccessMode::Read => 1,
            AccessMode::Write => 2,
            AccessMode::Admin => 3,
            AccessMode::Owner => 4,
        }
    }

    #[test]
    fn test_mode_ordering() {
        assert!(AccessMode::None < AccessMode::Read);
        assert!(AccessMode::Read < AccessMode::Write);
        assert!(AccessMode::Write < AccessMode::Admin);
        assert!(AccessMode::Admin < AccessMode::Owner);
        assert_eq!(AccessMode::default(), AccessMode::None);
    }

    #[test]
    fn test_mode_cap() {
        assert_eq!(AccessMode::Owner.cap(AccessMode::Write), AccessMode::Write);
        assert_eq!(AccessMode::Admin.cap(AccessMode::Write), AccessMode::Write);
        assert_eq!(AccessMode::Read.cap(AccessMode::Write), AccessMode::Read);
        assert_eq!(AccessMode::None.cap(AccessMode::Write), AccessMode::None);
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&AccessMode::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let mode: AccessMode = serde_json::from_str("\"write\"").unwrap();
        assert_eq!(mode, AccessMode::Write);
    }

    proptest! {
        #[test]
        fn prop_has_matches_ladder(effective in mode_strategy(), required in mode_strategy()) {
            prop_assert_eq!(effective.has(required), rank(effective) >= rank(required));
        }

        #[test]
        fn prop_cap_never_exceeds_ceiling(mode in mode_strategy(), ceiling in mode_strategy()) {
            let capped = mode.cap(ceiling);
            prop_assert!(capped <= ceiling);
            prop_assert!(capped <= mode);
        }
    }
}
