//! Key authentication: from a `key-<id>` argument to an authorized principal.

use crate::error::{AuthError, Result};
use crate::permission::resolve_access_mode;
use crate::store::GatewayStore;
use gitward_types::{AccessMode, Account, KeyId, PrincipalKey, Repository};

/// Site-wide switches that affect authentication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthOptions {
    /// Every read must come from an identified principal, even on public
    /// repositories.
    pub require_signin_view: bool,
}

/// The outcome of a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Key that was presented.
    pub key: PrincipalKey,
    /// Resolved account; `None` for deploy keys and unidentified public reads.
    pub account: Option<Account>,
    /// Effective mode on the target repository.
    pub mode: AccessMode,
}

/// Parse the `key-<id>` argument the SSH server passes us.
pub fn parse_key_arg(arg: &str) -> Result<KeyId> {
    arg.strip_prefix("key-")
        .and_then(|id| id.parse::<KeyId>().ok())
        .ok_or_else(|| AuthError::InvalidKeyId(arg.to_string()))
}

/// Authenticates keys against repositories.
pub struct KeyAuthenticator<'a, S: GatewayStore + ?Sized> {
    store: &'a S,
    options: AuthOptions,
}

impl<'a, S: GatewayStore + ?Sized> KeyAuthenticator<'a, S> {
    /// Create an authenticator over a store.
    pub fn new(store: &'a S, options: AuthOptions) -> Self {
        Self { store, options }
    }

    /// Parse the key argument and load the key it names.
    pub fn load_key(&self, arg: &str) -> Result<PrincipalKey> {
        let id = parse_key_arg(arg)?;
        self.store
            .get_key_by_id(id)?
            .ok_or(AuthError::KeyNotFound(id))
    }

    /// Check that `key` may perform a `required` operation on `repo`.
    ///
    /// Writes, private repositories and sign-in-to-view all require the key
    /// to be tied to an identity: a bound deploy key or a user key whose
    /// account resolves to a sufficient mode. Anything else is a public read
    /// and is accepted as such.
    ///
    /// On success the key is marked as used; failing to record that is an
    /// error.
    pub fn authorize(
        &self,
        key: PrincipalKey,
        repo: &Repository,
        required: AccessMode,
    ) -> Result<Principal> {
        let needs_identity = required.has(AccessMode::Write)
            || repo.is_private
            || self.options.require_signin_view;

        let (account, mode) = if !needs_identity {
            (None, AccessMode::Read)
        } else if let Some(owner_id) = key.owner_id() {
            let account = self.store.get_account(owner_id)?.ok_or_else(|| {
                AuthError::NotFound(format!("account {owner_id} of key {}", key.id))
            })?;
            let mode = resolve_access_mode(self.store, Some(&account), repo)?;
            if !mode.has(required) {
                return Err(AuthError::InsufficientAccess {
                    user: account.name,
                    repo: repo.full_name(),
                    required,
                    effective: mode,
                });
            }
            (Some(account), mode)
        } else {
            if !self.store.is_deploy_key_bound_to_repo(key.id, repo.id)? {
                return Err(AuthError::KeyAccessDenied {
                    key_id: key.id,
                    repo_id: repo.id,
                });
            }
            let mode = key.deploy_mode().unwrap_or_default();
            if !mode.has(required) {
                return Err(AuthError::KeyPermissionDenied {
                    key_id: key.id,
                    required,
                });
            }
            (None, mode)
        };

        self.store.touch_key(key.id)?;
        if needs_identity && key.is_deploy_key() {
            self.store.touch_deploy_key(key.id, repo.id)?;
        }

        tracing::debug!(
            key_id = key.id,
            repo = %repo.full_name(),
            %required,
            %mode,
            "Key authorized"
        );
        Ok(Principal { key, account, mode })
    }

    /// [`load_key`](Self::load_key) followed by [`authorize`](Self::authorize).
    pub fn authenticate(
        &self,
        arg: &str,
        repo: &Repository,
        required: AccessMode,
    ) -> Result<Principal> {
        let key = self.load_key(arg)?;
        self.authorize(key, repo, required)
    }
}
