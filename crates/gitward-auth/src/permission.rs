//! Effective access mode of an account on a repository.

use crate::error::Result;
use crate::store::AccessRecords;
use gitward_types::{AccessMode, Account, AccountId, Repository};

/// Fork chains deeper than this stop inheriting.
const MAX_FORK_DEPTH: usize = 16;

/// Resolve what `account` could do on `repo`.
///
/// Resolution order:
/// 1. Site administrators get `Owner`.
/// 2. The owning account gets `Owner`.
/// 3. The highest direct collaborator or team grant.
/// 4. Failing that, for a fork, whatever the account holds on the base
///    repository chain, capped at `Write`.
/// 5. Public repositories give everyone at least `Read`, including
///    anonymous callers.
///
/// Mirror status is not considered here; write denial on mirrors is the
/// gateway's decision.
pub fn resolve_access_mode<R: AccessRecords + ?Sized>(
    records: &R,
    account: Option<&Account>,
    repo: &Repository,
) -> Result<AccessMode> {
    let floor = if repo.is_private {
        AccessMode::None
    } else {
        AccessMode::Read
    };

    let Some(account) = account else {
        return Ok(floor);
    };
    if account.is_admin {
        return Ok(AccessMode::Owner);
    }

    let mut mode = direct_mode(records, account.id, repo)?;
    if mode == AccessMode::None {
        mode = inherited_mode(records, account.id, repo)?;
    }
    Ok(mode.max(floor))
}

fn direct_mode<R: AccessRecords + ?Sized>(
    records: &R,
    account: AccountId,
    repo: &Repository,
) -> Result<AccessMode> {
    if repo.owner_id == account {
        return Ok(AccessMode::Owner);
    }

    let mut mode = records
        .collaborator_mode(account, repo.id)?
        .unwrap_or_default();
    for team_mode in records.team_modes(account, repo.id)? {
        mode = mode.max(team_mode);
    }
    Ok(mode)
}

/// Walk the fork chain; the visibility of base repositories never leaks in.
fn inherited_mode<R: AccessRecords + ?Sized>(
    records: &R,
    account: AccountId,
    repo: &Repository,
) -> Result<AccessMode> {
    let mut next = repo.base_repo_id;
    let mut depth = 0;

    while let Some(base_id) = next {
        if depth == MAX_FORK_DEPTH {
            tracing::warn!(repo_id = repo.id, "Fork chain too deep, ignoring base permissions");
            break;
        }
        let Some(base) = records.get_repository(base_id)? else {
            tracing::debug!(repo_id = repo.id, base_id, "Base repository not found");
            break;
        };

        let mode = direct_mode(records, account, &base)?;
        if mode != AccessMode::None {
            return Ok(mode.cap(AccessMode::Write));
        }
        next = base.base_repo_id;
        depth += 1;
    }

    Ok(AccessMode::None)
}
