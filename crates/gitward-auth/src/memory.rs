//! In-memory store, optionally backed by a JSON snapshot on disk.

use crate::{
    collaborator::Collaborator,
    error::{AuthError, Result},
    snapshot::{append_line, read_lines, sidecar_path, Activity, DeployKeyBinding, Snapshot},
    store::{AccessRecords, BranchProtectionStore, KeyStore, PushEventStore, RepositoryStore},
    team::Team,
};
use gitward_types::{
    unix_now, AccessMode, Account, AccountId, KeyId, PrincipalKey, ProtectedBranchRule, PushEvent,
    RepoId, Repository,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const EVENTS_SUFFIX: &str = ".events";
const ACTIVITY_SUFFIX: &str = ".activity";

/// Thread-safe in-memory store for authorization data.
///
/// When opened from a snapshot file, the snapshot is never written. Key
/// activity is appended to `<snapshot>.activity` and replayed on open; push
/// events are appended to `<snapshot>.events`. Both are JSON lines.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Accounts by ID.
    accounts: RwLock<HashMap<AccountId, Account>>,

    /// Keys by ID.
    keys: RwLock<HashMap<KeyId, PrincipalKey>>,

    /// Repositories by ID.
    repositories: RwLock<HashMap<RepoId, Repository>>,

    /// (owner, name) to repository ID.
    repo_name_index: RwLock<HashMap<(String, String), RepoId>>,

    /// Collaborators by (repo, account) pair.
    collaborators: RwLock<HashMap<(RepoId, AccountId), Collaborator>>,

    /// Teams by ID.
    teams: RwLock<HashMap<u64, Team>>,

    /// Deploy key bindings by (key, repo) pair.
    deploy_keys: RwLock<HashMap<(KeyId, RepoId), DeployKeyBinding>>,

    /// Branch rules by (repo, branch) pair.
    branch_rules: RwLock<HashMap<(RepoId, String), ProtectedBranchRule>>,

    /// Push events recorded by this process.
    push_events: RwLock<Vec<PushEvent>>,

    /// Snapshot file the sidecar logs sit next to.
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for account in snapshot.accounts {
            store.insert_account(account);
        }
        for key in snapshot.keys {
            store.insert_key(key);
        }
        for repo in snapshot.repositories {
            store.insert_repository(repo);
        }
        for collab in snapshot.collaborators {
            store.set_collaborator(collab);
        }
        for team in snapshot.teams {
            store.insert_team(team);
        }
        for binding in snapshot.deploy_keys {
            store
                .deploy_keys
                .write()
                .insert((binding.key_id, binding.repo_id), binding);
        }
        for rule in snapshot.branch_rules {
            store.set_branch_rule(rule);
        }
        store
    }

    /// Load a snapshot file and the key activity recorded next to it.
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = Self::from_snapshot(Snapshot::load(path)?);
        for activity in read_lines(&sidecar_path(path, ACTIVITY_SUFFIX))? {
            store.replay(activity);
        }
        store.snapshot_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Opened store snapshot");
        Ok(store)
    }

    fn replay(&self, activity: Activity) {
        let latest = |seen: &mut Option<u64>, at: u64| {
            *seen = Some(seen.map_or(at, |prev| prev.max(at)));
        };
        match activity {
            Activity::Key { key_id, at } => {
                if let Some(key) = self.keys.write().get_mut(&key_id) {
                    latest(&mut key.last_used_at, at);
                }
            }
            Activity::DeployKey {
                key_id,
                repo_id,
                at,
            } => {
                if let Some(binding) = self.deploy_keys.write().get_mut(&(key_id, repo_id)) {
                    latest(&mut binding.last_used_at, at);
                }
            }
        }
    }

    fn record_activity(&self, activity: Activity) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            append_line(&sidecar_path(path, ACTIVITY_SUFFIX), &activity)?;
        }
        Ok(())
    }

    // ==================== Records ====================

    /// Add or replace an account.
    pub fn insert_account(&self, account: Account) {
        self.accounts.write().insert(account.id, account);
    }

    /// Add or replace a key.
    pub fn insert_key(&self, key: PrincipalKey) {
        self.keys.write().insert(key.id, key);
    }

    /// Add or replace a repository.
    pub fn insert_repository(&self, repo: Repository) {
        let index_key = (repo.owner_name.to_lowercase(), repo.name.to_lowercase());
        self.repo_name_index.write().insert(index_key, repo.id);
        self.repositories.write().insert(repo.id, repo);
    }

    /// Add or update a collaborator.
    pub fn set_collaborator(&self, collab: Collaborator) {
        self.collaborators
            .write()
            .insert((collab.repo_id, collab.account_id), collab);
    }

    /// Add or replace a team.
    pub fn insert_team(&self, team: Team) {
        self.teams.write().insert(team.id, team);
    }

    /// Bind a deploy key to a repository.
    pub fn bind_deploy_key(&self, key_id: KeyId, repo_id: RepoId) {
        self.deploy_keys
            .write()
            .entry((key_id, repo_id))
            .or_insert_with(|| DeployKeyBinding::new(key_id, repo_id));
    }

    /// Add or replace the rule for a branch. Rules match branch names
    /// case-insensitively.
    pub fn set_branch_rule(&self, rule: ProtectedBranchRule) {
        self.branch_rules
            .write()
            .insert((rule.repo_id, rule.branch.to_lowercase()), rule);
    }

    /// Push events recorded so far.
    pub fn push_events(&self) -> Vec<PushEvent> {
        self.push_events.read().clone()
    }

    /// Deploy key binding, if any.
    pub fn deploy_key_binding(&self, key_id: KeyId, repo_id: RepoId) -> Option<DeployKeyBinding> {
        self.deploy_keys.read().get(&(key_id, repo_id)).cloned()
    }
}

impl KeyStore for MemoryStore {
    fn get_key_by_id(&self, id: KeyId) -> Result<Option<PrincipalKey>> {
        Ok(self.keys.read().get(&id).cloned())
    }

    fn is_deploy_key_bound_to_repo(&self, key_id: KeyId, repo_id: RepoId) -> Result<bool> {
        Ok(self.deploy_keys.read().contains_key(&(key_id, repo_id)))
    }

    fn touch_key(&self, id: KeyId) -> Result<()> {
        let at = unix_now();
        {
            let mut keys = self.keys.write();
            let key = keys
                .get_mut(&id)
                .ok_or_else(|| AuthError::NotFound(format!("key {id}")))?;
            key.last_used_at = Some(at);
        }
        self.record_activity(Activity::Key { key_id: id, at })
    }

    fn touch_deploy_key(&self, key_id: KeyId, repo_id: RepoId) -> Result<()> {
        let at = unix_now();
        {
            let mut bindings = self.deploy_keys.write();
            let binding = bindings.get_mut(&(key_id, repo_id)).ok_or_else(|| {
                AuthError::NotFound(format!("deploy key {key_id} on repository {repo_id}"))
            })?;
            binding.last_used_at = Some(at);
        }
        self.record_activity(Activity::DeployKey {
            key_id,
            repo_id,
            at,
        })
    }
}

impl RepositoryStore for MemoryStore {
    fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(&id).cloned())
    }

    fn get_repository(&self, id: RepoId) -> Result<Option<Repository>> {
        Ok(self.repositories.read().get(&id).cloned())
    }

    fn get_repository_by_owner_and_name(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Repository>> {
        let index_key = (owner.to_lowercase(), name.to_lowercase());
        let Some(id) = self.repo_name_index.read().get(&index_key).copied() else {
            return Ok(None);
        };
        self.get_repository(id)
    }
}

impl AccessRecords for MemoryStore {
    fn collaborator_mode(&self, account: AccountId, repo: RepoId) -> Result<Option<AccessMode>> {
        Ok(self
            .collaborators
            .read()
            .get(&(repo, account))
            .map(|c| c.mode))
    }

    fn team_modes(&self, account: AccountId, repo: RepoId) -> Result<Vec<AccessMode>> {
        Ok(self
            .teams
            .read()
            .values()
            .filter_map(|team| team.mode_for(account, repo))
            .collect())
    }
}

impl BranchProtectionStore for MemoryStore {
    fn get_protected_branch_rule(
        &self,
        repo_id: RepoId,
        branch: &str,
    ) -> Result<Option<ProtectedBranchRule>> {
        Ok(self
            .branch_rules
            .read()
            .get(&(repo_id, branch.to_lowercase()))
            .cloned())
    }

    fn is_user_in_push_whitelist(
        &self,
        repo_id: RepoId,
        account: AccountId,
        branch: &str,
    ) -> Result<bool> {
        Ok(self
            .branch_rules
            .read()
            .get(&(repo_id, branch.to_lowercase()))
            .is_some_and(|rule| rule.enable_whitelist && rule.is_whitelisted(account)))
    }
}

impl PushEventStore for MemoryStore {
    fn create_push_event(&self, event: &PushEvent) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            append_line(&sidecar_path(path, EVENTS_SUFFIX), event)?;
        }
        self.push_events.write().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> PushEvent {
        PushEvent {
            old_commit_id: "a1b2".into(),
            new_commit_id: "c3d4".into(),
            ref_name: "refs/heads/main".into(),
            pusher_id: Some(2),
            pusher_name: "bob".into(),
            repo_id: 1,
            repo_owner_name: "acme".into(),
            repo_name: "widgets".into(),
            created_at: 1,
        }
    }

    #[test]
    fn test_repository_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        store.insert_repository(Repository::new(1, 10, "acme", "widgets"));

        let repo = store
            .get_repository_by_owner_and_name("ACME", "Widgets")
            .unwrap()
            .unwrap();
        assert_eq!(repo.id, 1);
        assert!(store
            .get_repository_by_owner_and_name("acme", "gadgets")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_deploy_key_binding() {
        let store = MemoryStore::new();
        store.insert_key(PrincipalKey::deploy(5, "ci", AccessMode::Write));
        store.bind_deploy_key(5, 1);

        assert!(store.is_deploy_key_bound_to_repo(5, 1).unwrap());
        assert!(!store.is_deploy_key_bound_to_repo(5, 2).unwrap());

        store.touch_deploy_key(5, 1).unwrap();
        assert!(store.deploy_key_binding(5, 1).unwrap().last_used_at.is_some());
        assert!(store.touch_deploy_key(5, 2).is_err());
    }

    #[test]
    fn test_touch_missing_key_fails() {
        let store = MemoryStore::new();
        assert!(matches!(store.touch_key(42), Err(AuthError::NotFound(_))));
    }

    #[test]
    fn test_team_and_collaborator_grants() {
        let store = MemoryStore::new();
        store.set_collaborator(Collaborator::new(1, 2, AccessMode::Read));

        let mut team = Team::new(7, 10, "devs", AccessMode::Write);
        team.add_member(2);
        team.add_repo(1);
        store.insert_team(team);

        assert_eq!(store.collaborator_mode(2, 1).unwrap(), Some(AccessMode::Read));
        assert_eq!(store.collaborator_mode(3, 1).unwrap(), None);
        assert_eq!(store.team_modes(2, 1).unwrap(), vec![AccessMode::Write]);
        assert!(store.team_modes(2, 9).unwrap().is_empty());
    }

    #[test]
    fn test_whitelist_requires_enabled_rule() {
        let store = MemoryStore::new();
        let mut rule = ProtectedBranchRule::new(1, "main").with_whitelist([2]);
        store.set_branch_rule(rule.clone());
        assert!(store.is_user_in_push_whitelist(1, 2, "main").unwrap());
        assert!(!store.is_user_in_push_whitelist(1, 3, "main").unwrap());
        assert!(!store.is_user_in_push_whitelist(1, 2, "develop").unwrap());

        rule.enable_whitelist = false;
        store.set_branch_rule(rule);
        assert!(!store.is_user_in_push_whitelist(1, 2, "main").unwrap());
    }

    fn write_snapshot(path: &Path, snapshot: &Snapshot) {
        std::fs::write(path, serde_json::to_vec_pretty(snapshot).unwrap()).unwrap();
    }

    #[test]
    fn test_open_replays_touch_and_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        write_snapshot(
            &path,
            &Snapshot {
                keys: vec![PrincipalKey::user(1, "laptop", 2)],
                ..Snapshot::default()
            },
        );
        let before = std::fs::read(&path).unwrap();

        let store = MemoryStore::open(&path).unwrap();
        store.touch_key(1).unwrap();
        store.create_push_event(&sample_event()).unwrap();
        store.create_push_event(&sample_event()).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);

        let reloaded = MemoryStore::open(&path).unwrap();
        let key = reloaded.get_key_by_id(1).unwrap().unwrap();
        assert!(key.last_used_at.is_some());

        let events = std::fs::read_to_string(dir.path().join("store.json.events")).unwrap();
        assert_eq!(events.lines().count(), 2);
        let first: PushEvent = serde_json::from_str(events.lines().next().unwrap()).unwrap();
        assert_eq!(first, sample_event());
        assert_eq!(store.push_events().len(), 2);
    }

    #[test]
    fn test_replay_keeps_latest_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        write_snapshot(
            &path,
            &Snapshot {
                keys: vec![PrincipalKey::deploy(9, "ci", gitward_types::AccessMode::Read)],
                deploy_keys: vec![DeployKeyBinding::new(9, 3)],
                ..Snapshot::default()
            },
        );
        let activity = sidecar_path(&path, ACTIVITY_SUFFIX);
        for at in [30, 10, 20] {
            append_line(&activity, &Activity::Key { key_id: 9, at }).unwrap();
            append_line(
                &activity,
                &Activity::DeployKey {
                    key_id: 9,
                    repo_id: 3,
                    at,
                },
            )
            .unwrap();
        }
        append_line(&activity, &Activity::Key { key_id: 404, at: 99 }).unwrap();

        let store = MemoryStore::open(&path).unwrap();
        assert_eq!(store.get_key_by_id(9).unwrap().unwrap().last_used_at, Some(30));
        assert_eq!(
            store.deploy_key_binding(9, 3).unwrap().last_used_at,
            Some(30)
        );
        assert!(store.get_key_by_id(404).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_touches_from_many_processes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        write_snapshot(
            &path,
            &Snapshot {
                keys: vec![PrincipalKey::user(1, "laptop", 2)],
                ..Snapshot::default()
            },
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut failures = 0;
                    for _ in 0..50 {
                        let touched = MemoryStore::open(&path).and_then(|store| store.touch_key(1));
                        if touched.is_err() {
                            failures += 1;
                        }
                    }
                    failures
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let activity =
            std::fs::read_to_string(sidecar_path(&path, ACTIVITY_SUFFIX)).unwrap();
        assert_eq!(activity.lines().count(), 400);
        for line in activity.lines() {
            serde_json::from_str::<Activity>(line).unwrap();
        }
        let reloaded = MemoryStore::open(&path).unwrap();
        assert!(reloaded.get_key_by_id(1).unwrap().unwrap().last_used_at.is_some());
    }

    #[test]
    fn test_touch_keeps_edits_made_after_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        write_snapshot(
            &path,
            &Snapshot {
                keys: vec![
                    PrincipalKey::user(1, "laptop", 2),
                    PrincipalKey::user(2, "old", 2),
                ],
                ..Snapshot::default()
            },
        );
        let store = MemoryStore::open(&path).unwrap();

        // Key 2 revoked and `main` protected while the session is running.
        write_snapshot(
            &path,
            &Snapshot {
                keys: vec![PrincipalKey::user(1, "laptop", 2)],
                branch_rules: vec![ProtectedBranchRule::new(5, "main")],
                ..Snapshot::default()
            },
        );
        store.touch_key(1).unwrap();
        store.touch_key(2).unwrap();

        let reloaded = MemoryStore::open(&path).unwrap();
        assert!(reloaded.get_key_by_id(2).unwrap().is_none());
        assert!(reloaded
            .get_protected_branch_rule(5, "main")
            .unwrap()
            .is_some());
        assert!(reloaded.get_key_by_id(1).unwrap().unwrap().last_used_at.is_some());
    }

    #[test]
    fn test_branch_rule_lookup_ignores_case() {
        let store = MemoryStore::new();
        store.set_branch_rule(ProtectedBranchRule::new(5, "main").with_whitelist([7]));

        let rule = store.get_protected_branch_rule(5, "Main").unwrap().unwrap();
        assert_eq!(rule.branch, "main");
        assert!(store.is_user_in_push_whitelist(5, 7, "MAIN").unwrap());
        assert!(store.get_protected_branch_rule(5, "develop").unwrap().is_none());
        assert!(store.get_protected_branch_rule(6, "main").unwrap().is_none());
    }
}
