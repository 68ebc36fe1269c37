//! Configuration loading.
//!
//! Sources, later ones winning:
//!
//! ```text
//! defaults (serde)
//!   -> TOML file (--config, or custom/conf/app.toml when present)
//!   -> GITWARD_* environment (`__` separates sections)
//!   -> overrides
//! ```
//!
//! Relative paths (the default config file, `repository.root`, `store.path`
//! and `log.root_path`) are resolved against the work directory:
//! `GITWARD_WORK_DIR` if set, else the directory holding the executable.
//! Hooks run with git's working directory, so nothing is left relative to
//! the caller's.

use anyhow::{bail, Context};
use gitward_auth::AuthOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "custom/conf/app.toml";

/// Prefix of environment overrides, e.g. `GITWARD_REPOSITORY__ROOT`.
pub const ENV_PREFIX: &str = "GITWARD";

/// Overrides the work directory relative paths are resolved against.
pub const ENV_WORK_DIR: &str = "GITWARD_WORK_DIR";

/// The work directory: [`ENV_WORK_DIR`], else the executable's directory.
pub fn work_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os(ENV_WORK_DIR).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let exe = std::env::current_exe().context("failed to locate the executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("executable '{}' has no parent directory", exe.display()))
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Error details are echoed to the client and logging is verbose.
    #[default]
    Dev,
    /// Error details only go to the log.
    Prod,
}

/// Repository storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Root directory holding `<owner>/<name>.git`.
    pub root: PathBuf,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/repositories"),
        }
    }
}

/// SSH access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Refuse all SSH commands.
    pub disabled: bool,
}

/// Authentication policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Anonymous-style reads of public repositories are not allowed.
    pub require_signin_view: bool,
}

/// The web application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL the hooks use to reach the application.
    pub local_root_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            local_root_url: "http://localhost:3000/".to_string(),
        }
    }
}

/// Git executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Path or name of the git binary.
    pub binary: PathBuf,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

/// Hook behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Upper bound on the task trigger request.
    pub trigger_timeout_secs: u64,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            trigger_timeout_secs: 10,
        }
    }
}

/// File logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log directory; entry points write under `<root_path>/hooks/`.
    pub root_path: PathBuf,
    /// `EnvFilter` directive; defaults by run mode.
    pub level: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("log"),
            level: None,
        }
    }
}

/// Record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot of accounts, keys, repositories and rules.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/store.json"),
        }
    }
}

/// Full configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment mode.
    pub run_mode: RunMode,
    /// Prefix of every message shown to the client.
    pub app_name: String,
    /// Repository storage.
    pub repository: RepositoryConfig,
    /// SSH access.
    pub ssh: SshConfig,
    /// Authentication policy.
    pub auth: AuthConfig,
    /// The web application.
    pub server: ServerConfig,
    /// Git executable.
    pub git: GitConfig,
    /// Hook behaviour.
    pub hook: HookConfig,
    /// File logging.
    pub log: LogConfig,
    /// Record store.
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            app_name: "gitward".to_string(),
            repository: RepositoryConfig::default(),
            ssh: SshConfig::default(),
            auth: AuthConfig::default(),
            server: ServerConfig::default(),
            git: GitConfig::default(),
            hook: HookConfig::default(),
            log: LogConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// What the gateway needs to hand a command to git.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Repository storage root; git runs from here.
    pub repository_root: PathBuf,
    /// Git binary.
    pub git_binary: PathBuf,
}

/// What the hooks need beyond their context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOptions {
    /// Base URL of the application's task endpoint.
    pub local_root_url: String,
    /// Task trigger timeout.
    pub trigger_timeout: Duration,
    /// Git binary.
    pub git_binary: PathBuf,
}

impl Config {
    /// [`load_from`](Self::load_from) the [`work_dir`].
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_from(path, &work_dir()?)
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] under `work_dir` if
    /// it exists, plus the process environment. Relative paths in the result
    /// are resolved against `work_dir`.
    pub fn load_from(path: Option<&Path>, work_dir: &Path) -> anyhow::Result<Self> {
        let loader = match path {
            Some(path) => ConfigLoader::new().add_toml_file(path),
            None => ConfigLoader::new().add_toml_file_optional(work_dir.join(DEFAULT_CONFIG_PATH)),
        };
        let config = loader.with_env_prefix(ENV_PREFIX).build()?;
        Ok(config.resolve_paths(work_dir))
    }

    /// Join relative storage, store and log paths onto `base`.
    #[must_use]
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        for path in [
            &mut self.repository.root,
            &mut self.store.path,
            &mut self.log.root_path,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Restricted mode.
    pub fn is_prod(&self) -> bool {
        self.run_mode == RunMode::Prod
    }

    /// Log filter directive: the configured level, else `trace` in dev and
    /// `error` in prod.
    pub fn log_filter(&self) -> &str {
        match (&self.log.level, self.run_mode) {
            (Some(level), _) => level,
            (None, RunMode::Dev) => "trace",
            (None, RunMode::Prod) => "error",
        }
    }

    /// Options for the key authenticator.
    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions {
            require_signin_view: self.auth.require_signin_view,
        }
    }

    /// Options for the gateway's dispatcher.
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            repository_root: self.repository.root.clone(),
            git_binary: self.git.binary.clone(),
        }
    }

    /// Options for the hook processor.
    pub fn hook_options(&self) -> HookOptions {
        HookOptions {
            local_root_url: self.server.local_root_url.clone(),
            trigger_timeout: Duration::from_secs(self.hook.trigger_timeout_secs),
            git_binary: self.git.binary.clone(),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.app_name.trim().is_empty() {
            bail!("app_name must not be empty");
        }
        if self.hook.trigger_timeout_secs == 0 {
            bail!("hook.trigger_timeout_secs must be greater than zero");
        }
        if self.git.binary.as_os_str().is_empty() {
            bail!("git.binary must not be empty");
        }
        Ok(())
    }
}

/// Builder for loading configuration from multiple sources.
pub struct ConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: Option<String>,
    env_vars: Option<config::Map<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Start with no sources.
    pub fn new() -> Self {
        Self {
            builder: config::Config::builder(),
            env_prefix: None,
            env_vars: None,
        }
    }

    /// Add a TOML file that must exist.
    #[must_use]
    pub fn add_toml_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        use config::{File, FileFormat};
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).format(FileFormat::Toml).required(true));
        self
    }

    /// Add a TOML file that is skipped when missing.
    #[must_use]
    pub fn add_toml_file_optional<P: AsRef<Path>>(mut self, path: P) -> Self {
        use config::{File, FileFormat};
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).format(FileFormat::Toml).required(false));
        self
    }

    /// Add inline TOML.
    #[must_use]
    pub fn add_toml_str(mut self, content: &str) -> Self {
        use config::{File, FileFormat};
        self.builder = self
            .builder
            .add_source(File::from_str(content, FileFormat::Toml));
        self
    }

    /// Read overrides from `<PREFIX>_*` environment variables.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Use these variables instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Set a single key, e.g. `("log.level", "debug")`.
    pub fn set<T: Into<config::Value>>(mut self, key: &str, value: T) -> anyhow::Result<Self> {
        self.builder = self
            .builder
            .set_override(key, value)
            .with_context(|| format!("invalid override for '{key}'"))?;
        Ok(self)
    }

    /// Merge all sources and validate the result.
    pub fn build(self) -> anyhow::Result<Config> {
        let builder = match &self.env_prefix {
            Some(prefix) => self.builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(self.env_vars),
            ),
            None => self.builder,
        };
        let config: Config = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> ConfigLoader {
        ConfigLoader::new()
            .with_env_prefix(ENV_PREFIX)
            .with_env_vars(Vec::<(String, String)>::new())
    }

    #[test]
    fn test_defaults() {
        let config = no_env().build().unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.is_prod());
        assert_eq!(config.log_filter(), "trace");
        assert_eq!(config.hook_options().trigger_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_toml_sections() {
        let config = no_env()
            .add_toml_str(
                r#"
                run_mode = "prod"
                app_name = "forge"

                [repository]
                root = "/srv/git"

                [auth]
                require_signin_view = true

                [server]
                local_root_url = "https://forge.example.com/"
                "#,
            )
            .build()
            .unwrap();

        assert!(config.is_prod());
        assert_eq!(config.app_name, "forge");
        assert_eq!(config.log_filter(), "error");
        assert_eq!(config.dispatch_options().repository_root, PathBuf::from("/srv/git"));
        assert!(config.auth_options().require_signin_view);
        assert_eq!(config.hook_options().local_root_url, "https://forge.example.com/");
        assert!(!config.ssh.disabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ConfigLoader::new()
            .add_toml_str("[ssh]\ndisabled = false\n")
            .with_env_prefix(ENV_PREFIX)
            .with_env_vars([
                ("GITWARD_SSH__DISABLED", "true"),
                ("GITWARD_LOG__LEVEL", "debug"),
                ("GITWARD_REPO_ID", "7"),
            ])
            .build()
            .unwrap();

        assert!(config.ssh.disabled);
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_override() {
        let config = no_env()
            .set("hook.trigger_timeout_secs", 3_i64)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.hook.trigger_timeout_secs, 3);
    }

    #[test]
    fn test_validation() {
        assert!(no_env().add_toml_str("app_name = \"\"").build().is_err());
        assert!(no_env()
            .add_toml_str("[hook]\ntrigger_timeout_secs = 0")
            .build()
            .is_err());
        assert!(no_env().add_toml_str("run_mode = \"staging\"").build().is_err());
    }

    #[test]
    fn test_required_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::load(Some(missing.as_path())).is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let base = Path::new("/opt/gitward");
        let config = no_env()
            .add_toml_str(
                r#"
                [store]
                path = "/var/lib/gitward/store.json"
                "#,
            )
            .build()
            .unwrap()
            .resolve_paths(base);

        assert_eq!(
            config.dispatch_options().repository_root,
            PathBuf::from("/opt/gitward/data/repositories")
        );
        assert_eq!(config.store.path, PathBuf::from("/var/lib/gitward/store.json"));
        assert_eq!(config.log.root_path, PathBuf::from("/opt/gitward/log"));
        assert_eq!(config.git.binary, PathBuf::from("git"));
    }

    #[test]
    fn test_load_from_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join(DEFAULT_CONFIG_PATH);
        std::fs::create_dir_all(conf.parent().unwrap()).unwrap();
        std::fs::write(&conf, "app_name = \"forge\"\n[repository]\nroot = \"repos\"\n").unwrap();

        let config = Config::load_from(None, dir.path()).unwrap();
        assert_eq!(config.app_name, "forge");
        assert_eq!(config.repository.root, dir.path().join("repos"));
        assert_eq!(config.store.path, dir.path().join("data/store.json"));
        assert!(config.log.root_path.is_absolute());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(&path, "[store]\npath = \"/var/lib/gitward/store.json\"\n").unwrap();

        let config = ConfigLoader::new().add_toml_file(&path).build().unwrap();
        assert_eq!(config.store.path, PathBuf::from("/var/lib/gitward/store.json"));
    }
}
