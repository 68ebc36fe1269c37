//! The SSH command gateway.
//!
//! The SSH server runs `gitward serv key-<id>` for every connection, with the
//! client's requested command in `SSH_ORIGINAL_COMMAND`. The gateway moves
//! through a fixed sequence of stages and either hands the connection to git
//! or terminates with a message for the client:
//!
//! ```text
//! Parsing -> Authenticating -> Authorizing -> Dispatching -> Terminated
//!    |             |                |              |
//!    +-------------+----------------+--------------+--> Terminated (exit 1)
//! ```

use crate::config::{Config, DispatchOptions};
use crate::logging;
use gitward_auth::{
    AuthError, AuthOptions, GatewayStore, KeyAuthenticator, MemoryStore, ACCESS_DENIED_MESSAGE,
};
use gitward_git::{parse_ssh_command, DispatchRequest, Dispatcher, GitVerb, ProcessDispatcher};
use gitward_hook::HookContext;
use std::cell::Cell;
use std::fmt;
use std::io::{self, Write};

/// Environment variable holding the client's command.
pub const SSH_COMMAND_ENV: &str = "SSH_ORIGINAL_COMMAND";

/// Stage of one gateway invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Splitting the command into verb and repository.
    Parsing,
    /// Loading the presented key.
    Authenticating,
    /// Checking the key against the repository.
    Authorizing,
    /// Running git.
    Dispatching,
    /// Done, successfully or not.
    Terminated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsing => "parsing",
            Self::Authenticating => "authenticating",
            Self::Authorizing => "authorizing",
            Self::Dispatching => "dispatching",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Why the gateway terminated early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Stage that failed.
    pub stage: Stage,
    /// Message safe to show the client.
    pub client_message: String,
    /// Full detail for the log.
    pub detail: String,
}

impl Failure {
    fn new(stage: Stage, client_message: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self {
            stage,
            client_message: client_message.into(),
            detail: detail.to_string(),
        }
    }

    fn auth(stage: Stage, err: &AuthError) -> Self {
        Self::new(stage, err.client_message(), err)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.detail)
    }
}

impl std::error::Error for Failure {}

/// Authorizes one SSH command and dispatches it to git.
pub struct Gateway<'a, S: ?Sized, D: ?Sized> {
    store: &'a S,
    dispatcher: &'a D,
    auth: AuthOptions,
    dispatch: DispatchOptions,
    stage: Cell<Stage>,
}

impl<'a, S, D> Gateway<'a, S, D>
where
    S: GatewayStore + ?Sized,
    D: Dispatcher + ?Sized,
{
    /// Create a gateway.
    pub fn new(
        store: &'a S,
        dispatcher: &'a D,
        auth: AuthOptions,
        dispatch: DispatchOptions,
    ) -> Self {
        Self {
            store,
            dispatcher,
            auth,
            dispatch,
            stage: Cell::new(Stage::Parsing),
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    fn enter(&self, stage: Stage) {
        tracing::trace!(from = %self.stage.get(), to = %stage, "Gateway stage");
        self.stage.set(stage);
    }

    fn terminate(&self, failure: Failure) -> Failure {
        self.enter(Stage::Terminated);
        failure
    }

    /// Run `ssh_command` on behalf of the key named by `key_arg`.
    pub fn run(&self, key_arg: &str, ssh_command: &str) -> Result<(), Failure> {
        self.stages(key_arg, ssh_command)
            .map_err(|failure| self.terminate(failure))?;
        self.enter(Stage::Terminated);
        Ok(())
    }

    fn stages(&self, key_arg: &str, ssh_command: &str) -> Result<(), Failure> {
        self.enter(Stage::Parsing);
        let command = parse_ssh_command(ssh_command)
            .map_err(|e| Failure::new(Stage::Parsing, e.client_message(), &e))?;
        let verb: GitVerb = command
            .git_verb()
            .map_err(|e| Failure::new(Stage::Parsing, e.client_message(), &e))?;
        let required = verb.required_mode();

        self.enter(Stage::Authenticating);
        let authenticator = KeyAuthenticator::new(self.store, self.auth);
        let key = authenticator
            .load_key(key_arg)
            .map_err(|e| Failure::auth(Stage::Authenticating, &e))?;

        self.enter(Stage::Authorizing);
        let repo = self
            .store
            .get_repository_by_owner_and_name(&command.owner, &command.name)
            .map_err(|e| Failure::auth(Stage::Authorizing, &e))?
            .ok_or_else(|| {
                Failure::new(
                    Stage::Authorizing,
                    ACCESS_DENIED_MESSAGE,
                    format!("repository '{}' does not exist", command.full_name()),
                )
            })?;
        let principal = authenticator
            .authorize(key, &repo, required)
            .map_err(|e| Failure::auth(Stage::Authorizing, &e))?;

        if verb.is_write() && repo.is_mirror {
            return Err(Failure::new(
                Stage::Authorizing,
                "Mirror repository is read-only",
                format!("write to mirror repository '{}'", repo.full_name()),
            ));
        }

        self.enter(Stage::Dispatching);
        let env = if verb.is_write() {
            let owner = self
                .store
                .get_account(repo.owner_id)
                .map_err(|e| Failure::auth(Stage::Dispatching, &e))?
                .ok_or_else(|| {
                    Failure::new(
                        Stage::Dispatching,
                        "Internal error",
                        format!("owner {} of '{}' does not exist", repo.owner_id, repo.full_name()),
                    )
                })?;
            let repo_path = repo.storage_path(&self.dispatch.repository_root, command.is_wiki);
            HookContext::for_push(
                principal.account.as_ref(),
                &owner,
                &repo,
                repo_path,
                command.is_wiki,
            )
            .to_env()
        } else {
            Vec::new()
        };

        let request = DispatchRequest {
            verb,
            repo_path: command.repo_path(),
            cwd: self.dispatch.repository_root.clone(),
            env,
        };
        tracing::info!(
            key_id = principal.key.id,
            fingerprint = %principal.key.fingerprint,
            account = principal.account.as_ref().map(|a| a.name.as_str()),
            repo = %repo.full_name(),
            %verb,
            mode = %principal.mode,
            "Dispatching"
        );
        self.dispatcher
            .dispatch(&request)
            .map_err(|e| Failure::new(Stage::Dispatching, e.client_message(), &e))
    }
}

/// Write the client message (and, outside prod, the detail) to `out` and log
/// the failure. Returns the exit code.
pub fn fail<W: Write + ?Sized>(
    out: &mut W,
    config: &Config,
    client_message: &str,
    detail: &str,
) -> i32 {
    tracing::error!(detail, "{client_message}");
    let _ = writeln!(out, "{}: {}", config.app_name, client_message);
    if !config.is_prod() && !detail.is_empty() && detail != client_message {
        let _ = writeln!(out, "{detail}");
    }
    1
}

/// Message for connections that end before any git command runs: SSH is
/// disabled, or the client asked for a shell. Both go to stdout.
pub fn session_notice(config: &Config, ssh_command: &str) -> Option<String> {
    if config.ssh.disabled {
        return Some(format!("{}: SSH has been disabled", config.app_name));
    }
    if ssh_command.trim().is_empty() {
        return Some(format!(
            "Hi there, you've successfully authenticated, but {} does not provide shell access.",
            config.app_name
        ));
    }
    None
}

/// Entry point of `gitward serv`. Returns the process exit code.
pub fn run(config: &Config, key_arg: &str) -> i32 {
    let mut stderr = io::stderr();

    let ssh_command = std::env::var(SSH_COMMAND_ENV).unwrap_or_default();
    if let Some(notice) = session_notice(config, &ssh_command) {
        println!("{notice}");
        return 0;
    }

    let _guard = match logging::init_file_logging(config, "serv") {
        Ok(guard) => guard,
        Err(e) => return fail(&mut stderr, config, "Internal error", &format!("{e:#}")),
    };

    let store = match MemoryStore::open(&config.store.path) {
        Ok(store) => store,
        Err(e) => return fail(&mut stderr, config, e.client_message(), &e.to_string()),
    };
    let options = config.dispatch_options();
    let dispatcher = ProcessDispatcher::new(&options.git_binary);
    let gateway = Gateway::new(&store, &dispatcher, config.auth_options(), options);

    match gateway.run(key_arg, &ssh_command) {
        Ok(()) => 0,
        Err(failure) => fail(&mut stderr, config, &failure.client_message, &failure.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;

    #[test]
    fn test_session_notice() {
        let mut config = Config::default();
        assert_eq!(
            session_notice(&config, "  ").as_deref(),
            Some("Hi there, you've successfully authenticated, but gitward does not provide shell access.")
        );
        assert_eq!(session_notice(&config, "git-upload-pack 'acme/widgets.git'"), None);

        config.ssh.disabled = true;
        assert_eq!(
            session_notice(&config, "git-upload-pack 'acme/widgets.git'").as_deref(),
            Some("gitward: SSH has been disabled")
        );
        assert_eq!(
            session_notice(&config, "").as_deref(),
            Some("gitward: SSH has been disabled")
        );
    }

    #[test]
    fn test_fail_hides_detail_in_prod() {
        let mut config = Config::default();
        let mut out = Vec::new();
        assert_eq!(fail(&mut out, &config, "Internal error", "db is down"), 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "gitward: Internal error\ndb is down\n"
        );

        config.run_mode = RunMode::Prod;
        let mut out = Vec::new();
        fail(&mut out, &config, "Internal error", "db is down");
        assert_eq!(String::from_utf8(out).unwrap(), "gitward: Internal error\n");
    }

    #[test]
    fn test_failure_display_names_stage() {
        let failure = Failure::new(Stage::Parsing, "Unknown git command", "unknown git command 'ls'");
        assert_eq!(failure.to_string(), "parsing failed: unknown git command 'ls'");
    }
}
