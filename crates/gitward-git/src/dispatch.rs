//! Handing the connection over to the real git service.

use crate::command::GitVerb;
use crate::error::GitError;
use crate::Result;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Everything needed to run one git service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Service to run.
    pub verb: GitVerb,
    /// Normalized repository path, relative to `cwd`.
    pub repo_path: String,
    /// Repository storage root.
    pub cwd: PathBuf,
    /// Extra environment for the child (and the hooks git will run).
    pub env: Vec<(String, String)>,
}

/// Runs git services.
pub trait Dispatcher {
    /// Run the service to completion with stdio wired through.
    fn dispatch(&self, request: &DispatchRequest) -> Result<()>;
}

/// [`Dispatcher`] that spawns `<git> <subcommand> <path>`.
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    binary: PathBuf,
}

impl ProcessDispatcher {
    /// Create a dispatcher for the given git binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Dispatcher for ProcessDispatcher {
    fn dispatch(&self, request: &DispatchRequest) -> Result<()> {
        let program = self.binary.display().to_string();
        tracing::debug!(
            program = %program,
            verb = %request.verb,
            path = %request.repo_path,
            cwd = %request.cwd.display(),
            "Dispatching git service"
        );

        let status = Command::new(&self.binary)
            .arg(request.verb.subcommand())
            .arg(&request.repo_path)
            .current_dir(&request.cwd)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| GitError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(GitError::Exit { program, status });
        }
        Ok(())
    }
}
