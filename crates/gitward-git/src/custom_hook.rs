//! Site-supplied hook scripts.
//!
//! A repository may carry executable scripts under `custom_hooks/`. They run
//! only after the built-in checks pass, with the same stdin git gave us.

use crate::error::GitError;
use crate::Result;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Where a custom hook reads its stdin from.
#[derive(Debug, Clone, Copy)]
pub enum HookStdin<'a> {
    /// Replay bytes already read from our own stdin.
    Buffered(&'a [u8]),
    /// Share our stdin with the script.
    Inherit,
}

/// An executable hook script found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHook {
    name: String,
    path: PathBuf,
}

impl CustomHook {
    /// Look up `<hooks_dir>/<name>`; `None` unless it is a regular file.
    pub fn find(hooks_dir: &Path, name: &str) -> Option<Self> {
        let path = hooks_dir.join(name);
        path.is_file().then(|| Self {
            name: name.to_string(),
            path,
        })
    }

    /// Hook name (e.g. `pre-receive`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Script path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the script in `cwd`. Stdout and stderr go straight to the client.
    pub fn run(&self, cwd: &Path, args: &[String], stdin: HookStdin<'_>) -> Result<()> {
        let program = self.path.display().to_string();
        tracing::debug!(hook = %self.name, path = %program, "Running custom hook");

        let mut command = Command::new(&self.path);
        command
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        match stdin {
            HookStdin::Buffered(_) => command.stdin(Stdio::piped()),
            HookStdin::Inherit => command.stdin(Stdio::inherit()),
        };

        let mut child = command.spawn().map_err(|source| GitError::Spawn {
            program: program.clone(),
            source,
        })?;

        if let (HookStdin::Buffered(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // A script that exits without reading its input closes the pipe early.
            match pipe.write_all(input) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GitError::Io(e));
                }
                _ => {}
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(GitError::Exit { program, status });
        }
        Ok(())
    }
}
