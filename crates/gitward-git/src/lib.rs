//! Git plumbing for gitward.
//!
//! This crate owns everything that touches the git binary or the raw SSH
//! command line:
//! - **Command parsing**: split `SSH_ORIGINAL_COMMAND` into a verb and a normalized path
//! - **Engine**: range-difference queries used by the force-push guard
//! - **Dispatch**: spawn the real git service with inherited stdio
//! - **Custom hooks**: run site-supplied hook scripts after the built-in checks

mod command;
mod custom_hook;
mod dispatch;
mod engine;
mod error;

pub use command::{parse_ssh_command, GitVerb, SshCommand};
pub use custom_hook::{CustomHook, HookStdin};
pub use dispatch::{DispatchRequest, Dispatcher, ProcessDispatcher};
pub use engine::{CommandEngine, GitEngine};
pub use error::GitError;

/// Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;
