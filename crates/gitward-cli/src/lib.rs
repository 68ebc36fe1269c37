//! Library half of the `gitward` binary.
//!
//! - [`config`]: layered configuration
//! - [`logging`]: per-entry-point file logging
//! - [`serv`]: the SSH command gateway
//! - [`hook`]: the git hook entry points

pub mod config;
pub mod hook;
pub mod logging;
pub mod serv;

pub use config::{Config, ConfigLoader, DispatchOptions, HookOptions, RunMode};
pub use hook::HookKind;
pub use serv::{Failure, Gateway, Stage};
