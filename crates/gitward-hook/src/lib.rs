//! Git hook processing for gitward.
//!
//! Git runs `pre-receive`, `update` and `post-receive` during every push the
//! gateway dispatches. This crate implements what those hooks do:
//! - **Context**: decode who is pushing where from the `GITWARD_*` environment
//! - **Processor**: enforce branch protection, record push events, run custom hooks
//! - **Trigger**: notify the web application so it can deliver webhooks
//!
//! A hook invoked without a context (for example by a local push on the
//! server) does nothing.

mod context;
mod error;
mod processor;
mod trigger;

pub use context::{
    HookContext, ENV_AUTH_USER_ID, ENV_AUTH_USER_NAME, ENV_REPO_ID, ENV_REPO_IS_WIKI,
    ENV_REPO_NAME, ENV_REPO_OWNER_ID, ENV_REPO_OWNER_NAME, ENV_REPO_OWNER_SECRET, ENV_REPO_PATH,
};
pub use error::{HookError, Result};
pub use processor::HookProcessor;
pub use trigger::{Notifier, TaskTrigger};
