//! Entry points of `gitward hook <name>`, installed as the repositories'
//! server-side hooks.

use crate::config::Config;
use crate::logging;
use crate::serv::fail;
use gitward_auth::{HookStore, MemoryStore};
use gitward_git::{CommandEngine, GitEngine};
use gitward_hook::{HookContext, HookError, HookProcessor, Notifier, TaskTrigger};
use std::io::{self, Read};

/// Which git hook is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookKind {
    /// Before any ref is updated; can reject the whole push.
    PreReceive,
    /// Once per ref, with `<ref> <old> <new>`.
    Update(Vec<String>),
    /// After the refs were written.
    PostReceive,
}

impl HookKind {
    /// Name of the hook (and of its log file).
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreReceive => "pre-receive",
            Self::Update(_) => "update",
            Self::PostReceive => "post-receive",
        }
    }
}

/// Run one hook against `input` (git's stdin for the hook).
pub fn process<S, G, N, R>(
    processor: &HookProcessor<'_, S, G, N>,
    kind: &HookKind,
    input: &mut R,
) -> Result<(), HookError>
where
    S: HookStore + ?Sized,
    G: GitEngine + ?Sized,
    N: Notifier + ?Sized,
    R: Read + ?Sized,
{
    match kind {
        HookKind::PreReceive => processor.pre_receive(input),
        HookKind::Update(args) => processor.update(args),
        HookKind::PostReceive => processor.post_receive(input),
    }
}

/// Entry point of `gitward hook`. Returns the process exit code.
///
/// Pushes that did not come through the gateway carry no hook context and
/// are left alone.
pub fn run(config: &Config, kind: &HookKind) -> i32 {
    let mut stderr = io::stderr();

    let ctx = match HookContext::from_process_env() {
        Ok(Some(ctx)) => Ok(ctx),
        Ok(None) => return 0,
        Err(e) => Err(e),
    };

    let _guard = match logging::init_file_logging(config, kind.name()) {
        Ok(guard) => guard,
        Err(e) => return fail(&mut stderr, config, "Internal error", &format!("{e:#}")),
    };

    let ctx = match ctx {
        Ok(ctx) => ctx,
        Err(e) => return fail(&mut stderr, config, &e.client_message(), &e.to_string()),
    };

    let store = match MemoryStore::open(&config.store.path) {
        Ok(store) => store,
        Err(e) => return fail(&mut stderr, config, e.client_message(), &e.to_string()),
    };
    let options = config.hook_options();
    let git = CommandEngine::new(&options.git_binary);
    let trigger = match TaskTrigger::new(&options.local_root_url, options.trigger_timeout) {
        Ok(trigger) => trigger,
        Err(e) => return fail(&mut stderr, config, &e.client_message(), &e.to_string()),
    };

    tracing::debug!(hook = kind.name(), repo = %ctx.repo_full_name(), "Running hook");
    let processor = HookProcessor::new(&ctx, &store, &git, &trigger);
    match process(&processor, kind, &mut io::stdin().lock()) {
        Ok(()) => 0,
        Err(e) => fail(&mut stderr, config, &e.client_message(), &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_names() {
        assert_eq!(HookKind::PreReceive.name(), "pre-receive");
        assert_eq!(HookKind::Update(Vec::new()).name(), "update");
        assert_eq!(HookKind::PostReceive.name(), "post-receive");
    }
}
