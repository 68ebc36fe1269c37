//! The three hook entry points git calls during a push.

use crate::context::HookContext;
use crate::error::{HookError, Result};
use crate::trigger::Notifier;
use gitward_auth::{BranchGuard, HookStore, Verdict};
use gitward_git::{CustomHook, GitEngine, HookStdin};
use gitward_types::{unix_now, PushEvent, RefUpdate};
use std::io::Read;

const PRE_RECEIVE: &str = "pre-receive";
const UPDATE: &str = "update";
const POST_RECEIVE: &str = "post-receive";

/// Processes hook invocations for one push.
pub struct HookProcessor<'a, S: ?Sized, G: ?Sized, N: ?Sized> {
    ctx: &'a HookContext,
    store: &'a S,
    git: &'a G,
    notifier: &'a N,
}

impl<'a, S, G, N> HookProcessor<'a, S, G, N>
where
    S: HookStore + ?Sized,
    G: GitEngine + ?Sized,
    N: Notifier + ?Sized,
{
    /// Create a processor for the push described by `ctx`.
    pub fn new(ctx: &'a HookContext, store: &'a S, git: &'a G, notifier: &'a N) -> Self {
        Self {
            ctx,
            store,
            git,
            notifier,
        }
    }

    /// Decide whether the whole batch of ref updates may be accepted.
    ///
    /// Stdin is read to the end first so it can be replayed to a custom
    /// `pre-receive` script, which runs only after every update passed.
    pub fn pre_receive<R: Read + ?Sized>(&self, input: &mut R) -> Result<()> {
        let stdin = read_all(input)?;

        if !self.ctx.is_wiki {
            let updates = parse_updates(&stdin);
            let guard = BranchGuard::new(
                self.store,
                self.git,
                self.ctx.repo_id,
                self.ctx.repo_path(),
            );
            if let Verdict::Deny(reason) = guard.check_all(&updates, self.ctx.pusher_id)? {
                return Err(HookError::Denied(reason));
            }
            tracing::debug!(
                repo = %self.ctx.repo_full_name(),
                refs = updates.len(),
                "Ref updates accepted"
            );
        }

        self.run_custom(PRE_RECEIVE, &[], HookStdin::Buffered(&stdin))
    }

    /// Per-ref hook: git passes `<ref> <old> <new>`.
    pub fn update(&self, args: &[String]) -> Result<()> {
        match args {
            [ref_name, _, _] if ref_name.is_empty() => Err(HookError::InvalidArguments(
                "First argument 'refName' is empty".to_string(),
            )),
            [_, _, _] => self.run_custom(UPDATE, args, HookStdin::Inherit),
            _ => Err(HookError::InvalidArguments(
                "Arguments received are not equal to three".to_string(),
            )),
        }
    }

    /// Record and announce the refs that were just written.
    ///
    /// Event persistence and notification are best effort; only a failing
    /// custom `post-receive` script fails the hook.
    pub fn post_receive<R: Read + ?Sized>(&self, input: &mut R) -> Result<()> {
        let stdin = read_all(input)?;

        if !self.ctx.is_wiki {
            for update in parse_updates(&stdin) {
                let event = self.push_event(update);
                if let Err(e) = self.store.create_push_event(&event) {
                    tracing::error!(error = %e, ref_name = %event.ref_name, "Failed to record push event");
                }
                self.notifier.notify(&event, self.ctx);
            }
        }

        self.run_custom(POST_RECEIVE, &[], HookStdin::Buffered(&stdin))
    }

    fn push_event(&self, update: RefUpdate) -> PushEvent {
        PushEvent {
            old_commit_id: update.old_commit_id,
            new_commit_id: update.new_commit_id,
            ref_name: update.ref_name,
            pusher_id: self.ctx.pusher_id,
            pusher_name: self.ctx.pusher_name.clone(),
            repo_id: self.ctx.repo_id,
            repo_owner_name: self.ctx.repo_owner_name.clone(),
            repo_name: self.ctx.repo_name.clone(),
            created_at: unix_now(),
        }
    }

    fn run_custom(&self, name: &str, args: &[String], stdin: HookStdin<'_>) -> Result<()> {
        let Some(hook) = CustomHook::find(&self.ctx.custom_hooks_dir(), name) else {
            return Ok(());
        };
        tracing::debug!(hook = name, path = %hook.path().display(), "Running custom hook");
        hook.run(self.ctx.repo_path(), args, stdin)?;
        Ok(())
    }
}

fn read_all<R: Read + ?Sized>(input: &mut R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Lines that do not have exactly three fields are skipped.
fn parse_updates(stdin: &[u8]) -> Vec<RefUpdate> {
    String::from_utf8_lossy(stdin)
        .lines()
        .filter_map(RefUpdate::parse_line)
        .collect()
}
