//! Post-receive notification of the web application.

use crate::context::HookContext;
use crate::error::{HookError, Result};
use gitward_types::PushEvent;
use reqwest::blocking::Client;
use reqwest::Url;
use std::time::Duration;

/// Tells the outside world about an accepted push.
///
/// Notification is best effort: implementations log failures and never
/// report them to the caller.
pub trait Notifier {
    /// Announce one pushed ref.
    fn notify(&self, event: &PushEvent, ctx: &HookContext);
}

/// Calls the application's `tasks/trigger` endpoint so it can deliver
/// webhooks and re-check pull requests.
#[derive(Debug, Clone)]
pub struct TaskTrigger {
    client: Client,
    local_root_url: String,
}

impl TaskTrigger {
    /// Create a trigger for the application at `local_root_url`.
    ///
    /// Certificate verification is disabled: the endpoint is the
    /// application's own, often on a self-signed local address.
    pub fn new(local_root_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;

        let mut local_root_url = local_root_url.into();
        if !local_root_url.ends_with('/') {
            local_root_url.push('/');
        }

        Ok(Self {
            client,
            local_root_url,
        })
    }

    /// URL of the trigger endpoint for one pushed branch.
    pub fn trigger_url(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        secret: &str,
        pusher: Option<u64>,
    ) -> Result<Url> {
        let pusher = pusher.map(|id| id.to_string()).unwrap_or_default();
        let base = format!("{}{}/{}/tasks/trigger", self.local_root_url, owner, repo);
        Url::parse_with_params(
            &base,
            [
                ("branch", branch),
                ("secret", secret),
                ("pusher", pusher.as_str()),
            ],
        )
        .map_err(|e| HookError::Context(format!("invalid trigger URL '{base}': {e}")))
    }

    /// Fire the trigger and wait for it to finish or time out.
    ///
    /// Returns whether the application accepted the request.
    pub fn fire(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        secret: &str,
        pusher: Option<u64>,
    ) -> bool {
        let url = match self.trigger_url(owner, repo, branch, secret, pusher) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build task trigger URL");
                return false;
            }
        };
        tracing::trace!(owner, repo, branch, "Triggering tasks");

        match self.client.get(url).send() {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::error!(
                    status = response.status().as_u16(),
                    "Failed to trigger task: unsuccessful response code"
                );
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to trigger task");
                false
            }
        }
    }
}

impl Notifier for TaskTrigger {
    fn notify(&self, event: &PushEvent, ctx: &HookContext) {
        self.fire(
            &event.repo_owner_name,
            &event.repo_name,
            event.short_ref(),
            &ctx.repo_owner_secret,
            event.pusher_id,
        );
    }
}
