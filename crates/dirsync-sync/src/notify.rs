//! Notification collaborator.
//!
//! Delivery is fire-and-forget: callers log failures and move on.

use async_trait::async_trait;
use tracing::warn;

use crate::error::SyncResult;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a templated chat message.
    async fn send_markdown(
        &self,
        recipient: &str,
        template: &str,
        args: serde_json::Value,
    ) -> SyncResult<()>;

    /// Send an HTML email.
    async fn send_email(&self, addresses: &[String], subject: &str, html: &str) -> SyncResult<()>;
}

/// Send a markdown message, logging instead of returning a failure.
pub async fn notify_markdown(
    notifier: &dyn Notifier,
    recipient: &str,
    template: &str,
    args: serde_json::Value,
) -> bool {
    if recipient.trim().is_empty() {
        warn!(template, "Notification skipped, no recipient");
        return false;
    }
    match notifier.send_markdown(recipient, template, args).await {
        Ok(()) => true,
        Err(e) => {
            warn!(recipient, template, error = %e, "Failed to send notification");
            false
        }
    }
}
