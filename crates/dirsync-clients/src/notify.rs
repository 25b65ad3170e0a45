//! Notification gateway client.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use dirsync_sync::notify::Notifier;
use dirsync_sync::SyncResult;

use crate::config::ServiceConfig;
use crate::error::ClientResult;
use crate::http::ServiceClient;

const SERVICE: &str = "notify";

#[derive(Serialize)]
struct MarkdownRequest<'a> {
    recipient: &'a str,
    template: &'a str,
    args: Value,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

/// Posts chat messages to `{base_url}/messages/markdown` and mail to
/// `{base_url}/messages/email`.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: ServiceClient,
}

impl HttpNotifier {
    pub fn new(config: &ServiceConfig) -> ClientResult<Self> {
        Ok(Self {
            client: ServiceClient::new(config)?,
        })
    }

    #[must_use]
    pub fn with_client(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip(self, args))]
    async fn send_markdown(&self, recipient: &str, template: &str, args: Value) -> SyncResult<()> {
        let request = MarkdownRequest {
            recipient,
            template,
            args,
        };
        self.client
            .post_unit("messages/markdown", &request)
            .await
            .map_err(|e| e.into_sync(SERVICE))?;
        debug!(recipient, template, "Markdown message sent");
        Ok(())
    }

    #[instrument(skip(self, html))]
    async fn send_email(&self, addresses: &[String], subject: &str, html: &str) -> SyncResult<()> {
        let request = EmailRequest {
            to: addresses,
            subject,
            html,
        };
        self.client
            .post_unit("messages/email", &request)
            .await
            .map_err(|e| e.into_sync(SERVICE))?;
        debug!(count = addresses.len(), "Email sent");
        Ok(())
    }
}
