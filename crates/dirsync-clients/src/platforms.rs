//! Downstream platform provisioning client.

use async_trait::async_trait;
use tracing::{info, instrument};

use dirsync_sync::orders::Applicant;
use dirsync_sync::platforms::{PlatformProvisioner, PlatformSpec};
use dirsync_sync::SyncResult;

use crate::config::ServiceConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::ServiceClient;

const SERVICE: &str = "platforms";

/// Creates accounts through `POST {base_url}/platforms/{name}/accounts`.
///
/// A `409 Conflict` means the account already exists and counts as done.
#[derive(Debug, Clone)]
pub struct HttpPlatformProvisioner {
    client: ServiceClient,
}

impl HttpPlatformProvisioner {
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

fn platform_path(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("platforms/{slug}/accounts")
}

#[async_trait]
impl PlatformProvisioner for HttpPlatformProvisioner {
    #[instrument(skip(self, applicant), fields(platform = %platform.name, employee_id = %applicant.employee_id))]
    async fn provision(&self, platform: &PlatformSpec, applicant: &Applicant) -> SyncResult<()> {
        match self
            .client
            .post_unit(&platform_path(&platform.name), applicant)
            .await
        {
            Ok(()) => {
                info!("Platform account created");
                Ok(())
            }
            Err(ClientError::Status { status: 409, .. }) => {
                info!("Platform account already exists");
                Ok(())
            }
            Err(e) => Err(e.into_sync(SERVICE)),
        }
    }
}
