//! Downstream platform accounts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::orders::types::Applicant;

/// A platform accounts can be requested on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub name: String,
    /// The platform authenticates against the directory, so requesting it
    /// implies a directory account.
    #[serde(default)]
    pub requires_directory: bool,
}

/// Creates accounts on downstream platforms.
#[async_trait]
pub trait PlatformProvisioner: Send + Sync {
    async fn provision(&self, platform: &PlatformSpec, applicant: &Applicant) -> SyncResult<()>;
}
