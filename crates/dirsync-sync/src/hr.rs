//! HR feed collaborator.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::model::HrRecord;

/// Source of the authoritative employee snapshot.
#[async_trait]
pub trait HrSource: Send + Sync {
    /// Fetch the full current snapshot. Records that fail to decode are
    /// dropped by the implementation, not the whole batch.
    async fn fetch_snapshot(&self) -> SyncResult<Vec<HrRecord>>;
}
