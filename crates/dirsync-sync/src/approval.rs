//! Approval workflow collaborator.

use async_trait::async_trait;

use crate::error::SyncResult;

#[async_trait]
pub trait ApprovalClient: Send + Sync {
    /// Raw order detail payload, parsed by [`crate::orders::form`].
    async fn get_order_detail(&self, order_id: &str) -> SyncResult<serde_json::Value>;
}
