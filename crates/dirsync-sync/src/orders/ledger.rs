//! Order idempotency ledger.

use async_trait::async_trait;

use dirsync_db::{DbError, DbPool, OrderExecutionRecord};

use crate::error::SyncResult;

/// Stored state of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub order_id: String,
    pub status: bool,
    pub message: String,
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn find(&self, order_id: &str) -> SyncResult<Option<LedgerEntry>>;

    /// Record one attempt. Inserts on first attempt and updates a failed row
    /// on retry, atomically. Returns `false` when the row had already
    /// succeeded and was left untouched.
    async fn record_outcome(
        &self,
        order_id: &str,
        order_type: &str,
        success: bool,
        message: &str,
    ) -> SyncResult<bool>;
}

/// PostgreSQL-backed ledger.
#[derive(Clone)]
pub struct PgOrderLedger {
    pool: DbPool,
}

impl PgOrderLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<OrderExecutionRecord> for LedgerEntry {
    fn from(record: OrderExecutionRecord) -> Self {
        Self {
            order_id: record.order_id,
            status: record.execute_status,
            message: record.execute_message,
        }
    }
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    async fn find(&self, order_id: &str) -> SyncResult<Option<LedgerEntry>> {
        let record = OrderExecutionRecord::find_by_order_id(self.pool.inner(), order_id)
            .await
            .map_err(DbError::from)?;
        Ok(record.map(LedgerEntry::from))
    }

    async fn record_outcome(
        &self,
        order_id: &str,
        order_type: &str,
        success: bool,
        message: &str,
    ) -> SyncResult<bool> {
        let row = OrderExecutionRecord::record_outcome(
            self.pool.inner(),
            order_id,
            order_type,
            success,
            message,
        )
        .await
        .map_err(DbError::from)?;
        Ok(row.is_some())
    }
}
