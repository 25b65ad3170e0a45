//! Department change audit log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dirsync_db::{CreateDepartmentChange, DbError, DbPool, DepartmentChangeRecord};

use crate::error::SyncResult;

/// Append-only store of department transitions.
#[async_trait]
pub trait DepartmentAudit: Send + Sync {
    async fn append(&self, change: CreateDepartmentChange) -> SyncResult<()>;

    /// Records created in `[from, to)`, oldest first.
    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SyncResult<Vec<DepartmentChangeRecord>>;
}

/// PostgreSQL-backed audit log.
#[derive(Clone)]
pub struct PgDepartmentAudit {
    pool: DbPool,
}

impl PgDepartmentAudit {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepartmentAudit for PgDepartmentAudit {
    async fn append(&self, change: CreateDepartmentChange) -> SyncResult<()> {
        DepartmentChangeRecord::create(self.pool.inner(), &change)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SyncResult<Vec<DepartmentChangeRecord>> {
        let records = DepartmentChangeRecord::list_between(self.pool.inner(), from, to)
            .await
            .map_err(DbError::from)?;
        Ok(records)
    }
}
