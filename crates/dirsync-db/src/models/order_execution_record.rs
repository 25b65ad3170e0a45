//! Order execution ledger.
//!
//! At most one row per order id. A row whose `execute_status` is true is
//! terminal and is never overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderExecutionRecord {
    pub order_id: String,
    pub order_type: String,
    pub execute_status: bool,
    pub execute_message: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderExecutionRecord {
    /// Find the row for an order id.
    pub async fn find_by_order_id(
        pool: &PgPool,
        order_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM order_execution_records
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(pool)
        .await
    }

    /// Record the outcome of one attempt as a single conditional upsert.
    ///
    /// Inserts on first attempt; otherwise updates the row only while it is
    /// still failed. Returns `None` when the row had already succeeded.
    pub async fn record_outcome(
        pool: &PgPool,
        order_id: &str,
        order_type: &str,
        success: bool,
        message: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO order_execution_records (
                order_id, order_type, execute_status, execute_message
            )
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id) DO UPDATE
            SET execute_status = EXCLUDED.execute_status,
                execute_message = EXCLUDED.execute_message,
                order_type = CASE
                    WHEN EXCLUDED.order_type = '' THEN order_execution_records.order_type
                    ELSE EXCLUDED.order_type
                END,
                attempts = order_execution_records.attempts + 1,
                updated_at = NOW()
            WHERE order_execution_records.execute_status = FALSE
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(order_type)
        .bind(success)
        .bind(message)
        .fetch_optional(pool)
        .await
    }
}
