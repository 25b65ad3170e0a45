//! Department change audit records.
//!
//! Append-only; read back by time range to build the daily digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// How far an employee moved in the organization tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLevel {
    /// Between two sub-departments of the same top-level department.
    Structural,
    /// Deepest department changed.
    Department,
    /// Crossed between the internal tree and the external partner subtree.
    Company,
}

impl fmt::Display for ChangeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => write!(f, "structural"),
            Self::Department => write!(f, "department"),
            Self::Company => write!(f, "company"),
        }
    }
}

impl std::str::FromStr for ChangeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structural" => Ok(Self::Structural),
            "department" => Ok(Self::Department),
            "company" => Ok(Self::Company),
            _ => Err(format!("Unknown change level: {}", s)),
        }
    }
}

/// A stored department transition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DepartmentChangeRecord {
    pub id: Uuid,
    pub employee_name: String,
    pub employee_id: String,
    pub old_department: String,
    pub new_department: String,
    pub change_level: String,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDepartmentChange {
    pub employee_name: String,
    pub employee_id: String,
    pub old_department: String,
    pub new_department: String,
    pub change_level: ChangeLevel,
}

impl DepartmentChangeRecord {
    /// Get the level enum. Unparseable stored values read as structural.
    pub fn level(&self) -> ChangeLevel {
        self.change_level.parse().unwrap_or(ChangeLevel::Structural)
    }

    /// Append a record.
    pub async fn create(pool: &PgPool, input: &CreateDepartmentChange) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO department_change_records (
                employee_name, employee_id, old_department, new_department, change_level
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&input.employee_name)
        .bind(&input.employee_id)
        .bind(&input.old_department)
        .bind(&input.new_department)
        .bind(input.change_level.to_string())
        .fetch_one(pool)
        .await
    }

    /// Records created in `[from, to)`, oldest first.
    pub async fn list_between(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM department_change_records
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}
