//! Database models.

pub mod department_change_record;
pub mod order_execution_record;

pub use department_change_record::{ChangeLevel, CreateDepartmentChange, DepartmentChangeRecord};
pub use order_execution_record::OrderExecutionRecord;
