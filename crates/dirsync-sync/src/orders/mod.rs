//! Approval order processing.

pub mod form;
pub mod handlers;
pub mod ledger;
pub mod state_machine;
pub mod types;

pub use form::{parse_order_detail, Form, FormValue, OrderDetail};
pub use handlers::OrderServices;
pub use ledger::{LedgerEntry, OrderLedger, PgOrderLedger};
pub use state_machine::OrderProcessor;
pub use types::{Applicant, OrderOutcome, OrderType};
