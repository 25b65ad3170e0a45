//! Scheduled passes: HR reconciliation with its digest, and the expiry sweep.

pub mod calendar;
pub mod digest;
pub mod engine;
pub mod expiry_sweep;

pub use calendar::{HolidayPeriod, WorkCalendar};
pub use digest::DigestOutcome;
pub use engine::{ReconcileReport, ReconcileRun, Reconciler};
pub use expiry_sweep::{ExpirySweep, ExpirySweepReport};
