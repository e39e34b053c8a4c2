//! drs-reconcile
//!
//! Reconciliation of payroll rows against the fleet driver directory.
//!
//! Per row, keyed by the identity key:
//! - lookup miss on a hire -> allocate a username, create the driver (CREATED)
//! - hit, no update intent -> ALREADY_EXISTS, no write
//! - hit with update intent -> UPDATED (active) or REACTIVATED (deactivated)
//! - termination of an active driver -> DEACTIVATED; already inactive ->
//!   ALREADY_DEACTIVATED; key miss -> display-name fallback, else NOT_FOUND
//!
//! Rows are processed sequentially. Any error is confined to its row and
//! recorded as FAILED; the run reports failure only through its counts.

mod engine;
mod hire;
pub mod migrate;
mod termination;
mod types;

pub use engine::{EmployeeCheck, EngineSettings, HireOptions, ReconcileEngine, TerminationOptions};
pub use termination::find_driver_by_name;
pub use types::*;
