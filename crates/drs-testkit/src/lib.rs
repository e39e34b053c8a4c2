//! drs-testkit
//!
//! Test doubles for the directory seam:
//! - [`FakeDirectory`]: in-memory [`DriverDirectory`] with a call log and
//!   one-shot failure injection, for engine scenarios.
//! - [`ScriptedTransport`]: a [`Transport`] that replays queued responses and
//!   records every request, for retry and pagination sequencing.

mod fake_directory;
mod scripted;

pub use fake_directory::{driver, DirectoryCall, FakeDirectory, FakeOp};
pub use scripted::ScriptedTransport;

use drs_directory::DirectoryError;

/// Shorthand for an HTTP error the directory would surface.
pub fn http_error(status: u16, method: &'static str, path: &str) -> DirectoryError {
    DirectoryError::Http {
        status,
        method,
        path: path.to_string(),
        body: String::new(),
    }
}
