//! drs-identity
//!
//! Deterministic identity derivation for payroll employees.
//!
//! - The identity key (`First-Last_MM-DD-YYYY`) is the idempotency token stored
//!   under the external-id namespace of every driver this system creates.
//! - The base username (first initial + last name) is the seed handed to the
//!   username registry for collision-free allocation.
//!
//! Pure logic. No IO.

mod dates;
mod key;

pub use dates::{format_mdy, hire_date_from_notes, parse_date};
pub use key::{derive_base_username, derive_key, IdentityKey};

use std::fmt;

/// Validation failures raised while deriving identity values from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A name fragment was empty once non-alphanumeric characters were removed.
    EmptyName { field: &'static str, raw: String },
    /// A date string matched none of the accepted layouts.
    InvalidDate { raw: String },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::EmptyName { field, raw } => {
                write!(f, "{field} name '{raw}' has no alphanumeric characters")
            }
            KeyError::InvalidDate { raw } => write!(
                f,
                "invalid date '{raw}'. expected MM-DD-YYYY, M/D/YYYY or YYYY-MM-DD"
            ),
        }
    }
}

impl std::error::Error for KeyError {}
