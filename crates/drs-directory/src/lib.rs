//! drs-directory
//!
//! Remote fleet driver directory: wire types, a transport seam, retry with
//! exponential backoff, cursor pagination and external-id addressing.
//!
//! Callers depend on the [`DriverDirectory`] trait. [`FleetDirectory`] is the
//! HTTP implementation; tests use an in-memory fake.

use std::collections::BTreeMap;

mod client;
mod error;
mod external_ids;
mod retry;
mod transport;
mod types;

pub use client::FleetDirectory;
pub use error::DirectoryError;
pub use external_ids::normalize_external_ids;
pub use retry::RetryPolicy;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::{ActivationStatus, DriverPatch, DriverRecord, NewDriver, PatchOutcome};

// ---------------------------------------------------------------------------
// Directory contract
// ---------------------------------------------------------------------------

/// Engine-facing directory operations.
///
/// "Not found" on external-id addressing is a value (`None`,
/// [`PatchOutcome::NotFound`]), never an error. Everything else that fails
/// surfaces as [`DirectoryError`] after the implementation's retry policy.
pub trait DriverDirectory {
    /// Every driver with the given status, across all pages.
    fn list_by_status(&self, status: ActivationStatus) -> Result<Vec<DriverRecord>, DirectoryError>;

    /// Active drivers, followed by deactivated ones when requested.
    fn list_all(&self, include_deactivated: bool) -> Result<Vec<DriverRecord>, DirectoryError> {
        let mut out = self.list_by_status(ActivationStatus::Active)?;
        if include_deactivated {
            out.extend(self.list_by_status(ActivationStatus::Deactivated)?);
        }
        Ok(out)
    }

    /// Username -> status for every driver that has a username. A username
    /// present under both statuses reports the later (deactivated) listing.
    fn usernames_by_status(
        &self,
        include_deactivated: bool,
    ) -> Result<BTreeMap<String, ActivationStatus>, DirectoryError> {
        let mut out = BTreeMap::new();
        for d in self.list_all(include_deactivated)? {
            if let Some(u) = d.username.as_deref().filter(|u| !u.trim().is_empty()) {
                out.insert(u.to_string(), d.status);
            }
        }
        Ok(out)
    }

    fn find_by_external_id(
        &self,
        namespace: &str,
        value: &str,
    ) -> Result<Option<DriverRecord>, DirectoryError>;

    fn patch_by_external_id(
        &self,
        namespace: &str,
        value: &str,
        patch: &DriverPatch,
    ) -> Result<PatchOutcome, DirectoryError>;

    /// Patch addressed by the directory's own id.
    fn patch_by_id(&self, id: &str, patch: &DriverPatch) -> Result<(), DirectoryError>;

    /// Create a driver. Returns the created record when the API echoes it.
    fn create(&self, driver: &NewDriver) -> Result<Option<DriverRecord>, DirectoryError>;

    /// Read-modify-write merge of one external id into a driver's map.
    /// Not atomic against concurrent edits of the same driver.
    fn add_external_id(&self, id: &str, namespace: &str, value: &str) -> Result<(), DirectoryError>;
}
