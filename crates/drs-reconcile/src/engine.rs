use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use tracing::info;

use drs_config::{DriverDefaults, TagMappings};
use drs_directory::{ActivationStatus, DriverDirectory, DriverPatch, DriverRecord, NewDriver};
use drs_identity::{derive_base_username, derive_key, format_mdy, IdentityKey};
use drs_registry::UsernameRegistry;

use crate::types::{EmployeeRecord, ReconcileError};

/// Static inputs for a run.
#[derive(Clone)]
pub struct EngineSettings {
    /// External-id namespace holding the identity key.
    pub namespace: String,
    pub default_password: String,
    pub drivers: DriverDefaults,
}

impl fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSettings")
            .field("namespace", &self.namespace)
            .field("default_password", &"<REDACTED>")
            .field("drivers", &self.drivers)
            .finish()
    }
}

impl EngineSettings {
    pub fn new(namespace: impl Into<String>, drivers: DriverDefaults) -> Self {
        Self {
            namespace: namespace.into(),
            default_password: String::new(),
            drivers,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.default_password = password.into();
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HireOptions {
    /// Patch existing drivers (update active, reactivate deactivated).
    pub update_existing: bool,
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminationOptions {
    /// Match by display name when the identity key misses.
    pub name_fallback: bool,
    pub dry_run: bool,
}

impl Default for TerminationOptions {
    fn default() -> Self {
        Self {
            name_fallback: true,
            dry_run: false,
        }
    }
}

/// Read-only preview for one employee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmployeeCheck {
    pub key: IdentityKey,
    pub base_username: String,
    /// What a create would allocate right now. Not reserved.
    pub next_username: String,
    pub driver: Option<DriverRecord>,
}

/// Tags and zone a driver gets from its work location and position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Placement {
    pub tag_ids: Vec<String>,
    pub timezone: String,
    pub position_tag: Option<String>,
}

/// Reconciles payroll rows against the driver directory.
///
/// Holds borrowed collaborators only; the caller owns the registry and is
/// responsible for flushing it.
pub struct ReconcileEngine<'a, D: DriverDirectory + ?Sized> {
    pub(crate) directory: &'a D,
    pub(crate) registry: &'a UsernameRegistry,
    pub(crate) mappings: &'a TagMappings,
    pub(crate) settings: EngineSettings,
}

impl<'a, D: DriverDirectory + ?Sized> ReconcileEngine<'a, D> {
    pub fn new(
        directory: &'a D,
        registry: &'a UsernameRegistry,
        mappings: &'a TagMappings,
        settings: EngineSettings,
    ) -> Self {
        Self {
            directory,
            registry,
            mappings,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// Feed every username in the directory (both statuses) into the ledger.
    /// Returns the number of names the ledger did not know yet.
    pub fn sync_usernames(&self) -> Result<usize, ReconcileError> {
        let remote = self.directory.usernames_by_status(true)?;
        let added = self.registry.sync_from_remote(remote.keys())?;
        info!(remote = remote.len(), added, "username ledger synced with directory");
        Ok(added)
    }

    pub fn check_employee(
        &self,
        first: &str,
        last: &str,
        hire_date: NaiveDate,
    ) -> Result<EmployeeCheck, ReconcileError> {
        let key = derive_key(first, last, hire_date)?;
        let base_username = derive_base_username(first, last)?;
        let next_username = self.registry.check_available(&base_username)?;
        let driver = self
            .directory
            .find_by_external_id(self.namespace(), key.as_str())?;
        Ok(EmployeeCheck {
            key,
            base_username,
            next_username,
            driver,
        })
    }

    // -----------------------------------------------------------------------
    // Payloads
    // -----------------------------------------------------------------------

    pub(crate) fn placement(&self, row: &EmployeeRecord) -> Result<Placement, ReconcileError> {
        let location = self
            .mappings
            .location(&row.work_location)
            .ok_or_else(|| ReconcileError::UnknownLocation(row.work_location.clone()))?;

        let position = row.position.trim();
        let position_tag = if position.is_empty() {
            None
        } else {
            let tag = self.mappings.position_tag(position).map(str::to_string);
            if tag.is_none() {
                tracing::warn!(
                    position,
                    employee = %row.display_name(),
                    "position tag missing; driver gets location tag only"
                );
            }
            tag
        };

        let mut tag_ids = vec![location.tag_id.clone()];
        tag_ids.extend(position_tag.iter().cloned());

        let timezone = if location.timezone.is_empty() {
            self.settings.drivers.default_timezone.clone()
        } else {
            location.timezone.clone()
        };

        Ok(Placement {
            tag_ids,
            timezone,
            position_tag,
        })
    }

    pub(crate) fn new_driver(
        &self,
        row: &EmployeeRecord,
        key: &IdentityKey,
        username: &str,
        placement: Placement,
    ) -> NewDriver {
        let d = &self.settings.drivers;

        let mut external_ids = BTreeMap::new();
        external_ids.insert(self.settings.namespace.clone(), key.to_string());
        if let Some(domain) = d.email_domain.as_deref().filter(|s| !s.trim().is_empty()) {
            external_ids.insert("email".to_string(), format!("{username}@{}", domain.trim()));
        }

        NewDriver {
            external_ids,
            name: row.display_name(),
            username: username.to_string(),
            password: self.settings.default_password.clone(),
            notes: format!("Hire Date: {}", format_mdy(row.hire_date)),
            phone: row
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            license_state: row.license_state.trim().to_string(),
            eld_exempt: d.eld_exempt,
            eld_exempt_reason: d.eld_exempt_reason.clone(),
            locale: d.locale.clone(),
            timezone: placement.timezone,
            tag_ids: placement.tag_ids,
            peer_group_tag_id: placement.position_tag,
        }
    }

    pub(crate) fn update_patch(&self, row: &EmployeeRecord, placement: Placement) -> DriverPatch {
        DriverPatch {
            notes: Some(format!("Updated: {}", format_mdy(row.hire_date))),
            tag_ids: Some(placement.tag_ids),
            timezone: Some(placement.timezone),
            license_state: Some(row.license_state.trim().to_string()),
            peer_group_tag_id: placement.position_tag,
            ..DriverPatch::default()
        }
    }

    pub(crate) fn reactivate_patch(row: &EmployeeRecord) -> DriverPatch {
        DriverPatch::status_change(
            ActivationStatus::Active,
            format!("Reactivated: {}", format_mdy(row.hire_date)),
        )
    }

    pub(crate) fn deactivate_patch(termination_date: NaiveDate) -> DriverPatch {
        DriverPatch::status_change(
            ActivationStatus::Deactivated,
            format!("Terminated: {}", format_mdy(termination_date)),
        )
    }
}
