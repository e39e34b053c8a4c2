//! Identity-key coverage across the whole directory, and backfill for drivers
//! created before keys existed.

use tracing::{info, warn};

use drs_directory::{DriverDirectory, DriverRecord};
use drs_identity::{derive_key, hire_date_from_notes};

use crate::types::ReconcileError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageReport {
    pub total: usize,
    pub with_key: usize,
    pub without_key: Vec<DriverRecord>,
    /// Drivers with some external ids but not the identity namespace.
    pub other_ids_only: usize,
}

impl CoverageReport {
    pub fn percent_covered(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.with_key as f64 * 100.0 / self.total as f64
    }
}

pub fn verify_coverage<D: DriverDirectory + ?Sized>(
    directory: &D,
    namespace: &str,
) -> Result<CoverageReport, ReconcileError> {
    let all = directory.list_all(true)?;
    let mut report = CoverageReport {
        total: all.len(),
        ..CoverageReport::default()
    };
    for d in all {
        if d.external_id(namespace).is_some() {
            report.with_key += 1;
        } else {
            if !d.external_ids.is_empty() {
                report.other_ids_only += 1;
            }
            report.without_key.push(d);
        }
    }
    Ok(report)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedKey {
    pub driver_id: String,
    pub name: String,
    pub key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub executed: bool,
    /// Keys written (or, without `execute`, that would be written).
    pub applied: Vec<PlannedKey>,
    /// Drivers whose name or notes give no usable key.
    pub skipped: Vec<String>,
    pub failed: Vec<(PlannedKey, String)>,
}

/// Split a display name at its first space. `None` for single-word names.
fn split_name(name: &str) -> Option<(&str, &str)> {
    let (first, last) = name.trim().split_once(' ')?;
    let last = last.trim();
    if first.is_empty() || last.is_empty() {
        return None;
    }
    Some((first, last))
}

fn plan_for(driver: &DriverRecord) -> Option<PlannedKey> {
    let hire = driver.notes.as_deref().and_then(hire_date_from_notes)?;
    let (first, last) = split_name(&driver.name)?;
    let key = derive_key(first, last, hire).ok()?;
    Some(PlannedKey {
        driver_id: driver.id.clone(),
        name: driver.name.clone(),
        key: key.into_string(),
    })
}

/// Derive identity keys from `Hire Date:` notes for every driver missing the
/// namespace. Without `execute` nothing is written.
pub fn backfill_external_ids<D: DriverDirectory + ?Sized>(
    directory: &D,
    namespace: &str,
    execute: bool,
) -> Result<BackfillReport, ReconcileError> {
    let coverage = verify_coverage(directory, namespace)?;
    let mut report = BackfillReport {
        executed: execute,
        ..BackfillReport::default()
    };

    for driver in &coverage.without_key {
        let Some(plan) = plan_for(driver) else {
            warn!(driver = %driver.name, "no hire date in notes; cannot backfill");
            report.skipped.push(driver.name.clone());
            continue;
        };

        if !execute {
            info!(driver = %plan.name, key = %plan.key, "would backfill identity key");
            report.applied.push(plan);
            continue;
        }

        match directory.add_external_id(&plan.driver_id, namespace, &plan.key) {
            Ok(()) => {
                info!(driver = %plan.name, key = %plan.key, "identity key backfilled");
                report.applied.push(plan);
            }
            Err(e) => {
                warn!(driver = %plan.name, error = %e, "backfill failed");
                report.failed.push((plan, e.to_string()));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_uses_first_space() {
        assert_eq!(split_name("Mary Ann Jones"), Some(("Mary", "Ann Jones")));
        assert_eq!(split_name("Cher"), None);
        assert_eq!(split_name("  Ana  Cruz "), Some(("Ana", "Cruz")));
    }
}
