//! Termination flow: deactivate by identity key, falling back to a display
//! name match against the active list.

use tracing::{debug, error, info, warn};

use drs_directory::{ActivationStatus, DriverDirectory, DriverRecord, PatchOutcome};
use drs_identity::{derive_key, hire_date_from_notes};

use crate::engine::{ReconcileEngine, TerminationOptions};
use crate::types::{Flow, OutcomeKind, ReconcileError, RowOutcome, RunReport, TerminationRecord};

/// Active drivers fetched at most once per run for name matching. Matched
/// drivers are removed after deactivation so a duplicate row cannot hit them.
#[derive(Default)]
struct ActiveCache {
    drivers: Option<Vec<DriverRecord>>,
}

/// Exact, case-insensitive match on `First Last`, then `Last, First`.
/// Best effort: middle names or punctuation differences will miss.
pub fn find_driver_by_name<'d>(
    drivers: &'d [DriverRecord],
    first: &str,
    last: &str,
) -> Option<&'d DriverRecord> {
    let forms = [
        format!("{} {}", first.trim(), last.trim()).to_lowercase(),
        format!("{}, {}", last.trim(), first.trim()).to_lowercase(),
    ];
    forms.iter().find_map(|form| {
        drivers
            .iter()
            .find(|d| d.name.trim().to_lowercase() == *form)
    })
}

impl<'a, D: DriverDirectory + ?Sized> ReconcileEngine<'a, D> {
    pub fn run_terminations(
        &self,
        rows: &[TerminationRecord],
        opts: &TerminationOptions,
    ) -> RunReport {
        let mut report = RunReport::new(Flow::Termination, opts.dry_run);
        let mut cache = ActiveCache::default();

        if rows.iter().any(|r| r.hire_date.is_none()) {
            if opts.name_fallback {
                info!("rows without hire date present; name fallback will be used for them");
            } else {
                warn!("rows without hire date present and name fallback disabled; they will be NOT_FOUND");
            }
        }
        info!(
            run_id = %report.run_id,
            rows = rows.len(),
            name_fallback = opts.name_fallback,
            dry_run = opts.dry_run,
            "termination run started"
        );

        for row in rows {
            let outcome = match self.terminate_row(row, opts, &mut cache) {
                Ok(o) => o,
                Err(e) => {
                    error!(employee = %row.display_name(), error = %e, "termination row failed");
                    RowOutcome::new(row.display_name(), OutcomeKind::Failed)
                        .detail(e.to_string())
                        .dry_run(opts.dry_run)
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            run_id = %report.run_id,
            total = report.total(),
            failed = report.failed(),
            via_fallback = report.used_fallback(),
            "termination run finished"
        );
        report
    }

    fn terminate_row(
        &self,
        row: &TerminationRecord,
        opts: &TerminationOptions,
        cache: &mut ActiveCache,
    ) -> Result<RowOutcome, ReconcileError> {
        let name = row.display_name();
        let key = row
            .hire_date
            .map(|d| derive_key(&row.first_name, &row.last_name, d))
            .transpose()?;

        if let Some(key) = &key {
            match self
                .directory
                .find_by_external_id(self.namespace(), key.as_str())?
            {
                Some(d) if !d.is_active() => {
                    info!(employee = %name, "driver already deactivated");
                    return Ok(RowOutcome::new(name, OutcomeKind::AlreadyDeactivated)
                        .key(key.as_str())
                        .dry_run(opts.dry_run));
                }
                Some(d) => {
                    let applied = opts.dry_run
                        || self.directory.patch_by_external_id(
                            self.namespace(),
                            key.as_str(),
                            &Self::deactivate_patch(row.termination_date),
                        )? == PatchOutcome::Applied;
                    if applied {
                        // A later name match must not see this driver as active.
                        if let Some(drivers) = cache.drivers.as_mut() {
                            drivers.retain(|c| c.id != d.id);
                        }
                        info!(employee = %name, dry_run = opts.dry_run, "driver deactivated");
                        return Ok(RowOutcome::new(name, OutcomeKind::Deactivated)
                            .key(key.as_str())
                            .dry_run(opts.dry_run));
                    }
                    debug!(employee = %name, "keyed patch found nothing; trying fallback");
                }
                None => debug!(employee = %name, key = %key, "identity key not found"),
            }
        }

        if opts.name_fallback {
            if let Some(outcome) = self.terminate_by_name(row, opts, cache)? {
                return Ok(outcome);
            }
        }

        let reason = if key.is_some() {
            "not in directory"
        } else {
            "no hire date"
        };
        warn!(employee = %name, reason, "driver not found");
        Ok(RowOutcome::new(name, OutcomeKind::NotFound)
            .maybe_key(key.map(|k| k.into_string()))
            .detail(reason)
            .dry_run(opts.dry_run))
    }

    fn terminate_by_name(
        &self,
        row: &TerminationRecord,
        opts: &TerminationOptions,
        cache: &mut ActiveCache,
    ) -> Result<Option<RowOutcome>, ReconcileError> {
        if cache.drivers.is_none() {
            let active = self.directory.list_by_status(ActivationStatus::Active)?;
            info!(active = active.len(), "fetched active drivers for name fallback");
            cache.drivers = Some(active);
        }
        let drivers = cache.drivers.get_or_insert_with(Vec::new);

        let Some(driver) = find_driver_by_name(drivers, &row.first_name, &row.last_name).cloned()
        else {
            return Ok(None);
        };
        let name = row.display_name();

        if !driver.is_active() {
            return Ok(Some(
                RowOutcome::new(name, OutcomeKind::AlreadyDeactivated)
                    .dry_run(opts.dry_run)
                    .via_fallback(),
            ));
        }

        if opts.dry_run {
            info!(employee = %name, driver_id = %driver.id, "would deactivate via name fallback");
            return Ok(Some(
                RowOutcome::new(name, OutcomeKind::Deactivated)
                    .dry_run(true)
                    .via_fallback(),
            ));
        }

        self.directory
            .patch_by_id(&driver.id, &Self::deactivate_patch(row.termination_date))?;
        drivers.retain(|d| d.id != driver.id);
        info!(employee = %name, driver_id = %driver.id, "driver deactivated via name fallback");

        let backfilled = self.backfill_key(row, &driver);
        Ok(Some(
            RowOutcome::new(name, OutcomeKind::Deactivated)
                .maybe_key(backfilled)
                .via_fallback(),
        ))
    }

    /// Attach the identity key to a driver matched by name so future runs hit
    /// it directly. Failure is logged, never fatal to the row.
    fn backfill_key(&self, row: &TerminationRecord, driver: &DriverRecord) -> Option<String> {
        if driver.external_id(self.namespace()).is_some() {
            debug!(driver_id = %driver.id, "driver already carries identity key; no backfill");
            return None;
        }

        let hire_date = row
            .hire_date
            .or_else(|| driver.notes.as_deref().and_then(hire_date_from_notes))?;
        let key = match derive_key(&row.first_name, &row.last_name, hire_date) {
            Ok(k) => k,
            Err(e) => {
                warn!(driver_id = %driver.id, error = %e, "cannot derive key for backfill");
                return None;
            }
        };

        match self
            .directory
            .add_external_id(&driver.id, self.namespace(), key.as_str())
        {
            Ok(()) => {
                info!(driver_id = %driver.id, key = %key, "identity key backfilled");
                Some(key.into_string())
            }
            Err(e) => {
                warn!(driver_id = %driver.id, error = %e, "identity key backfill failed");
                None
            }
        }
    }
}
