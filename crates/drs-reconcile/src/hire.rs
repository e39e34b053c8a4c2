//! Hire flow: create, update, reactivate or leave alone.

use tracing::{error, info};

use drs_directory::{DriverDirectory, DriverRecord, PatchOutcome};
use drs_identity::{derive_base_username, derive_key, IdentityKey};

use crate::engine::{HireOptions, ReconcileEngine};
use crate::types::{
    EmployeeRecord, Flow, OutcomeKind, ReconcileError, RowOutcome, RunReport, UsernameChange,
};

impl<'a, D: DriverDirectory + ?Sized> ReconcileEngine<'a, D> {
    /// Process hire rows in order. A failing row becomes a FAILED outcome and
    /// the run continues.
    pub fn run_hires(&self, rows: &[EmployeeRecord], opts: &HireOptions) -> RunReport {
        let mut report = RunReport::new(Flow::Hire, opts.dry_run);
        info!(
            run_id = %report.run_id,
            rows = rows.len(),
            update_existing = opts.update_existing,
            dry_run = opts.dry_run,
            "hire run started"
        );

        for row in rows {
            let outcome = match self.hire_row(row, opts, &mut report.modified_usernames) {
                Ok(o) => o,
                Err(e) => {
                    error!(employee = %row.display_name(), error = %e, "hire row failed");
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
            "hire run finished"
        );
        report
    }

    fn hire_row(
        &self,
        row: &EmployeeRecord,
        opts: &HireOptions,
        changes: &mut Vec<UsernameChange>,
    ) -> Result<RowOutcome, ReconcileError> {
        let key = derive_key(&row.first_name, &row.last_name, row.hire_date)?;

        match self
            .directory
            .find_by_external_id(self.namespace(), key.as_str())?
        {
            Some(driver) => self.hire_existing(row, &key, driver, opts),
            None => self.hire_new(row, &key, opts, changes),
        }
    }

    fn hire_existing(
        &self,
        row: &EmployeeRecord,
        key: &IdentityKey,
        driver: DriverRecord,
        opts: &HireOptions,
    ) -> Result<RowOutcome, ReconcileError> {
        let name = row.display_name();
        let base = RowOutcome::new(name.clone(), OutcomeKind::AlreadyExists)
            .key(key.as_str())
            .dry_run(opts.dry_run);
        let base = match &driver.username {
            Some(u) => base.username(u.clone()),
            None => base,
        };

        if !opts.update_existing {
            info!(employee = %name, status = %driver.status, "driver already exists");
            return Ok(base);
        }

        if !driver.is_active() {
            if !opts.dry_run {
                self.patch_by_key(key, &Self::reactivate_patch(row))?;
            }
            info!(employee = %name, dry_run = opts.dry_run, "driver reactivated");
            return Ok(RowOutcome {
                kind: OutcomeKind::Reactivated,
                ..base
            });
        }

        if self.mappings.is_excluded(&row.position) {
            info!(employee = %name, position = %row.position, "excluded position; update skipped");
            return Ok(RowOutcome {
                kind: OutcomeKind::Skipped,
                detail: Some(format!("excluded position '{}'", row.position.trim())),
                ..base
            });
        }

        let patch = self.update_patch(row, self.placement(row)?);
        if !opts.dry_run {
            self.patch_by_key(key, &patch)?;
        }
        info!(employee = %name, dry_run = opts.dry_run, "driver updated");
        Ok(RowOutcome {
            kind: OutcomeKind::Updated,
            ..base
        })
    }

    fn hire_new(
        &self,
        row: &EmployeeRecord,
        key: &IdentityKey,
        opts: &HireOptions,
        changes: &mut Vec<UsernameChange>,
    ) -> Result<RowOutcome, ReconcileError> {
        let name = row.display_name();

        if self.mappings.is_excluded(&row.position) {
            info!(employee = %name, position = %row.position, "excluded position; skipped");
            return Ok(RowOutcome::new(name, OutcomeKind::Skipped)
                .key(key.as_str())
                .detail(format!("excluded position '{}'", row.position.trim()))
                .dry_run(opts.dry_run));
        }

        // Validate before allocating so a bad row never consumes a username.
        let placement = self.placement(row)?;

        let base = derive_base_username(&row.first_name, &row.last_name)?;
        let username = if opts.dry_run {
            self.registry.check_available(&base)?
        } else {
            self.registry.make_unique(&base)?
        };
        if username != base {
            info!(employee = %name, base = %base, assigned = %username, "username modified for uniqueness");
            changes.push(UsernameChange {
                name: name.clone(),
                base,
                assigned: username.clone(),
            });
        }

        let payload = self.new_driver(row, key, &username, placement);
        if !opts.dry_run {
            self.directory.create(&payload)?;
        }
        info!(
            employee = %name,
            username = %username,
            key = %key,
            dry_run = opts.dry_run,
            "driver created"
        );

        Ok(RowOutcome::new(name, OutcomeKind::Created)
            .key(key.as_str())
            .username(username)
            .dry_run(opts.dry_run))
    }

    fn patch_by_key(
        &self,
        key: &IdentityKey,
        patch: &drs_directory::DriverPatch,
    ) -> Result<(), ReconcileError> {
        match self
            .directory
            .patch_by_external_id(self.namespace(), key.as_str(), patch)?
        {
            PatchOutcome::Applied => Ok(()),
            PatchOutcome::NotFound => Err(ReconcileError::PatchTargetMissing {
                key: key.to_string(),
            }),
        }
    }
}
