//! `hire`, `terminate`, `process` and `check`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use drs_config::SecretScope;
use drs_identity::parse_date;
use drs_reconcile::{HireOptions, ReconcileEngine, RunReport, TerminationOptions};

use super::{flush_registry, print_report, Session};
use crate::input::{self, Parsed};

/// Rows rejected by the input adapter are reported ahead of the processed ones.
fn with_rejected<T>(parsed: &mut Parsed<T>, report: &mut RunReport) {
    let mut outcomes = std::mem::take(&mut parsed.rejected);
    for o in &mut outcomes {
        o.dry_run = report.dry_run;
    }
    outcomes.append(&mut report.outcomes);
    report.outcomes = outcomes;
}

pub fn hire(config: &[PathBuf], file: &Path, opts: HireOptions, sync: bool) -> Result<bool> {
    // A dry run previews allocation and never creates, so no password is needed.
    let scope = if opts.dry_run {
        SecretScope::Directory
    } else {
        SecretScope::Hire
    };
    let session = Session::open(config, scope)?;
    let mut parsed = input::read_hires(file)?;

    let mappings = session.mappings()?;
    let directory = session.directory()?;
    let registry = session.registry()?;
    let engine = ReconcileEngine::new(&directory, &registry, &mappings, session.engine_settings());

    if sync {
        let added = engine.sync_usernames().context("username sync failed")?;
        println!("usernames_synced={added}");
    }

    let mut report = engine.run_hires(&parsed.rows, &opts);
    with_rejected(&mut parsed, &mut report);
    flush_registry(&registry)?;

    println!("config_hash={}", session.loaded.config_hash);
    print_report(&report);
    Ok(report.is_success())
}

pub fn terminate(config: &[PathBuf], file: &Path, opts: TerminationOptions) -> Result<bool> {
    let session = Session::open(config, SecretScope::Directory)?;
    let mut parsed = input::read_terminations(file)?;

    // Terminations never place drivers; the tables are not needed.
    let mappings = drs_config::TagMappings::default();
    let directory = session.directory()?;
    let registry = session.registry()?;
    let engine = ReconcileEngine::new(&directory, &registry, &mappings, session.engine_settings());

    let mut report = engine.run_terminations(&parsed.rows, &opts);
    with_rejected(&mut parsed, &mut report);
    flush_registry(&registry)?;

    println!("config_hash={}", session.loaded.config_hash);
    print_report(&report);
    Ok(report.is_success())
}

/// Terminations first so freed names are synced before hires allocate.
pub fn process(
    config: &[PathBuf],
    hires: &Path,
    terms: &Path,
    update_existing: bool,
    dry_run: bool,
) -> Result<bool> {
    let scope = if dry_run {
        SecretScope::Directory
    } else {
        SecretScope::Hire
    };
    let session = Session::open(config, scope)?;
    let mut term_rows = input::read_terminations(terms)?;
    let mut hire_rows = input::read_hires(hires)?;

    let mappings = session.mappings()?;
    let directory = session.directory()?;
    let registry = session.registry()?;
    let engine = ReconcileEngine::new(&directory, &registry, &mappings, session.engine_settings());

    let mut terms_report = engine.run_terminations(
        &term_rows.rows,
        &TerminationOptions {
            name_fallback: true,
            dry_run,
        },
    );
    with_rejected(&mut term_rows, &mut terms_report);
    println!("config_hash={}", session.loaded.config_hash);
    print_report(&terms_report);

    let added = engine.sync_usernames().context("username sync failed")?;
    println!("usernames_synced={added}");

    let mut hires_report = engine.run_hires(
        &hire_rows.rows,
        &HireOptions {
            update_existing,
            dry_run,
        },
    );
    with_rejected(&mut hire_rows, &mut hires_report);
    flush_registry(&registry)?;
    print_report(&hires_report);

    info!(
        terminations_failed = terms_report.failed(),
        hires_failed = hires_report.failed(),
        "process finished"
    );
    Ok(terms_report.is_success() && hires_report.is_success())
}

pub fn check(config: &[PathBuf], first: &str, last: &str, hire_date: &str) -> Result<()> {
    let hire_date = parse_date(hire_date).context("invalid hire date")?;
    let session = Session::open(config, SecretScope::Directory)?;

    let mappings = drs_config::TagMappings::default();
    let directory = session.directory()?;
    let registry = session.registry()?;
    let engine = ReconcileEngine::new(&directory, &registry, &mappings, session.engine_settings());

    let c = engine
        .check_employee(first, last, hire_date)
        .context("employee check failed")?;

    println!("key={}", c.key);
    println!("base_username={}", c.base_username);
    println!("next_username={}", c.next_username);
    match &c.driver {
        Some(d) => {
            println!("found=true");
            println!("driver_id={}", d.id);
            println!("status={}", d.status);
            if let Some(u) = &d.username {
                println!("username={u}");
            }
        }
        None => println!("found=false"),
    }
    Ok(())
}
