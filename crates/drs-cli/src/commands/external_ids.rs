//! `external-ids verify | backfill`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use drs_config::SecretScope;
use drs_reconcile::migrate::{backfill_external_ids, verify_coverage};

use super::Session;

pub fn verify(config: &[PathBuf]) -> Result<()> {
    let session = Session::open(config, SecretScope::Directory)?;
    let directory = session.directory()?;
    let namespace = &session.config.identity.namespace;

    let report = verify_coverage(&directory, namespace).context("coverage check failed")?;

    println!("namespace={namespace}");
    println!("drivers_total={}", report.total);
    println!("with_key={}", report.with_key);
    println!("without_key={}", report.without_key.len());
    println!("other_ids_only={}", report.other_ids_only);
    println!("percent_covered={:.1}", report.percent_covered());
    for d in &report.without_key {
        println!("missing driver_id={} name=\"{}\" status={}", d.id, d.name, d.status);
    }
    Ok(())
}

/// Without `execute` only the plan is printed.
pub fn backfill(config: &[PathBuf], execute: bool) -> Result<bool> {
    let session = Session::open(config, SecretScope::Directory)?;
    let directory = session.directory()?;
    let namespace = &session.config.identity.namespace;

    let report =
        backfill_external_ids(&directory, namespace, execute).context("backfill failed")?;

    println!("namespace={namespace}");
    println!("executed={}", report.executed);
    for p in &report.applied {
        println!("backfill driver_id={} name=\"{}\" key={}", p.driver_id, p.name, p.key);
    }
    for name in &report.skipped {
        println!("skipped name=\"{name}\" reason=no_hire_date_in_notes");
    }
    for (p, err) in &report.failed {
        println!("failed driver_id={} key={} error=\"{}\"", p.driver_id, p.key, err);
    }
    println!("applied={}", report.applied.len());
    println!("skipped={}", report.skipped.len());
    println!("failed={}", report.failed.len());
    Ok(report.failed.is_empty())
}
