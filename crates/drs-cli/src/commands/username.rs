//! `username sync | status | check | stats`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use drs_config::SecretScope;
use drs_directory::{ActivationStatus, DriverDirectory};
use drs_identity::derive_base_username;

use super::{flush_registry, Session};

/// Feed every remote username (both statuses) into the ledger.
pub fn sync(config: &[PathBuf]) -> Result<()> {
    let session = Session::open(config, SecretScope::Directory)?;
    let directory = session.directory()?;
    let registry = session.registry()?;

    let remote = directory
        .usernames_by_status(true)
        .context("list directory usernames failed")?;
    let before = registry.len();
    let added = registry
        .sync_from_remote(remote.keys())
        .context("ledger sync failed")?;
    flush_registry(&registry)?;

    println!("remote_usernames={}", remote.len());
    println!("ledger_before={before}");
    println!("added={added}");
    println!("ledger_after={}", registry.len());
    Ok(())
}

/// Compare the ledger with the directory without changing either.
pub fn status(config: &[PathBuf]) -> Result<()> {
    let session = Session::open(config, SecretScope::Directory)?;
    let directory = session.directory()?;
    let registry = session.registry()?;

    let remote = directory
        .usernames_by_status(true)
        .context("list directory usernames failed")?;
    let local = registry.snapshot();

    let remote_lower: std::collections::BTreeSet<String> =
        remote.keys().map(|u| u.trim().to_lowercase()).collect();
    let missing_locally = remote_lower.difference(&local).count();
    let local_only = local.difference(&remote_lower).count();
    let active = remote
        .values()
        .filter(|s| **s == ActivationStatus::Active)
        .count();

    println!("ledger_path={}", registry.path().display());
    println!("ledger_usernames={}", local.len());
    println!("remote_usernames={}", remote.len());
    println!("remote_active={active}");
    println!("remote_deactivated={}", remote.len() - active);
    println!("remote_not_in_ledger={missing_locally}");
    println!("ledger_not_in_remote={local_only}");
    println!("in_sync={}", missing_locally == 0);
    Ok(())
}

/// Preview the username a new hire would get. Reserves nothing.
pub fn check(config: &[PathBuf], first: &str, last: &str) -> Result<()> {
    let session = Session::open(config, SecretScope::Offline)?;
    let registry = session.registry()?;

    let base = derive_base_username(first, last).context("cannot derive username")?;
    let next = registry
        .check_available(&base)
        .context("username check failed")?;

    println!("base_username={base}");
    println!("next_username={next}");
    println!("base_available={}", next == base);
    Ok(())
}

pub fn stats(config: &[PathBuf]) -> Result<()> {
    let session = Session::open(config, SecretScope::Offline)?;
    let registry = session.registry()?;

    println!("ledger_path={}", registry.path().display());
    println!("ledger_usernames={}", registry.len());
    println!("pending_writes={}", registry.pending_writes());
    Ok(())
}
