//! Command handler modules for the `drs` binary.
//!
//! Shared setup (config, secrets, directory client, ledger) and summary
//! printing live here. Command-specific logic lives in the submodules.

pub mod external_ids;
pub mod sync;
pub mod username;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use drs_config::{
    report_unused_keys, resolve_secrets, LoadedConfig, ResolvedSecrets, SecretScope, SyncConfig,
    TagMappings, UnusedKeyPolicy,
};
use drs_directory::{FleetDirectory, ReqwestTransport, RetryPolicy};
use drs_reconcile::{EngineSettings, RunReport};
use drs_registry::UsernameRegistry;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Loaded configuration plus the secrets resolved for one command.
pub struct Session {
    pub loaded: LoadedConfig,
    pub config: SyncConfig,
    pub secrets: ResolvedSecrets,
}

impl Session {
    pub fn open(paths: &[PathBuf], scope: SecretScope) -> Result<Self> {
        let loaded = drs_config::load_layered_yaml(paths)?;
        let config = loaded.settings()?;

        let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
        for key in &unused.unused_leaf_pointers {
            warn!(key = %key, "config key is not used");
        }

        let secrets = resolve_secrets(&config, scope)?;
        info!(
            config_hash = %loaded.config_hash,
            scope = scope.as_str(),
            "configuration loaded"
        );
        Ok(Self {
            loaded,
            config,
            secrets,
        })
    }

    pub fn directory(&self) -> Result<FleetDirectory> {
        let d = &self.config.directory;
        let token = self
            .secrets
            .api_token
            .as_deref()
            .context("directory api token was not resolved")?;

        let transport = ReqwestTransport::new(&d.base_url, token, d.timeout())
            .context("directory client setup failed")?;
        let retry = RetryPolicy::new(
            d.retry.max_attempts,
            d.retry.base_delay(),
            d.retry.max_delay(),
        );
        Ok(FleetDirectory::new(Box::new(transport), retry)
            .with_canonical_external_ids(d.canonical_external_ids.clone()))
    }

    pub fn registry(&self) -> Result<UsernameRegistry> {
        let path = &self.config.registry.path;
        UsernameRegistry::open(path)
            .with_context(|| format!("open username ledger failed: {}", path.display()))
    }

    pub fn mappings(&self) -> Result<TagMappings> {
        TagMappings::load(&self.config.mappings, &self.config.drivers.default_timezone)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let s = EngineSettings::new(&self.config.identity.namespace, self.config.drivers.clone());
        match &self.secrets.default_password {
            Some(p) => s.with_password(p.clone()),
            None => s,
        }
    }
}

/// Flush the ledger and attach the path to any failure.
pub fn flush_registry(registry: &UsernameRegistry) -> Result<()> {
    registry
        .flush()
        .with_context(|| format!("flush username ledger failed: {}", registry.path().display()))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "'"))
}

/// Print a run as `key=value` lines: one header block, one line per row,
/// one line per modified username, then per-kind counts.
pub fn print_report(report: &RunReport) {
    println!("run_id={}", report.run_id);
    println!("flow={}", report.flow.as_str());
    println!("dry_run={}", report.dry_run);

    for (i, o) in report.outcomes.iter().enumerate() {
        let mut line = format!("row={} outcome={} name={}", i + 1, o.kind, quoted(&o.name));
        if let Some(k) = &o.key {
            line.push_str(&format!(" key={k}"));
        }
        if let Some(u) = &o.username {
            line.push_str(&format!(" username={u}"));
        }
        if o.via_fallback {
            line.push_str(" via_fallback=true");
        }
        if let Some(d) = &o.detail {
            line.push_str(&format!(" detail={}", quoted(d)));
        }
        println!("{line}");
    }

    for c in &report.modified_usernames {
        println!(
            "username_modified name={} base={} assigned={}",
            quoted(&c.name),
            c.base,
            c.assigned
        );
    }

    println!("total={}", report.total());
    for (kind, n) in report.counts() {
        println!("{}={}", kind.as_str().to_lowercase(), n);
    }
    println!("success={}", report.is_success());
}
