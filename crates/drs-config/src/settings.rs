use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed view over the merged configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub directory: DirectorySettings,
    pub identity: IdentitySettings,
    pub registry: RegistrySettings,
    pub drivers: DriverDefaults,
    pub mappings: MappingPaths,
}

impl SyncConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        let cfg: SyncConfig =
            serde_json::from_value(v.clone()).context("config does not match expected shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.directory.base_url.trim().is_empty() {
            bail!("CONFIG_INVALID: directory.base_url is empty");
        }
        if self.directory.retry.max_attempts == 0 {
            bail!("CONFIG_INVALID: directory.retry.max_attempts must be >= 1");
        }
        if self.directory.retry.base_delay_ms > self.directory.retry.max_delay_ms {
            bail!("CONFIG_INVALID: directory.retry.base_delay_ms exceeds max_delay_ms");
        }
        if self.identity.namespace.trim().is_empty() {
            bail!("CONFIG_INVALID: identity.namespace is empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    pub base_url: String,
    /// Name of the env var holding the API token. Never the token itself.
    pub token_env: String,
    pub timeout_secs: u64,
    pub retry: RetrySettings,
    /// Namespaces whose spelling variants are folded on outgoing writes.
    pub canonical_external_ids: Vec<String>,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.samsara.com/v1".to_string(),
            token_env: "FLEET_API_TOKEN".to_string(),
            timeout_secs: 10,
            retry: RetrySettings::default(),
            canonical_external_ids: vec!["encompassId".to_string()],
        }
    }
}

impl DirectorySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// External-id namespace the identity key is stored under.
    pub namespace: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            namespace: "paycomname".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub path: PathBuf,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/usernames.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverDefaults {
    pub password_env: String,
    pub locale: String,
    pub default_timezone: String,
    pub eld_exempt: bool,
    pub eld_exempt_reason: String,
    /// When set, new drivers get an `email` external id `{username}@{domain}`.
    pub email_domain: Option<String>,
}

impl Default for DriverDefaults {
    fn default() -> Self {
        Self {
            password_env: "DEFAULT_DRIVER_PASSWORD".to_string(),
            locale: "us".to_string(),
            default_timezone: "America/Chicago".to_string(),
            eld_exempt: true,
            eld_exempt_reason: "Short Haul".to_string(),
            email_domain: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingPaths {
    pub positions: PathBuf,
    pub locations: PathBuf,
    pub excluded_positions: PathBuf,
}

impl Default for MappingPaths {
    fn default() -> Self {
        Self {
            positions: PathBuf::from("data/positions.csv"),
            locations: PathBuf::from("data/locations.csv"),
            excluded_positions: PathBuf::from("data/never_positions.csv"),
        }
    }
}
