//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (`directory.token_env`,
//!   `drivers.password_env`).
//! - Callers invoke [`resolve_secrets`] once at startup and pass the result to
//!   constructors; nothing else reads these variables.
//! - `Debug` redacts values. Errors name the variable, never its value.
//!
//! # Scope enforcement
//! | Scope       | Required                         |
//! |-------------|----------------------------------|
//! | `Hire`      | API token, default driver password |
//! | `Directory` | API token                        |
//! | `Offline`   | nothing                          |

use anyhow::{bail, Result};

use crate::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretScope {
    /// Creates drivers: needs the token and the default password.
    Hire,
    /// Reads or patches the directory.
    Directory,
    /// Local-only work (ledger stats, config hashing).
    Offline,
}

impl SecretScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretScope::Hire => "HIRE",
            SecretScope::Directory => "DIRECTORY",
            SecretScope::Offline => "OFFLINE",
        }
    }
}

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub api_token: Option<String>,
    pub default_password: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field(
                "default_password",
                &self.default_password.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_secrets(config: &SyncConfig, scope: SecretScope) -> Result<ResolvedSecrets> {
    let token_var = config.directory.token_env.trim();
    let password_var = config.drivers.password_env.trim();

    let api_token = resolve_env(token_var);
    let default_password = resolve_env(password_var);

    if matches!(scope, SecretScope::Hire | SecretScope::Directory) && api_token.is_none() {
        bail!(
            "SECRETS_MISSING scope={}: required env var '{}' (directory api token) is not set or empty",
            scope.as_str(),
            token_var,
        );
    }
    if scope == SecretScope::Hire && default_password.is_none() {
        bail!(
            "SECRETS_MISSING scope={}: required env var '{}' (default driver password) is not set or empty",
            scope.as_str(),
            password_var,
        );
    }

    Ok(ResolvedSecrets {
        api_token,
        default_password,
    })
}
