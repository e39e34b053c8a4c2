//! Scope-aware secret resolution.
//!
//! Failure cases use sentinel env var names that are never set anywhere, so
//! no test mutates the process environment for a missing-var check.
//!
//! GREEN when:
//! - Hire and Directory scopes fail closed on a missing token, naming the var.
//! - Hire scope also requires the default password.
//! - Offline scope succeeds with nothing set.
//! - Debug output never shows resolved values.

use drs_config::{resolve_secrets, SecretScope, SyncConfig};

fn config(token_env: &str, password_env: &str) -> SyncConfig {
    let mut cfg = SyncConfig::default();
    cfg.directory.token_env = token_env.to_string();
    cfg.drivers.password_env = password_env.to_string();
    cfg
}

#[test]
fn directory_scope_requires_token() {
    let cfg = config("DRS_SENTINEL_TOKEN_UNSET_A1", "DRS_SENTINEL_PW_UNSET_A1");
    let err = resolve_secrets(&cfg, SecretScope::Directory).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("SECRETS_MISSING"));
    assert!(msg.contains("DRS_SENTINEL_TOKEN_UNSET_A1"));
}

#[test]
fn hire_scope_requires_password_too() {
    std::env::set_var("DRS_SCENARIO_TOKEN_SET_B2", "tok-value-b2");
    let cfg = config("DRS_SCENARIO_TOKEN_SET_B2", "DRS_SENTINEL_PW_UNSET_B2");

    assert!(resolve_secrets(&cfg, SecretScope::Directory).is_ok());
    let err = resolve_secrets(&cfg, SecretScope::Hire).unwrap_err();
    assert!(err.to_string().contains("DRS_SENTINEL_PW_UNSET_B2"));
    assert!(!err.to_string().contains("tok-value-b2"));
}

#[test]
fn offline_scope_needs_nothing() {
    let cfg = config("DRS_SENTINEL_TOKEN_UNSET_C3", "DRS_SENTINEL_PW_UNSET_C3");
    let s = resolve_secrets(&cfg, SecretScope::Offline).unwrap();
    assert!(s.api_token.is_none());
    assert!(s.default_password.is_none());
}

#[test]
fn resolved_values_are_redacted_in_debug() {
    std::env::set_var("DRS_SCENARIO_TOKEN_SET_D4", "tok-value-d4");
    std::env::set_var("DRS_SCENARIO_PW_SET_D4", "pw-value-d4");
    let cfg = config("DRS_SCENARIO_TOKEN_SET_D4", "DRS_SCENARIO_PW_SET_D4");

    let s = resolve_secrets(&cfg, SecretScope::Hire).unwrap();
    assert_eq!(s.api_token.as_deref(), Some("tok-value-d4"));
    let dbg = format!("{s:?}");
    assert!(!dbg.contains("tok-value-d4"));
    assert!(!dbg.contains("pw-value-d4"));
    assert!(dbg.contains("<REDACTED>"));
}
