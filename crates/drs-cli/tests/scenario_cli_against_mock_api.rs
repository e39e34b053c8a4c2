//! `drs` end to end against a mock fleet API.
//!
//! GREEN when:
//! - `terminate` deactivates a keyed driver through its external id, prints
//!   the outcome line and counts, and exits 0.
//! - `hire --dry-run` with an unknown work location reports the row FAILED,
//!   never posts a create, and exits 1.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::prelude::*;
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use predicates::prelude::*;
use std::process::Command;

const TOKEN_ENV: &str = "DRS_MOCK_API_TOKEN";

fn write_workspace(dir: &Path, base_url: &str) -> PathBuf {
    fs::write(dir.join("positions.csv"), "Position,TagId\nCDL Driver,3001\n").unwrap();
    fs::write(
        dir.join("locations.csv"),
        "Location,Id,Timezone\nAbilene,2762144,America/Chicago\n",
    )
    .unwrap();
    fs::write(dir.join("never.csv"), "Position\nOffice Manager\n").unwrap();

    let cfg = dir.join("drs.yaml");
    fs::write(
        &cfg,
        format!(
            "directory:\n  base_url: \"{base_url}\"\n  token_env: \"{TOKEN_ENV}\"\n  timeout_secs: 5\n  \
             retry:\n    max_attempts: 1\n    base_delay_ms: 0\n    max_delay_ms: 0\n\
             registry:\n  path: \"usernames.csv\"\n\
             mappings:\n  positions: \"positions.csv\"\n  locations: \"locations.csv\"\n  \
             excluded_positions: \"never.csv\"\n"
        ),
    )
    .unwrap();
    cfg
}

fn drs(dir: &Path, cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("drs").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env(TOKEN_ENV, "mock-token")
        .arg("--config")
        .arg(cfg);
    cmd
}

#[test]
fn terminate_keyed_driver() {
    let server = MockServer::start();
    let lookup = server.mock(|when, then| {
        when.method(GET)
            .path_contains("/fleet/drivers/paycomname")
            .header("authorization", "Bearer mock-token");
        then.status(200).body(
            r#"{"data":{"id":"281474","name":"John Smith","username":"jsmith",
                "driverActivationStatus":"active",
                "externalIds":{"paycomname":"John-Smith_01-15-2024"}}}"#,
        );
    });
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path_contains("/fleet/drivers/paycomname")
            .body_contains("deactivated")
            .body_contains("Terminated: 03-01-2024");
        then.status(200).body(r#"{"data":{"id":"281474","name":"John Smith"}}"#);
    });

    let dir = tempfile::tempdir().unwrap();
    let cfg = write_workspace(dir.path(), &server.base_url());
    fs::write(
        dir.path().join("terms.csv"),
        "Legal_Firstname,Legal_Lastname,Hire_Date,Termination_Date\nJohn,Smith,01-15-2024,03-01-2024\n",
    )
    .unwrap();

    drs(dir.path(), &cfg)
        .args(["terminate", "terms.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flow=termination"))
        .stdout(predicate::str::contains(
            "outcome=DEACTIVATED name=\"John Smith\" key=John-Smith_01-15-2024",
        ))
        .stdout(predicate::str::contains("deactivated=1"))
        .stdout(predicate::str::contains("success=true"));

    lookup.assert_hits(1);
    patch.assert_hits(1);
}

#[test]
fn dry_run_hire_with_unknown_location_fails_without_create() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path_contains("/fleet/drivers/paycomname");
        then.status(404).body(r#"{"message":"not found"}"#);
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/fleet/drivers");
        then.status(200).body("{}");
    });

    let dir = tempfile::tempdir().unwrap();
    let cfg = write_workspace(dir.path(), &server.base_url());
    fs::write(
        dir.path().join("hires.csv"),
        "Legal_Firstname,Legal_Lastname,Hire_Date,Work_Location,State,Position,Employee_Status\n\
         Ann,Doe,02-01-2024,Atlantis,TX,CDL Driver,Active\n\
         John,Smith,01-15-2024,Abilene,TX,CDL Driver,Active\n",
    )
    .unwrap();

    drs(dir.path(), &cfg)
        .args(["hire", "hires.csv", "--dry-run"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("dry_run=true"))
        .stdout(predicate::str::contains("outcome=FAILED name=\"Ann Doe\""))
        .stdout(predicate::str::contains("outcome=CREATED name=\"John Smith\""))
        .stdout(predicate::str::contains("username=jsmith"))
        .stdout(predicate::str::contains("failed=1"));

    create.assert_hits(0);
    let ledger = fs::read_to_string(dir.path().join("usernames.csv")).unwrap();
    assert!(!ledger.contains("jsmith"), "dry run reserves nothing");
}
