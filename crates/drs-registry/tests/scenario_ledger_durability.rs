//! Ledger durability scenarios.
//!
//! GREEN when:
//! - Allocating N names, flushing and reopening yields exactly those N names.
//! - Nine buffered mutations do not touch the file; the tenth rewrites it.
//! - Dropping the registry writes whatever is still pending.
//! - A headerless ledger keeps its first row; that name is never reissued.

use std::collections::BTreeSet;
use std::fs;

use drs_registry::{UsernameRegistry, FLUSH_THRESHOLD};

fn ledger_rows(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|l| l.to_string())
        .collect()
}

#[test]
fn allocate_flush_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usernames.csv");

    let allocated: BTreeSet<String> = {
        let reg = UsernameRegistry::open(&path).unwrap();
        let mut out = BTreeSet::new();
        for base in ["jsmith", "jsmith", "adoe", "mlopez", "jsmith", "kchan", "adoe"] {
            out.insert(reg.make_unique(base).unwrap());
        }
        reg.flush().unwrap();
        out
    };
    assert_eq!(allocated.len(), 7);

    let reopened = UsernameRegistry::open(&path).unwrap();
    assert_eq!(reopened.snapshot(), allocated);
    assert_eq!(reopened.pending_writes(), 0);
}

#[test]
fn writes_are_buffered_until_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usernames.csv");
    let reg = UsernameRegistry::open(&path).unwrap();

    for i in 0..FLUSH_THRESHOLD - 1 {
        reg.add_existing(&format!("user{i}")).unwrap();
    }
    assert!(ledger_rows(&path).is_empty(), "nothing written before threshold");
    assert_eq!(reg.pending_writes(), FLUSH_THRESHOLD - 1);

    reg.add_existing("user9").unwrap();
    let mut rows = ledger_rows(&path);
    rows.sort();
    let mut expected: Vec<String> = (0..FLUSH_THRESHOLD).map(|i| format!("user{i}")).collect();
    expected.sort();
    assert_eq!(rows, expected);
    assert_eq!(reg.pending_writes(), 0);
}

#[test]
fn bulk_sync_counts_toward_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usernames.csv");
    let reg = UsernameRegistry::open(&path).unwrap();

    let remote: Vec<String> = (0..25).map(|i| format!("remote{i}")).collect();
    assert_eq!(reg.sync_from_remote(&remote).unwrap(), 25);

    assert_eq!(ledger_rows(&path).len(), 25);
    assert_eq!(reg.pending_writes(), 0);
}

#[test]
fn drop_flushes_pending_allocations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usernames.csv");

    {
        let reg = UsernameRegistry::open(&path).unwrap();
        reg.make_unique("shutdownuser").unwrap();
        assert!(ledger_rows(&path).is_empty());
    }

    assert_eq!(ledger_rows(&path), vec!["shutdownuser".to_string()]);
}

#[test]
fn reopened_registry_keeps_avoiding_old_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usernames.csv");

    let first = {
        let reg = UsernameRegistry::open(&path).unwrap();
        reg.make_unique("alice").unwrap()
    };

    let reg = UsernameRegistry::open(&path).unwrap();
    assert!(reg.exists(&first));
    assert_eq!(reg.make_unique("alice").unwrap(), "alice2");
}

#[test]
fn headerless_ledger_first_name_is_not_reissued() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usernames.csv");
    fs::write(&path, "jsmith\nadoe\n").unwrap();

    let reg = UsernameRegistry::open(&path).unwrap();
    let expected: BTreeSet<String> = ["adoe", "jsmith"].iter().map(|s| s.to_string()).collect();
    assert_eq!(reg.snapshot(), expected);
    assert_eq!(reg.make_unique("jsmith").unwrap(), "jsmith2");
}
