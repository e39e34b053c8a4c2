//! drs-registry
//!
//! Persistent username ledger.
//!
//! - Every login name ever handed out (or observed in the remote directory) is
//!   kept, lower-cased, in one in-memory set mirrored to a flat CSV file.
//! - Names are never removed, so an abandoned username is never reissued.
//! - Mutations are buffered and the file is rewritten once
//!   [`FLUSH_THRESHOLD`] of them are pending, on [`UsernameRegistry::flush`],
//!   and on drop.
//! - One mutex guards the set, the pending counter and file writes. The
//!   registry never calls out to the network while holding it.
//!
//! The registry is constructed explicitly and passed to whoever needs it
//! (wrap it in `Arc` to share across threads); there is no global instance.

mod store;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

/// Unflushed mutations that trigger a rewrite of the backing file.
pub const FLUSH_THRESHOLD: usize = 10;

/// Highest numeric suffix probed before giving up on a base name.
pub const MAX_SUFFIX: u32 = 9_999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested base was empty after normalization.
    EmptyBase,
    /// Every candidate `base2..=base9999` is already taken.
    Exhausted { base: String, max_suffix: u32 },
    /// The backing file could not be read or written.
    Store { path: PathBuf, detail: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::EmptyBase => write!(f, "username base is empty"),
            RegistryError::Exhausted { base, max_suffix } => write!(
                f,
                "USERNAME_EXHAUSTED: no free username for base '{base}' \
                 (probed {base}2..{base}{max_suffix}); manual intervention required"
            ),
            RegistryError::Store { path, detail } => {
                write!(f, "username ledger {:?}: {detail}", path)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Debug, Default)]
struct LedgerState {
    names: BTreeSet<String>,
    pending: usize,
}

/// Collision-free username allocator backed by a CSV ledger.
#[derive(Debug)]
pub struct UsernameRegistry {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// First free candidate for `base`: `base` itself, then `base2`, `base3`, ...
fn probe(names: &BTreeSet<String>, base: &str) -> Result<String, RegistryError> {
    if base.is_empty() {
        return Err(RegistryError::EmptyBase);
    }
    if !names.contains(base) {
        return Ok(base.to_string());
    }
    for n in 2..=MAX_SUFFIX {
        let candidate = format!("{base}{n}");
        if !names.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(RegistryError::Exhausted {
        base: base.to_string(),
        max_suffix: MAX_SUFFIX,
    })
}

impl UsernameRegistry {
    /// Load the ledger at `path`, creating an empty one if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();

        let names = if path.exists() {
            let names = store::load(&path)?;
            info!(count = names.len(), path = %path.display(), "loaded username ledger");
            names
        } else {
            info!(path = %path.display(), "no username ledger found, starting fresh");
            let names = BTreeSet::new();
            store::save(&path, &names)?;
            names
        };

        Ok(Self {
            path,
            state: Mutex::new(LedgerState { names, pending: 0 }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // A panic while holding the lock cannot leave the set half-updated
        // (every mutation is a single insert), so a poisoned lock is usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count `added` new mutations and rewrite the file once the threshold is hit.
    fn note_mutations(&self, state: &mut LedgerState, added: usize) -> Result<(), RegistryError> {
        state.pending += added;
        if state.pending >= FLUSH_THRESHOLD {
            self.flush_locked(state)?;
        }
        Ok(())
    }

    fn flush_locked(&self, state: &mut LedgerState) -> Result<(), RegistryError> {
        if state.pending == 0 {
            return Ok(());
        }
        store::save(&self.path, &state.names)?;
        debug!(count = state.names.len(), path = %self.path.display(), "flushed username ledger");
        state.pending = 0;
        Ok(())
    }

    /// Allocate a username derived from `base` and record it.
    ///
    /// Returns `base` (lower-cased) when free, otherwise the first free
    /// `base{n}` for `n` in `2..=9999`.
    pub fn make_unique(&self, base: &str) -> Result<String, RegistryError> {
        let base = normalize(base);
        let mut state = self.lock();

        let chosen = probe(&state.names, &base)?;
        state.names.insert(chosen.clone());
        if chosen != base {
            info!(base = %base, username = %chosen, "username taken, allocated variant");
        }
        self.note_mutations(&mut state, 1)?;
        Ok(chosen)
    }

    /// The username [`make_unique`](Self::make_unique) would return right now.
    /// Nothing is recorded.
    pub fn check_available(&self, base: &str) -> Result<String, RegistryError> {
        let base = normalize(base);
        let state = self.lock();
        probe(&state.names, &base)
    }

    /// Record a username that already exists elsewhere, verbatim (lower-cased).
    /// Returns `true` if it was not already present.
    pub fn add_existing(&self, username: &str) -> Result<bool, RegistryError> {
        let username = normalize(username);
        if username.is_empty() {
            return Err(RegistryError::EmptyBase);
        }
        let mut state = self.lock();
        if !state.names.insert(username.clone()) {
            return Ok(false);
        }
        debug!(username = %username, "added existing username");
        self.note_mutations(&mut state, 1)?;
        Ok(true)
    }

    /// Bulk [`add_existing`](Self::add_existing) for usernames read from the
    /// remote directory. Blank entries are ignored. Returns how many were new.
    pub fn sync_from_remote<I, S>(&self, usernames: I) -> Result<usize, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.lock();
        let before = state.names.len();
        for u in usernames {
            let u = normalize(u.as_ref());
            if !u.is_empty() {
                state.names.insert(u);
            }
        }
        let added = state.names.len() - before;
        if added > 0 {
            info!(added, total = state.names.len(), "synced usernames from remote directory");
            self.note_mutations(&mut state, added)?;
        }
        Ok(added)
    }

    pub fn exists(&self, username: &str) -> bool {
        self.lock().names.contains(&normalize(username))
    }

    /// Copy of every recorded username.
    pub fn snapshot(&self) -> BTreeSet<String> {
        self.lock().names.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutations recorded in memory but not yet written to the ledger file.
    pub fn pending_writes(&self) -> usize {
        self.lock().pending
    }

    /// Write any pending mutations to the ledger file.
    pub fn flush(&self) -> Result<(), RegistryError> {
        let mut state = self.lock();
        self.flush_locked(&mut state)
    }
}

impl Drop for UsernameRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "final username ledger flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (tempfile::TempDir, UsernameRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let reg = UsernameRegistry::open(dir.path().join("usernames.csv")).unwrap();
        (dir, reg)
    }

    #[test]
    fn open_creates_missing_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("usernames.csv");
        let reg = UsernameRegistry::open(&path).unwrap();
        assert!(path.exists());
        assert!(reg.is_empty());
    }

    #[test]
    fn make_unique_returns_base_then_numbered_variants() {
        let (_dir, reg) = registry();
        assert_eq!(reg.make_unique("JSmith").unwrap(), "jsmith");
        assert_eq!(reg.make_unique("jsmith").unwrap(), "jsmith2");
        assert_eq!(reg.make_unique("JSMITH").unwrap(), "jsmith3");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn make_unique_fills_gaps_in_order() {
        let (_dir, reg) = registry();
        reg.sync_from_remote(["jdoe", "jdoe3"]).unwrap();
        assert_eq!(reg.make_unique("jdoe").unwrap(), "jdoe2");
        assert_eq!(reg.make_unique("jdoe").unwrap(), "jdoe4");
    }

    #[test]
    fn check_available_does_not_mutate() {
        let (_dir, reg) = registry();
        reg.make_unique("alee").unwrap();
        let before = reg.snapshot();

        assert_eq!(reg.check_available("alee").unwrap(), "alee2");
        assert_eq!(reg.check_available("alee").unwrap(), "alee2");
        assert!(!reg.exists("alee2"));
        assert_eq!(reg.snapshot(), before);
        assert_eq!(reg.pending_writes(), 1);
    }

    #[test]
    fn add_existing_is_idempotent() {
        let (_dir, reg) = registry();
        assert!(reg.add_existing("BWayne").unwrap());
        assert!(!reg.add_existing("bwayne").unwrap());
        assert!(reg.exists("BWAYNE"));
        assert_eq!(reg.pending_writes(), 1);
    }

    #[test]
    fn empty_base_is_rejected() {
        let (_dir, reg) = registry();
        assert_eq!(reg.make_unique("  ").unwrap_err(), RegistryError::EmptyBase);
        assert_eq!(reg.add_existing("").unwrap_err(), RegistryError::EmptyBase);
    }

    #[test]
    fn sync_ignores_blanks_and_counts_new() {
        let (_dir, reg) = registry();
        reg.add_existing("kim").unwrap();
        let added = reg.sync_from_remote(vec!["Kim", "", "lee", "LEE"]).unwrap();
        assert_eq!(added, 1);
        assert_eq!(
            reg.snapshot(),
            ["kim", "lee"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn exhausted_message_names_the_base() {
        let err = RegistryError::Exhausted {
            base: "zz".to_string(),
            max_suffix: MAX_SUFFIX,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("USERNAME_EXHAUSTED"));
        assert!(msg.contains("'zz'"));
        assert!(msg.contains("zz9999"));
    }
}
