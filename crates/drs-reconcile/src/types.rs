use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use uuid::Uuid;

use drs_directory::DirectoryError;
use drs_identity::KeyError;
use drs_registry::RegistryError;

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// One employee from the payroll hire export. Immutable for the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmployeeRecord {
    pub first_name: String,
    pub last_name: String,
    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    pub work_location: String,
    /// License-issuing state.
    pub license_state: String,
    pub position: String,
    pub employment_status: String,
    pub phone: Option<String>,
}

impl EmployeeRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One employee from the termination export. Hire date is often missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminationRecord {
    pub first_name: String,
    pub last_name: String,
    pub termination_date: NaiveDate,
    pub hire_date: Option<NaiveDate>,
}

impl TerminationRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeKind {
    Created,
    Updated,
    Reactivated,
    Deactivated,
    AlreadyExists,
    AlreadyDeactivated,
    Skipped,
    NotFound,
    Failed,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 9] = [
        OutcomeKind::Created,
        OutcomeKind::Updated,
        OutcomeKind::Reactivated,
        OutcomeKind::Deactivated,
        OutcomeKind::AlreadyExists,
        OutcomeKind::AlreadyDeactivated,
        OutcomeKind::Skipped,
        OutcomeKind::NotFound,
        OutcomeKind::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Created => "CREATED",
            OutcomeKind::Updated => "UPDATED",
            OutcomeKind::Reactivated => "REACTIVATED",
            OutcomeKind::Deactivated => "DEACTIVATED",
            OutcomeKind::AlreadyExists => "ALREADY_EXISTS",
            OutcomeKind::AlreadyDeactivated => "ALREADY_DEACTIVATED",
            OutcomeKind::Skipped => "SKIPPED",
            OutcomeKind::NotFound => "NOT_FOUND",
            OutcomeKind::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result for a single input row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowOutcome {
    /// `First Last` as given in the input.
    pub name: String,
    pub kind: OutcomeKind,
    pub key: Option<String>,
    pub username: Option<String>,
    /// Reason for SKIPPED / NOT_FOUND, rendered error for FAILED.
    pub detail: Option<String>,
    /// The outcome describes what would have happened; nothing was written.
    pub dry_run: bool,
    /// The driver was matched by display name rather than identity key.
    pub via_fallback: bool,
}

impl RowOutcome {
    pub fn new(name: impl Into<String>, kind: OutcomeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            key: None,
            username: None,
            detail: None,
            dry_run: false,
            via_fallback: false,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn maybe_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn via_fallback(mut self) -> Self {
        self.via_fallback = true;
        self
    }
}

/// A username that had to be suffixed because its base was taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsernameChange {
    pub name: String,
    pub base: String,
    pub assigned: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Hire,
    Termination,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Hire => "hire",
            Flow::Termination => "termination",
        }
    }
}

/// Everything one pass over an input file produced.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub flow: Flow,
    pub dry_run: bool,
    pub outcomes: Vec<RowOutcome>,
    pub modified_usernames: Vec<UsernameChange>,
}

impl RunReport {
    pub fn new(flow: Flow, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            flow,
            dry_run,
            outcomes: Vec::new(),
            modified_usernames: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.outcomes.iter().filter(|o| o.kind == kind).count()
    }

    /// Every kind, including zero counts, in declaration order.
    pub fn counts(&self) -> BTreeMap<OutcomeKind, usize> {
        OutcomeKind::ALL
            .iter()
            .map(|k| (*k, self.count(*k)))
            .collect()
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeKind::Failed)
    }

    pub fn used_fallback(&self) -> usize {
        self.outcomes.iter().filter(|o| o.via_fallback).count()
    }

    /// A run succeeds when no row failed. NOT_FOUND and SKIPPED are not failures.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn of_kind(&self, kind: OutcomeKind) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes.iter().filter(move |o| o.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure while reconciling. Inside a run it is caught per row and recorded
/// as a FAILED outcome; standalone operations return it.
#[derive(Debug)]
pub enum ReconcileError {
    Key(KeyError),
    Registry(RegistryError),
    Directory(DirectoryError),
    UnknownLocation(String),
    /// The driver found by key vanished before the patch landed.
    PatchTargetMissing { key: String },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Key(e) => write!(f, "validation: {e}"),
            ReconcileError::Registry(e) => write!(f, "username allocation: {e}"),
            ReconcileError::Directory(e) => write!(f, "directory: {e}"),
            ReconcileError::UnknownLocation(loc) => write!(f, "validation: unknown work location '{loc}'"),
            ReconcileError::PatchTargetMissing { key } => {
                write!(f, "directory: driver {key} disappeared before patch")
            }
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Key(e) => Some(e),
            ReconcileError::Registry(e) => Some(e),
            ReconcileError::Directory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KeyError> for ReconcileError {
    fn from(e: KeyError) -> Self {
        ReconcileError::Key(e)
    }
}

impl From<RegistryError> for ReconcileError {
    fn from(e: RegistryError) -> Self {
        ReconcileError::Registry(e)
    }
}

impl From<DirectoryError> for ReconcileError {
    fn from(e: DirectoryError) -> Self {
        ReconcileError::Directory(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_include_every_kind() {
        let mut r = RunReport::new(Flow::Hire, false);
        r.outcomes.push(RowOutcome::new("A B", OutcomeKind::Created));
        r.outcomes.push(RowOutcome::new("C D", OutcomeKind::Failed));
        r.outcomes.push(RowOutcome::new("E F", OutcomeKind::NotFound));

        let c = r.counts();
        assert_eq!(c.len(), 9);
        assert_eq!(c[&OutcomeKind::Created], 1);
        assert_eq!(c[&OutcomeKind::Updated], 0);
        assert_eq!(r.failed(), 1);
        assert!(!r.is_success());
        assert_eq!(r.total(), 3);
    }

    #[test]
    fn not_found_alone_is_success() {
        let mut r = RunReport::new(Flow::Termination, false);
        r.outcomes.push(RowOutcome::new("A B", OutcomeKind::NotFound));
        assert!(r.is_success());
    }

    #[test]
    fn run_ids_differ() {
        assert_ne!(RunReport::new(Flow::Hire, false).run_id, RunReport::new(Flow::Hire, false).run_id);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(OutcomeKind::AlreadyDeactivated.to_string(), "ALREADY_DEACTIVATED");
        assert_eq!(OutcomeKind::NotFound.as_str(), "NOT_FOUND");
    }
}
