use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use drs_directory::{
    ActivationStatus, DirectoryError, DriverDirectory, DriverPatch, DriverRecord, NewDriver,
    PatchOutcome,
};

/// Build a driver record with no username, notes, ids or tags.
pub fn driver(id: &str, name: &str, status: ActivationStatus) -> DriverRecord {
    DriverRecord {
        id: id.to_string(),
        name: name.to_string(),
        username: None,
        status,
        external_ids: BTreeMap::new(),
        notes: None,
        tag_ids: Vec::new(),
    }
}

/// Every call the fake received, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectoryCall {
    ListByStatus(ActivationStatus),
    FindByExternalId {
        namespace: String,
        value: String,
    },
    PatchByExternalId {
        namespace: String,
        value: String,
        patch: DriverPatch,
    },
    PatchById {
        id: String,
        patch: DriverPatch,
    },
    Create(NewDriver),
    AddExternalId {
        id: String,
        namespace: String,
        value: String,
    },
}

impl DirectoryCall {
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            DirectoryCall::ListByStatus(_) | DirectoryCall::FindByExternalId { .. }
        )
    }
}

/// Operation selector for failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FakeOp {
    List,
    Find,
    PatchByExternalId,
    PatchById,
    Create,
    AddExternalId,
}

#[derive(Default)]
struct State {
    drivers: Vec<DriverRecord>,
    calls: Vec<DirectoryCall>,
    failures: BTreeMap<FakeOp, VecDeque<DirectoryError>>,
    next_id: u64,
}

impl State {
    fn take_failure(&mut self, op: FakeOp) -> Result<(), DirectoryError> {
        match self.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn by_external_id(&mut self, namespace: &str, value: &str) -> Option<&mut DriverRecord> {
        self.drivers
            .iter_mut()
            .find(|d| d.external_ids.get(namespace).map(|s| s.as_str()) == Some(value))
    }
}

fn apply(d: &mut DriverRecord, patch: &DriverPatch) {
    if let Some(s) = patch.status {
        d.status = s;
    }
    if let Some(n) = &patch.notes {
        d.notes = Some(n.clone());
    }
    if let Some(t) = &patch.tag_ids {
        d.tag_ids = t.clone();
    }
    if let Some(ids) = &patch.external_ids {
        d.external_ids = ids.clone();
    }
}

/// In-memory directory. Semantics follow the HTTP client: external-id misses
/// are `None`/`NotFound`, id-addressed misses are 404 errors.
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<State>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drivers(drivers: impl IntoIterator<Item = DriverRecord>) -> Self {
        let fake = Self::new();
        for d in drivers {
            fake.insert(d);
        }
        fake
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn insert(&self, d: DriverRecord) {
        self.lock().drivers.push(d);
    }

    /// Queue an error returned by the next call of kind `op`. The call is
    /// still logged.
    pub fn fail_next(&self, op: FakeOp, err: DirectoryError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    pub fn drivers(&self) -> Vec<DriverRecord> {
        self.lock().drivers.clone()
    }

    pub fn get(&self, id: &str) -> Option<DriverRecord> {
        self.lock().drivers.iter().find(|d| d.id == id).cloned()
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.lock().calls.clone()
    }

    pub fn write_calls(&self) -> Vec<DirectoryCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    pub fn created(&self) -> Vec<NewDriver> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DirectoryCall::Create(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl DriverDirectory for FakeDirectory {
    fn list_by_status(&self, status: ActivationStatus) -> Result<Vec<DriverRecord>, DirectoryError> {
        let mut s = self.lock();
        s.calls.push(DirectoryCall::ListByStatus(status));
        s.take_failure(FakeOp::List)?;
        Ok(s.drivers.iter().filter(|d| d.status == status).cloned().collect())
    }

    fn find_by_external_id(
        &self,
        namespace: &str,
        value: &str,
    ) -> Result<Option<DriverRecord>, DirectoryError> {
        let mut s = self.lock();
        s.calls.push(DirectoryCall::FindByExternalId {
            namespace: namespace.to_string(),
            value: value.to_string(),
        });
        s.take_failure(FakeOp::Find)?;
        Ok(s.by_external_id(namespace, value).map(|d| d.clone()))
    }

    fn patch_by_external_id(
        &self,
        namespace: &str,
        value: &str,
        patch: &DriverPatch,
    ) -> Result<PatchOutcome, DirectoryError> {
        let mut s = self.lock();
        s.calls.push(DirectoryCall::PatchByExternalId {
            namespace: namespace.to_string(),
            value: value.to_string(),
            patch: patch.clone(),
        });
        s.take_failure(FakeOp::PatchByExternalId)?;
        match s.by_external_id(namespace, value) {
            Some(d) => {
                apply(d, patch);
                Ok(PatchOutcome::Applied)
            }
            None => Ok(PatchOutcome::NotFound),
        }
    }

    fn patch_by_id(&self, id: &str, patch: &DriverPatch) -> Result<(), DirectoryError> {
        let mut s = self.lock();
        s.calls.push(DirectoryCall::PatchById {
            id: id.to_string(),
            patch: patch.clone(),
        });
        s.take_failure(FakeOp::PatchById)?;
        match s.drivers.iter_mut().find(|d| d.id == id) {
            Some(d) => {
                apply(d, patch);
                Ok(())
            }
            None => Err(crate::http_error(404, "PATCH", &format!("/fleet/drivers/{id}"))),
        }
    }

    fn create(&self, new: &NewDriver) -> Result<Option<DriverRecord>, DirectoryError> {
        let mut s = self.lock();
        s.calls.push(DirectoryCall::Create(new.clone()));
        s.take_failure(FakeOp::Create)?;
        s.next_id += 1;
        let rec = DriverRecord {
            id: format!("fake-{}", s.next_id),
            name: new.name.clone(),
            username: Some(new.username.clone()),
            status: ActivationStatus::Active,
            external_ids: new.external_ids.clone(),
            notes: Some(new.notes.clone()),
            tag_ids: new.tag_ids.clone(),
        };
        s.drivers.push(rec.clone());
        Ok(Some(rec))
    }

    fn add_external_id(&self, id: &str, namespace: &str, value: &str) -> Result<(), DirectoryError> {
        let mut s = self.lock();
        s.calls.push(DirectoryCall::AddExternalId {
            id: id.to_string(),
            namespace: namespace.to_string(),
            value: value.to_string(),
        });
        s.take_failure(FakeOp::AddExternalId)?;
        match s.drivers.iter_mut().find(|d| d.id == id) {
            Some(d) => {
                d.external_ids
                    .insert(namespace.to_string(), value.to_string());
                Ok(())
            }
            None => Err(crate::http_error(404, "GET", &format!("/fleet/drivers/{id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_lookup_and_patch() {
        let mut d = driver("1", "John Smith", ActivationStatus::Active);
        d.external_ids.insert("paycomname".into(), "K".into());
        let fake = FakeDirectory::with_drivers([d]);

        assert!(fake.find_by_external_id("paycomname", "K").unwrap().is_some());
        assert!(fake.find_by_external_id("paycomname", "nope").unwrap().is_none());

        let p = DriverPatch::status_change(ActivationStatus::Deactivated, "x");
        assert_eq!(
            fake.patch_by_external_id("paycomname", "K", &p).unwrap(),
            PatchOutcome::Applied
        );
        assert_eq!(fake.get("1").unwrap().status, ActivationStatus::Deactivated);
        assert_eq!(fake.write_calls().len(), 1);
    }

    #[test]
    fn injected_failure_fires_once() {
        let fake = FakeDirectory::new();
        fake.fail_next(FakeOp::List, DirectoryError::Transport("down".into()));
        assert!(fake.list_by_status(ActivationStatus::Active).is_err());
        assert!(fake.list_by_status(ActivationStatus::Active).is_ok());
        assert_eq!(fake.calls().len(), 2);
    }
}
