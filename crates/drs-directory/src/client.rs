//! HTTP-backed [`DriverDirectory`].

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::DirectoryError;
use crate::external_ids::normalize_external_ids;
use crate::retry::RetryPolicy;
use crate::transport::{HttpMethod, HttpRequest, Transport};
use crate::types::{ActivationStatus, DriverPatch, DriverRecord, NewDriver, PatchOutcome};
use crate::DriverDirectory;

const DRIVERS_PATH: &str = "/fleet/drivers";

/// Fleet directory client: transport + retry + pagination + 404 semantics.
pub struct FleetDirectory {
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
    canonical_external_ids: Vec<String>,
}

impl std::fmt::Debug for FleetDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetDirectory")
            .field("retry", &self.retry)
            .field("canonical_external_ids", &self.canonical_external_ids)
            .finish_non_exhaustive()
    }
}

impl FleetDirectory {
    pub fn new(transport: Box<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            canonical_external_ids: Vec::new(),
        }
    }

    pub fn with_canonical_external_ids(mut self, canonical: Vec<String>) -> Self {
        self.canonical_external_ids = canonical;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// One logical call with retry. A successful empty body decodes to `Null`.
    pub fn request_with_retry(&self, req: &HttpRequest) -> Result<Value, DirectoryError> {
        let op = format!("{} {}", req.method, req.path);
        self.retry.run(&op, |attempt| {
            debug!(method = req.method.as_str(), path = %req.path, attempt, "directory request");
            let resp = self.transport.send(req)?;
            if !resp.is_success() {
                return Err(DirectoryError::Http {
                    status: resp.status,
                    method: req.method.as_str(),
                    path: req.path.clone(),
                    body: resp.body,
                });
            }
            if resp.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&resp.body)
                .map_err(|e| DirectoryError::Decode(format!("{}: {e}", req.path)))
        })
    }

    fn external_id_path(namespace: &str, value: &str) -> String {
        let qualified = format!("{namespace}:{value}");
        format!("{DRIVERS_PATH}/{}", urlencoding::encode(&qualified))
    }

    fn id_path(id: &str) -> String {
        format!("{DRIVERS_PATH}/{}", urlencoding::encode(id))
    }

    fn normalized_patch(&self, patch: &DriverPatch) -> DriverPatch {
        let mut patch = patch.clone();
        if let Some(ids) = &patch.external_ids {
            patch.external_ids = Some(normalize_external_ids(ids, &self.canonical_external_ids));
        }
        patch
    }

    fn get_driver(&self, path: String) -> Result<DriverRecord, DirectoryError> {
        let v = self.request_with_retry(&HttpRequest::new(HttpMethod::Get, path))?;
        decode(unwrap_data(v))
    }
}

/// Single-object responses are either the driver itself or `{"data": driver}`.
fn unwrap_data(v: Value) -> Value {
    match v {
        Value::Object(mut map) if map.contains_key("data") && !map.contains_key("id") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode<T: DeserializeOwned>(v: Value) -> Result<T, DirectoryError> {
    serde_json::from_value(v).map_err(|e| DirectoryError::Decode(e.to_string()))
}

fn to_body<T: serde::Serialize>(v: &T) -> Result<Value, DirectoryError> {
    serde_json::to_value(v).map_err(|e| DirectoryError::Decode(format!("encode: {e}")))
}

/// Pull the drivers array and next cursor out of one listing page.
fn split_page(page: Value) -> Result<(Vec<DriverRecord>, Option<String>), DirectoryError> {
    let Value::Object(mut obj) = page else {
        return Err(DirectoryError::Decode("listing page is not an object".to_string()));
    };

    let items = obj
        .remove("drivers")
        .or_else(|| obj.remove("data"))
        .filter(|v| !v.is_null())
        .unwrap_or(Value::Array(Vec::new()));
    let drivers: Vec<DriverRecord> = decode(items)?;

    let cursor = obj.get("pagination").and_then(|p| {
        if p.get("hasNextPage").and_then(Value::as_bool) == Some(false) {
            return None;
        }
        p.get("after")
            .or_else(|| p.get("endCursor"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    });

    Ok((drivers, cursor))
}

impl DriverDirectory for FleetDirectory {
    fn list_by_status(&self, status: ActivationStatus) -> Result<Vec<DriverRecord>, DirectoryError> {
        let mut out = Vec::new();
        let mut seen_cursors = BTreeSet::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let mut req = HttpRequest::new(HttpMethod::Get, DRIVERS_PATH)
                .query("driverActivationStatus", status.as_str());
            if let Some(c) = &cursor {
                req = req.query("after", c.clone());
            }

            let (drivers, next) = split_page(self.request_with_retry(&req)?)?;
            pages += 1;
            out.extend(drivers);

            match next {
                None => break,
                Some(next) => {
                    if !seen_cursors.insert(next.clone()) {
                        return Err(DirectoryError::Decode(format!(
                            "pagination cursor repeated: {next}"
                        )));
                    }
                    cursor = Some(next);
                }
            }
        }

        info!(status = status.as_str(), drivers = out.len(), pages, "listed drivers");
        Ok(out)
    }

    fn find_by_external_id(
        &self,
        namespace: &str,
        value: &str,
    ) -> Result<Option<DriverRecord>, DirectoryError> {
        match self.get_driver(Self::external_id_path(namespace, value)) {
            Ok(d) => Ok(Some(d)),
            Err(e) if e.is_not_found() => {
                debug!(namespace, value, "no driver for external id");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn patch_by_external_id(
        &self,
        namespace: &str,
        value: &str,
        patch: &DriverPatch,
    ) -> Result<PatchOutcome, DirectoryError> {
        let req = HttpRequest::new(HttpMethod::Patch, Self::external_id_path(namespace, value))
            .body(to_body(&self.normalized_patch(patch))?);
        match self.request_with_retry(&req) {
            Ok(_) => Ok(PatchOutcome::Applied),
            Err(e) if e.is_not_found() => Ok(PatchOutcome::NotFound),
            Err(e) => Err(e),
        }
    }

    fn patch_by_id(&self, id: &str, patch: &DriverPatch) -> Result<(), DirectoryError> {
        let req = HttpRequest::new(HttpMethod::Patch, Self::id_path(id))
            .body(to_body(&self.normalized_patch(patch))?);
        self.request_with_retry(&req).map(|_| ())
    }

    fn create(&self, driver: &NewDriver) -> Result<Option<DriverRecord>, DirectoryError> {
        let mut driver = driver.clone();
        driver.external_ids = normalize_external_ids(&driver.external_ids, &self.canonical_external_ids);

        let req = HttpRequest::new(HttpMethod::Post, DRIVERS_PATH).body(to_body(&driver)?);
        let v = unwrap_data(self.request_with_retry(&req)?);
        // Some deployments answer 204/empty; the created record is optional.
        if v.is_null() {
            return Ok(None);
        }
        match decode(v) {
            Ok(d) => Ok(Some(d)),
            Err(e) => {
                debug!(error = %e, "created driver echo did not decode");
                Ok(None)
            }
        }
    }

    fn add_external_id(&self, id: &str, namespace: &str, value: &str) -> Result<(), DirectoryError> {
        let current = self.get_driver(Self::id_path(id))?;
        let mut ids: BTreeMap<String, String> = current.external_ids;
        ids.insert(namespace.to_string(), value.to_string());

        self.patch_by_id(id, &DriverPatch::external_ids(ids))?;
        info!(driver_id = id, namespace, value, "external id attached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn external_id_path_percent_encodes_colon_and_spaces() {
        assert_eq!(
            FleetDirectory::external_id_path("paycomname", "John-Smith_01-15-2024"),
            "/fleet/drivers/paycomname%3AJohn-Smith_01-15-2024"
        );
        assert_eq!(
            FleetDirectory::external_id_path("ns", "a b/c"),
            "/fleet/drivers/ns%3Aa%20b%2Fc"
        );
    }

    #[test]
    fn unwrap_data_only_unwraps_envelopes() {
        assert_eq!(unwrap_data(json!({"data": {"id": "1"}})), json!({"id": "1"}));
        assert_eq!(unwrap_data(json!({"id": "1", "data": 3})), json!({"id": "1", "data": 3}));
        assert_eq!(unwrap_data(Value::Null), Value::Null);
    }

    #[test]
    fn split_page_reads_cursor_variants() {
        let (d, c) = split_page(json!({
            "drivers": [{"id": "1", "name": "A"}],
            "pagination": {"after": "c1"}
        }))
        .unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(c.as_deref(), Some("c1"));

        let (_, c) = split_page(json!({
            "data": [],
            "pagination": {"endCursor": "x", "hasNextPage": false}
        }))
        .unwrap();
        assert_eq!(c, None);

        let (_, c) = split_page(json!({"drivers": [], "pagination": {"after": ""}})).unwrap();
        assert_eq!(c, None);

        assert!(split_page(json!([])).is_err());
    }
}
