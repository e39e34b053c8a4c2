use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Driver activation status as the fleet API spells it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    #[default]
    Active,
    Deactivated,
}

impl ActivationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationStatus::Active => "active",
            ActivationStatus::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote driver as returned by the directory. Owned by the fleet platform;
/// this process only ever holds a read view of it for the current run.
///
/// Unknown fields are ignored so API additions do not break decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(
        rename = "driverActivationStatus",
        default,
        deserialize_with = "null_as_default"
    )]
    pub status: ActivationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tag_ids: Vec<String>,
}

impl DriverRecord {
    pub fn is_active(&self) -> bool {
        self.status == ActivationStatus::Active
    }

    pub fn external_id(&self, namespace: &str) -> Option<&str> {
        self.external_ids.get(namespace).map(|s| s.as_str())
    }
}

/// Explicit `null` decodes like an absent field.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        N(u64),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::S(s) => s,
        Raw::N(n) => n.to_string(),
    })
}

/// Partial update. The API replaces each present field wholesale, so
/// `external_ids` must carry the complete merged map, not a delta.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPatch {
    #[serde(rename = "driverActivationStatus", skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_group_tag_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ids: Option<BTreeMap<String, String>>,
}

impl DriverPatch {
    pub fn status_change(status: ActivationStatus, notes: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            notes: Some(notes.into()),
            ..Self::default()
        }
    }

    pub fn external_ids(ids: BTreeMap<String, String>) -> Self {
        Self {
            external_ids: Some(ids),
            ..Self::default()
        }
    }
}

/// Create-driver payload. Must carry the identity namespace in
/// `external_ids` so later runs can address the driver by key.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDriver {
    pub external_ids: BTreeMap<String, String>,
    pub name: String,
    pub username: String,
    pub password: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub license_state: String,
    pub eld_exempt: bool,
    pub eld_exempt_reason: String,
    pub locale: String,
    pub timezone: String,
    pub tag_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_group_tag_id: Option<String>,
}

impl fmt::Debug for NewDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewDriver")
            .field("external_ids", &self.external_ids)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("notes", &self.notes)
            .field("phone", &self.phone)
            .field("license_state", &self.license_state)
            .field("eld_exempt", &self.eld_exempt)
            .field("eld_exempt_reason", &self.eld_exempt_reason)
            .field("locale", &self.locale)
            .field("timezone", &self.timezone)
            .field("tag_ids", &self.tag_ids)
            .field("peer_group_tag_id", &self.peer_group_tag_id)
            .finish()
    }
}

/// Result of a patch addressed by external id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn driver_decodes_with_defaults_and_numeric_id() {
        let d: DriverRecord = serde_json::from_value(json!({
            "id": 12345,
            "name": "John Smith",
            "unknownField": true
        }))
        .unwrap();
        assert_eq!(d.id, "12345");
        assert_eq!(d.status, ActivationStatus::Active);
        assert!(d.external_ids.is_empty());
        assert!(d.tag_ids.is_empty());
        assert_eq!(d.username, None);
    }

    #[test]
    fn driver_decodes_explicit_nulls_as_defaults() {
        let d: DriverRecord = serde_json::from_value(json!({
            "id": "1",
            "name": null,
            "driverActivationStatus": null,
            "externalIds": null,
            "notes": null,
            "tagIds": null
        }))
        .unwrap();
        assert_eq!(d.name, "");
        assert_eq!(d.status, ActivationStatus::Active);
        assert!(d.external_ids.is_empty());
        assert!(d.tag_ids.is_empty());
        assert_eq!(d.notes, None);
    }

    #[test]
    fn driver_decodes_full_shape() {
        let d: DriverRecord = serde_json::from_value(json!({
            "id": "d-1",
            "name": "Ana Cruz",
            "username": "acruz",
            "driverActivationStatus": "deactivated",
            "externalIds": {"paycomname": "Ana-Cruz_02-01-2023"},
            "notes": "Hire Date: 02-01-2023",
            "tagIds": ["100", "200"]
        }))
        .unwrap();
        assert!(!d.is_active());
        assert_eq!(d.external_id("paycomname"), Some("Ana-Cruz_02-01-2023"));
        assert_eq!(d.tag_ids, vec!["100", "200"]);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let p = DriverPatch::status_change(ActivationStatus::Deactivated, "Terminated: 03-01-2024");
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!({"driverActivationStatus": "deactivated", "notes": "Terminated: 03-01-2024"})
        );
        assert_eq!(serde_json::to_value(DriverPatch::default()).unwrap(), json!({}));
    }

    #[test]
    fn new_driver_debug_redacts_password() {
        let d = NewDriver {
            external_ids: BTreeMap::new(),
            name: "John Smith".into(),
            username: "jsmith".into(),
            password: "hunter2-secret".into(),
            notes: String::new(),
            phone: None,
            license_state: "TX".into(),
            eld_exempt: true,
            eld_exempt_reason: "Short Haul".into(),
            locale: "us".into(),
            timezone: "America/Chicago".into(),
            tag_ids: vec![],
            peer_group_tag_id: None,
        };
        let dbg = format!("{d:?}");
        assert!(!dbg.contains("hunter2-secret"));
        assert!(dbg.contains("<REDACTED>"));

        let wire = serde_json::to_value(&d).unwrap();
        assert_eq!(wire["password"], "hunter2-secret");
        assert_eq!(wire["eldExemptReason"], "Short Haul");
        assert!(wire.get("phone").is_none());
    }
}
