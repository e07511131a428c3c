//! Entity records pulled from the monitoring APIs.
//!
//! Every record is strongly typed for the attributes the dashboard reads and
//! keeps everything else in a flattened `extra` map, so that a record handed
//! back to the front end carries the full upstream payload. Records are
//! tagged with their owning datacenter (`dc`) at the pool boundary and gain a
//! composite identity (`_id`) during correlation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped attributes attached to a record
pub type Attributes = Map<String, Value>;

/// Attribute injected into every raw record to name its datacenter
pub const DC_FIELD: &str = "dc";

/// Separator between datacenter and natural key for most collections
pub const ID_SEPARATOR: &str = "/";

/// Separator used for silence entries, matching their `subscription:check` ids
pub const SILENCE_ID_SEPARATOR: &str = ":";

/// Build a composite identifier from a datacenter and a natural key
pub fn composite_id(dc: &str, separator: &str, key: &str) -> String {
    format!("{dc}{separator}{key}")
}

/// Stamp a raw JSON object with its datacenter.
/// Returns false when the value is not an object and could not be tagged.
pub fn tag_datacenter(value: &mut Value, dc: &str) -> bool {
    match value.as_object_mut() {
        Some(object) => {
            object.insert(DC_FIELD.to_string(), Value::String(dc.to_string()));
            true
        }
        None => false,
    }
}

/// Records which can be given a composite identity
pub trait Correlated {
    /// Owning datacenter
    fn dc(&self) -> &str;

    /// Natural key: `name`, else `id`, else `path`
    fn natural_key(&self) -> Option<&str>;

    fn composite_id(&self) -> Option<&str>;

    fn set_composite_id(&mut self, id: String);
}

/// Required-field validation applied when a record crosses the pool boundary
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn non_empty(value: &str, field: &str) -> Result<(), String> {
    if value.is_empty() {
        Err(format!("missing {field}"))
    } else {
        Ok(())
    }
}

fn str_attr<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Rolled-up health of a client, serialized as its numeric code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HealthStatus {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl From<HealthStatus> for u8 {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Ok => 0,
            HealthStatus::Warning => 1,
            HealthStatus::Critical => 2,
            HealthStatus::Unknown => 3,
        }
    }
}

impl TryFrom<u8> for HealthStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(HealthStatus::Ok),
            1 => Ok(HealthStatus::Warning),
            2 => Ok(HealthStatus::Critical),
            3 => Ok(HealthStatus::Unknown),
            other => Err(format!("invalid health status {other}")),
        }
    }
}

/// A monitored host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,

    pub dc: String,

    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub composite_id: Option<String>,

    #[serde(default)]
    pub subscriptions: Vec<String>,

    #[serde(default)]
    pub status: HealthStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default)]
    pub silenced: bool,

    #[serde(default)]
    pub silenced_by: Vec<String>,

    #[serde(flatten)]
    pub extra: Attributes,
}

impl Correlated for Client {
    fn dc(&self) -> &str {
        &self.dc
    }

    fn natural_key(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|name| !name.is_empty())
    }

    fn composite_id(&self) -> Option<&str> {
        self.composite_id.as_deref()
    }

    fn set_composite_id(&mut self, id: String) {
        self.composite_id = Some(id);
    }
}

impl Validate for Client {
    fn validate(&self) -> Result<(), String> {
        non_empty(&self.name, "client name")
    }
}

/// Client sub-record nested in an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventClient {
    pub name: String,

    #[serde(default)]
    pub subscriptions: Vec<String>,

    #[serde(default)]
    pub silenced: bool,

    #[serde(flatten)]
    pub extra: Attributes,
}

/// Result of one check execution, as nested in events and client history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,

    /// Exit status: 0 ok, 1 warning, 2 critical, anything else unknown
    #[serde(default)]
    pub status: i64,

    #[serde(default)]
    pub output: String,

    #[serde(default)]
    pub subscribers: Vec<String>,

    #[serde(flatten)]
    pub extra: Attributes,
}

/// An active problem reported for a check on a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub dc: String,

    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub composite_id: Option<String>,

    pub client: EventClient,

    pub check: CheckResult,

    #[serde(default)]
    pub silenced: bool,

    #[serde(default)]
    pub silenced_by: Vec<String>,

    #[serde(flatten)]
    pub extra: Attributes,
}

impl Validate for Event {
    fn validate(&self) -> Result<(), String> {
        non_empty(&self.client.name, "event client name")?;
        non_empty(&self.check.name, "event check name")
    }
}

/// A silencing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Silence {
    pub dc: String,

    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub composite_id: Option<String>,

    /// Upstream identifier, `<subscription|*>:<check|*>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    /// Remaining seconds; absent or negative means never
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<i64>,

    #[serde(default)]
    pub expire_on_resolve: bool,

    /// Unix timestamp from which a scheduled silence applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<i64>,

    #[serde(flatten)]
    pub extra: Attributes,
}

impl Silence {
    /// Upstream id, derived from subscription and check when the API omitted it
    pub fn effective_id(&self) -> Option<String> {
        if let Some(id) = self.id.as_ref().filter(|id| !id.is_empty()) {
            return Some(id.clone());
        }
        match (self.subscription.as_deref(), self.check.as_deref()) {
            (None, None) => None,
            (subscription, check) => Some(format!(
                "{}:{}",
                subscription.unwrap_or("*"),
                check.unwrap_or("*")
            )),
        }
    }
}

impl Correlated for Silence {
    fn dc(&self) -> &str {
        &self.dc
    }

    fn natural_key(&self) -> Option<&str> {
        str_attr(&self.extra, "name")
            .or_else(|| self.id.as_deref().filter(|id| !id.is_empty()))
            .or_else(|| str_attr(&self.extra, "path"))
    }

    fn composite_id(&self) -> Option<&str> {
        self.composite_id.as_deref()
    }

    fn set_composite_id(&mut self, id: String) {
        self.composite_id = Some(id);
    }
}

impl Validate for Silence {
    fn validate(&self) -> Result<(), String> {
        if self.subscription.is_none() && self.check.is_none() && self.id.is_none() {
            return Err("silence has neither subscription nor check".to_string());
        }
        Ok(())
    }
}

/// Generic record for checks, aggregates and stashes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub dc: String,

    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub composite_id: Option<String>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Record {
    pub fn str_attr(&self, key: &str) -> Option<&str> {
        str_attr(&self.attributes, key)
    }

    pub fn name(&self) -> Option<&str> {
        self.str_attr("name")
    }
}

impl Correlated for Record {
    fn dc(&self) -> &str {
        &self.dc
    }

    fn natural_key(&self) -> Option<&str> {
        self.str_attr("name").or_else(|| self.str_attr("id")).or_else(|| self.str_attr("path"))
    }

    fn composite_id(&self) -> Option<&str> {
        self.composite_id.as_deref()
    }

    fn set_composite_id(&mut self, id: String) {
        self.composite_id = Some(id);
    }
}

impl Validate for Record {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// One check's recent history on a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub check: String,

    #[serde(default)]
    pub client: String,

    #[serde(default)]
    pub dc: String,

    #[serde(default)]
    pub history: Vec<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<CheckResult>,

    #[serde(default)]
    pub silenced: bool,

    #[serde(default)]
    pub silenced_by: Vec<String>,

    #[serde(flatten)]
    pub extra: Attributes,
}

impl Validate for HistoryEntry {
    fn validate(&self) -> Result<(), String> {
        non_empty(&self.check, "history check name")
    }
}

fn never_expires(expire: &Option<i64>) -> bool {
    expire.is_none_or(|seconds| seconds <= 0)
}

/// Payload used to create or clear a silence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SilenceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Target datacenter; routing only, never sent upstream
    #[serde(default, skip_serializing)]
    pub dc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    /// Seconds until expiry, 0 for never
    #[serde(default, skip_serializing_if = "never_expires")]
    pub expire: Option<i64>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expire_on_resolve: bool,
}

impl SilenceSpec {
    /// A silence must target a subscription, a check, or an existing id
    pub fn is_targeted(&self) -> bool {
        self.subscription.is_some() || self.check.is_some() || self.id.is_some()
    }
}

/// Payload requesting an ad-hoc check execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckExecution {
    pub check: String,

    /// Target datacenter; routing only, never sent upstream
    #[serde(default, skip_serializing)]
    pub dc: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_keeps_unknown_attributes() {
        let client: Client = serde_json::from_value(json!({
            "name": "web01",
            "dc": "east",
            "address": "10.0.0.1",
            "subscriptions": ["linux"],
            "timestamp": 1500000000
        }))
        .unwrap();

        assert_eq!(client.name, "web01");
        assert_eq!(client.subscriptions, vec!["linux".to_string()]);
        assert_eq!(client.status, HealthStatus::Ok);
        assert_eq!(client.extra.get("address"), Some(&json!("10.0.0.1")));

        let value = serde_json::to_value(&client).unwrap();
        assert_eq!(value["address"], json!("10.0.0.1"));
        assert_eq!(value["status"], json!(0));
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn test_health_status_is_numeric() {
        assert_eq!(serde_json::to_value(HealthStatus::Critical).unwrap(), json!(2));
        let status: HealthStatus = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(status, HealthStatus::Unknown);
        assert!(serde_json::from_value::<HealthStatus>(json!(7)).is_err());
    }

    #[test]
    fn test_event_raw_id_stays_in_extra() {
        let mut event: Event = serde_json::from_value(json!({
            "id": "4b1d2e0f",
            "dc": "east",
            "client": { "name": "web01" },
            "check": { "name": "disk", "status": 2, "output": "full" }
        }))
        .unwrap();
        event.composite_id = Some("east/web01/disk".to_string());

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], json!("4b1d2e0f"));
        assert_eq!(value["_id"], json!("east/web01/disk"));
    }

    #[test]
    fn test_event_without_check_name_is_invalid() {
        let event: Event = serde_json::from_value(json!({
            "dc": "east",
            "client": { "name": "web01" },
            "check": { "name": "" }
        }))
        .unwrap();
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_record_natural_key_priority() {
        let named: Record =
            serde_json::from_value(json!({ "dc": "east", "name": "a", "id": "b" })).unwrap();
        assert_eq!(named.natural_key(), Some("a"));

        let stash: Record =
            serde_json::from_value(json!({ "dc": "east", "path": "/silence/x" })).unwrap();
        assert_eq!(stash.natural_key(), Some("/silence/x"));

        let anonymous: Record = serde_json::from_value(json!({ "dc": "east" })).unwrap();
        assert_eq!(anonymous.natural_key(), None);
    }

    #[test]
    fn test_silence_effective_id() {
        let silence: Silence = serde_json::from_value(json!({
            "dc": "east",
            "subscription": "linux"
        }))
        .unwrap();
        assert_eq!(silence.effective_id(), Some("linux:*".to_string()));
        assert!(silence.validate().is_ok());
    }

    #[test]
    fn test_tag_datacenter_overwrites() {
        let mut value = json!({ "name": "web01", "dc": "stale" });
        assert!(tag_datacenter(&mut value, "east"));
        assert_eq!(value["dc"], json!("east"));
        assert!(!tag_datacenter(&mut json!(["not", "an", "object"]), "east"));
    }

    #[test]
    fn test_silence_spec_payload() {
        let spec = SilenceSpec {
            dc: "east".to_string(),
            subscription: Some("client:web01".to_string()),
            expire: Some(0),
            ..Default::default()
        };
        assert!(spec.is_targeted());
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({ "subscription": "client:web01" })
        );

        let timed = SilenceSpec {
            check: Some("disk".to_string()),
            expire: Some(3600),
            expire_on_resolve: true,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&timed).unwrap(),
            json!({ "check": "disk", "expire": 3600, "expire_on_resolve": true })
        );
    }
}
