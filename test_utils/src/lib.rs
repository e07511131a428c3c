//! Entity fixtures shared by the Panorama test suites.

use panorama_common::{
    Attributes, CheckResult, Client, Event, EventClient, HealthStatus, Record, Silence,
};
use serde_json::Value;

pub fn client(dc: &str, name: &str) -> Client {
    Client {
        name: name.to_string(),
        dc: dc.to_string(),
        composite_id: None,
        subscriptions: Vec::new(),
        status: HealthStatus::Ok,
        output: None,
        silenced: false,
        silenced_by: Vec::new(),
        extra: Attributes::new(),
    }
}

pub fn check_result(name: &str, status: i64, output: &str) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        status,
        output: output.to_string(),
        subscribers: Vec::new(),
        extra: Attributes::new(),
    }
}

pub fn event(dc: &str, client: &str, check: CheckResult) -> Event {
    Event {
        dc: dc.to_string(),
        composite_id: None,
        client: EventClient {
            name: client.to_string(),
            subscriptions: Vec::new(),
            silenced: false,
            extra: Attributes::new(),
        },
        check,
        silenced: false,
        silenced_by: Vec::new(),
        extra: Attributes::new(),
    }
}

pub fn silence(dc: &str, id: &str) -> Silence {
    let (subscription, check) = id.rsplit_once(':').unwrap_or((id, "*"));
    Silence {
        dc: dc.to_string(),
        composite_id: None,
        id: Some(id.to_string()),
        subscription: Some(subscription.to_string()),
        check: Some(check.to_string()),
        reason: None,
        creator: None,
        expire: None,
        expire_on_resolve: false,
        begin: None,
        extra: Attributes::new(),
    }
}

/// Record built from a JSON object; anything else gives an empty record
pub fn record(dc: &str, attributes: Value) -> Record {
    Record {
        dc: dc.to_string(),
        composite_id: None,
        attributes: match attributes {
            Value::Object(map) => map,
            _ => Attributes::new(),
        },
    }
}
