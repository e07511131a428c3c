//! Client health rollup from the events of the same snapshot

use panorama_common::{CheckResult, Event, HealthStatus};
use std::collections::HashMap;

/// Check results of the current events, grouped by datacenter then client,
/// in event iteration order
pub struct EventIndex<'a> {
    by_dc: HashMap<&'a str, HashMap<&'a str, Vec<&'a CheckResult>>>,
}

impl<'a> EventIndex<'a> {
    pub fn new(events: &'a [Event]) -> Self {
        let mut by_dc: HashMap<&str, HashMap<&str, Vec<&CheckResult>>> = HashMap::new();
        for event in events {
            by_dc
                .entry(event.dc.as_str())
                .or_default()
                .entry(event.client.name.as_str())
                .or_default()
                .push(&event.check);
        }
        Self { by_dc }
    }

    pub fn checks(&self, dc: &str, client: &str) -> &[&'a CheckResult] {
        self.by_dc
            .get(dc)
            .and_then(|clients| clients.get(client))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    pub status: HealthStatus,
    pub output: Option<String>,
}

/// Worst status first: critical, then warning, then unknown when only other
/// statuses matched. Output is the first check's, with a count of the rest.
pub fn rollup(checks: &[&CheckResult]) -> Rollup {
    let Some(first) = checks.first() else {
        return Rollup {
            status: HealthStatus::Ok,
            output: None,
        };
    };

    let criticals = checks.iter().filter(|check| check.status == 2).count();
    let warnings = checks.iter().filter(|check| check.status == 1).count();
    let status = if criticals > 0 {
        HealthStatus::Critical
    } else if warnings > 0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Unknown
    };

    let output = match checks.len() {
        1 => first.output.clone(),
        n => format!("{} and {} more...", first.output, n - 1),
    };

    Rollup {
        status,
        output: Some(output),
    }
}
