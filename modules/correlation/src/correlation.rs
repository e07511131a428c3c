//! Panorama correlation module.
//!
//! Turns the raw collections pulled from every datacenter into one
//! cross-referenced model: composite identities, client health rolled up
//! from events, and silencing annotations on clients and events. This is a
//! pure transformation; it performs no I/O.

mod identity;
mod model;
mod rollup;

pub use identity::event_id;
pub use model::{CorrelatedModel, DatacenterPull, DatacenterStatus, EntityCounts, RawCollections};
pub use rollup::{rollup, Rollup};

use identity::assign_ids;
use panorama_common::{
    Client, Correlated, Event, Silence, SilencingPredicate, ID_SEPARATOR, SILENCE_ID_SEPARATOR,
};
use rollup::EventIndex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Stamp the pulled datacenter on entities which lost it
macro_rules! stamp {
    ($items:expr, $dc:expr) => {
        for item in $items.iter_mut() {
            if item.dc.is_empty() {
                item.dc = $dc.to_string();
            }
        }
    };
}

/// Build the correlated model from one pull per datacenter
pub fn correlate(pulls: Vec<DatacenterPull>, silencing: &dyn SilencingPredicate) -> CorrelatedModel {
    let mut merged = RawCollections::default();
    let mut datacenters = Vec::with_capacity(pulls.len());

    for pull in pulls {
        match pull.outcome {
            Ok(mut raw) => {
                stamp!(raw.clients, pull.name);
                stamp!(raw.checks, pull.name);
                stamp!(raw.events, pull.name);
                stamp!(raw.aggregates, pull.name);
                stamp!(raw.silences, pull.name);
                stamp!(raw.stashes, pull.name);

                merged.clients.append(&mut raw.clients);
                merged.checks.append(&mut raw.checks);
                merged.events.append(&mut raw.events);
                merged.aggregates.append(&mut raw.aggregates);
                merged.silences.append(&mut raw.silences);
                merged.stashes.append(&mut raw.stashes);

                datacenters.push(DatacenterStatus {
                    name: pull.name,
                    reachable: true,
                    error: None,
                    info: raw.info,
                    counts: EntityCounts::default(),
                });
            }
            Err(error) => {
                warn!(datacenter = %pull.name, error = %error, "Datacenter left out of snapshot");
                datacenters.push(DatacenterStatus {
                    name: pull.name,
                    reachable: false,
                    error: Some(error),
                    info: Default::default(),
                    counts: EntityCounts::default(),
                });
            }
        }
    }

    let silences = assign_ids("silenced", SILENCE_ID_SEPARATOR, merged.silences);
    let checks = assign_ids("checks", ID_SEPARATOR, merged.checks);
    let aggregates = assign_ids("aggregates", ID_SEPARATOR, merged.aggregates);
    let stashes = assign_ids("stashes", ID_SEPARATOR, merged.stashes);
    let events = build_events(merged.events, &silences, silencing);
    let clients = build_clients(merged.clients, &events, &silences, silencing);

    for status in datacenters.iter_mut().filter(|dc| dc.reachable) {
        let name = status.name.as_str();
        status.counts = EntityCounts {
            clients: count(&clients, name),
            checks: count(&checks, name),
            events: events.iter().filter(|e| e.dc == name).count(),
            silences: count(&silences, name),
            aggregates: count(&aggregates, name),
            stashes: count(&stashes, name),
        };
    }

    debug!(
        clients = clients.len(),
        events = events.len(),
        silences = silences.len(),
        "Correlated {} datacenter(s)",
        datacenters.len()
    );

    CorrelatedModel {
        clients,
        checks,
        events,
        aggregates,
        silences,
        stashes,
        datacenters,
    }
}

fn count<T: Correlated>(items: &[T], dc: &str) -> usize {
    items.iter().filter(|item| item.dc() == dc).count()
}

fn build_events(
    events: Vec<Event>,
    silences: &[Silence],
    silencing: &dyn SilencingPredicate,
) -> Vec<Event> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter_map(|mut event| {
            let id = event_id(&event);
            if !seen.insert(id.clone()) {
                warn!(collection = "events", id = %id, "Skipping duplicate entity");
                return None;
            }

            event.client.silenced =
                silencing.client_silenced(&event.client.name, &event.dc, silences).silenced;
            let check =
                silencing.check_silenced(&event.check, &event.client.name, &event.dc, silences);
            event.silenced = check.silenced;
            event.silenced_by = check.silenced_by;
            event.composite_id = Some(id);
            Some(event)
        })
        .collect()
}

fn build_clients(
    clients: Vec<Client>,
    events: &[Event],
    silences: &[Silence],
    silencing: &dyn SilencingPredicate,
) -> Vec<Client> {
    let index = EventIndex::new(events);
    let mut clients = assign_ids("clients", ID_SEPARATOR, clients);
    for client in &mut clients {
        let health = rollup(index.checks(&client.dc, &client.name));
        client.status = health.status;
        client.output = health.output;

        let silenced = silencing.client_silenced(&client.name, &client.dc, silences);
        client.silenced = silenced.silenced;
        client.silenced_by = silenced.silenced_by;
    }
    clients
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_common::{HealthStatus, SubscriptionSilencing};
    use panorama_test_utils::{check_result, client, event, record, silence};
    use serde_json::json;

    fn east() -> RawCollections {
        let mut disk = check_result("disk", 2, "disk full");
        disk.subscribers = vec!["linux".to_string()];
        RawCollections {
            clients: vec![client("east", "web01"), client("east", "web02"), client("", "db01")],
            checks: vec![record("east", json!({ "name": "disk" }))],
            events: vec![
                event("east", "web01", disk),
                event("east", "web01", check_result("load", 1, "load high")),
                event("east", "db01", check_result("ntp", 3, "no reply")),
            ],
            aggregates: vec![record("east", json!({ "name": "web" }))],
            silences: vec![silence("east", "linux:disk"), silence("east", "client:web02:*")],
            stashes: vec![record("east", json!({ "path": "silence/web01" }))],
            info: json!({ "sensu": { "version": "1.4" } }).as_object().cloned().unwrap(),
        }
    }

    fn west() -> RawCollections {
        RawCollections {
            clients: vec![client("west", "web01")],
            events: vec![event("west", "web01", check_result("disk", 1, "disk almost full"))],
            silences: vec![silence("west", "client:web01:*")],
            ..Default::default()
        }
    }

    fn model() -> CorrelatedModel {
        correlate(
            vec![DatacenterPull::reachable("east", east()), DatacenterPull::reachable("west", west())],
            &SubscriptionSilencing::new(),
        )
    }

    fn find<'a>(model: &'a CorrelatedModel, id: &str) -> &'a Client {
        model
            .clients
            .iter()
            .find(|c| c.composite_id.as_deref() == Some(id))
            .unwrap()
    }

    #[test]
    fn test_identities_assigned() {
        let model = model();
        let ids: Vec<_> = model.clients.iter().map(|c| c.composite_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["east/web01", "east/web02", "east/db01", "west/web01"]);
        assert_eq!(model.checks[0].composite_id.as_deref(), Some("east/disk"));
        assert_eq!(model.aggregates[0].composite_id.as_deref(), Some("east/web"));
        assert_eq!(model.stashes[0].composite_id.as_deref(), Some("east/silence/web01"));
        assert_eq!(model.silences[0].composite_id.as_deref(), Some("east:linux:disk"));
        assert_eq!(model.events[0].composite_id.as_deref(), Some("east/web01/disk"));
    }

    #[test]
    fn test_health_rolled_up_per_datacenter() {
        let model = model();

        let web01 = find(&model, "east/web01");
        assert_eq!(web01.status, HealthStatus::Critical);
        assert_eq!(web01.output.as_deref(), Some("disk full and 1 more..."));

        let web02 = find(&model, "east/web02");
        assert_eq!(web02.status, HealthStatus::Ok);
        assert_eq!(web02.output, None);

        assert_eq!(find(&model, "east/db01").status, HealthStatus::Unknown);

        let west = find(&model, "west/web01");
        assert_eq!(west.status, HealthStatus::Warning);
        assert_eq!(west.output.as_deref(), Some("disk almost full"));
    }

    #[test]
    fn test_silencing_annotations() {
        let model = model();

        let web02 = find(&model, "east/web02");
        assert!(web02.silenced);
        assert_eq!(web02.silenced_by, vec!["client:web02:*".to_string()]);
        assert!(!find(&model, "east/web01").silenced);
        assert!(find(&model, "west/web01").silenced);

        let disk = &model.events[0];
        assert!(disk.silenced);
        assert_eq!(disk.silenced_by, vec!["linux:disk".to_string()]);
        assert!(!disk.client.silenced);

        let west_disk = model
            .events
            .iter()
            .find(|e| e.composite_id.as_deref() == Some("west/web01/disk"))
            .unwrap();
        assert!(west_disk.client.silenced);
        assert!(west_disk.silenced);
        assert_eq!(west_disk.silenced_by, vec!["client:web01:*".to_string()]);
    }

    #[test]
    fn test_unreachable_datacenter_contributes_nothing() {
        let model = correlate(
            vec![
                DatacenterPull::reachable("east", east()),
                DatacenterPull::unreachable("west", "connection refused"),
            ],
            &SubscriptionSilencing::new(),
        );

        assert!(model.clients.iter().all(|c| c.dc == "east"));
        let west = model.datacenter("west").unwrap();
        assert!(!west.reachable);
        assert_eq!(west.error.as_deref(), Some("connection refused"));
        assert_eq!(west.counts, EntityCounts::default());

        let east = model.datacenter("east").unwrap();
        assert!(east.reachable);
        assert_eq!(east.counts.clients, 3);
        assert_eq!(east.counts.events, 3);
        assert_eq!(east.counts.silences, 2);
        assert!(east.info.contains_key("sensu"));
    }

    #[test]
    fn test_every_tagged_entity_appears_once() {
        let model = model();
        let mut ids = HashSet::new();
        for client in &model.clients {
            assert!(!client.dc.is_empty());
            assert!(ids.insert(client.composite_id.clone().unwrap()));
        }
        assert_eq!(model.clients.len(), 4);
    }

    #[test]
    fn test_duplicate_events_dropped() {
        let raw = RawCollections {
            events: vec![
                event("east", "web01", check_result("disk", 2, "first")),
                event("east", "web01", check_result("disk", 1, "second")),
            ],
            clients: vec![client("east", "web01")],
            ..Default::default()
        };
        let model = correlate(
            vec![DatacenterPull::reachable("east", raw)],
            &SubscriptionSilencing::new(),
        );
        assert_eq!(model.events.len(), 1);
        assert_eq!(model.clients[0].output.as_deref(), Some("first"));
    }
}
