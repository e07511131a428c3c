use panorama_common::{composite_id, Correlated, Event, ID_SEPARATOR};
use std::collections::HashSet;
use tracing::warn;

/// Give every entity a `dc<separator>key` identity.
/// Entities without a datacenter or natural key, and repeated identities, are dropped.
pub fn assign_ids<T: Correlated>(collection: &'static str, separator: &str, items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|mut item| {
            if item.dc().is_empty() {
                warn!(collection, "Skipping entity without datacenter");
                return None;
            }
            let Some(key) = item.natural_key() else {
                warn!(
                    collection,
                    datacenter = %item.dc(),
                    "Skipping entity without name, id or path"
                );
                return None;
            };

            let id = composite_id(item.dc(), separator, key);
            if !seen.insert(id.clone()) {
                warn!(collection, id = %id, "Skipping duplicate entity");
                return None;
            }
            item.set_composite_id(id);
            Some(item)
        })
        .collect()
}

/// `dc/client/check`
pub fn event_id(event: &Event) -> String {
    let key = format!("{}{}{}", event.client.name, ID_SEPARATOR, event.check.name);
    composite_id(&event.dc, ID_SEPARATOR, &key)
}
