//! Shared holder of the latest correlated snapshot.
//!
//! Readers take the shared lock only long enough to clone what they need;
//! a refresh installs a complete new snapshot under the exclusive lock, so
//! a reader sees either the previous snapshot or the new one in full.

use panorama_common::{composite_id, Client, DashboardError, Record, Silence, ID_SEPARATOR};
use panorama_module_correlation::{CorrelatedModel, DatacenterStatus};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// One correlated model and when it was installed
#[derive(Debug, Default)]
pub struct Snapshot {
    pub model: CorrelatedModel,
    pub timestamp: Option<Instant>,
}

impl Snapshot {
    /// Age of this snapshot, `None` before the first refresh
    pub fn age(&self) -> Option<Duration> {
        self.timestamp.map(|ts| ts.elapsed())
    }

    /// Check if this snapshot is older than `max_age` or was never refreshed
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.timestamp {
            None => true,
            Some(ts) => ts.elapsed() > max_age,
        }
    }
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new model, replacing the previous one wholesale
    pub fn replace(&self, model: CorrelatedModel) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot {
            model,
            timestamp: Some(Instant::now()),
        });
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        snapshot
    }

    /// The current snapshot. It is never mutated once installed.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn age(&self) -> Option<Duration> {
        self.snapshot().age()
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.snapshot().is_stale(max_age)
    }

    /// Cached client of `dc`, with its composite id synthesized on read
    pub fn client(&self, dc: &str, name: &str) -> Option<Client> {
        let snapshot = self.snapshot();
        let mut client = snapshot
            .model
            .clients
            .iter()
            .find(|client| client.dc == dc && client.name == name)
            .cloned()?;
        client.composite_id = Some(composite_id(dc, ID_SEPARATOR, name));
        Some(client)
    }

    pub fn silences(&self) -> Vec<Silence> {
        self.snapshot().model.silences.clone()
    }

    pub fn datacenters(&self) -> Vec<DatacenterStatus> {
        self.snapshot().model.datacenters.clone()
    }

    /// Every cached client called `name`, across datacenters
    pub fn find_clients(&self, name: &str) -> Result<Vec<Client>, DashboardError> {
        let snapshot = self.snapshot();
        let clients: Vec<Client> =
            snapshot.model.clients.iter().filter(|c| c.name == name).cloned().collect();
        if clients.is_empty() {
            return Err(DashboardError::not_found(format!(
                "Could not find any client with the name '{name}'"
            )));
        }
        Ok(clients)
    }

    pub fn find_checks(&self, name: &str) -> Result<Vec<Record>, DashboardError> {
        find_named(&self.snapshot().model.checks, "check", name)
    }

    pub fn find_aggregates(&self, name: &str) -> Result<Vec<Record>, DashboardError> {
        find_named(&self.snapshot().model.aggregates, "aggregate", name)
    }
}

fn find_named(records: &[Record], kind: &str, name: &str) -> Result<Vec<Record>, DashboardError> {
    let found: Vec<Record> = records.iter().filter(|r| r.name() == Some(name)).cloned().collect();
    if found.is_empty() {
        return Err(DashboardError::not_found(format!(
            "Could not find any {kind} with the name '{name}'"
        )));
    }
    Ok(found)
}
