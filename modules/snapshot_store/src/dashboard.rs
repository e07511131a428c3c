//! Operations offered to the boundary layer.
//!
//! Mutations and single-entity reads go live to the resolved datacenter pool;
//! silencing annotations on those reads come from the cached snapshot.

use crate::refresh::pull_all;
use crate::store::{Snapshot, SnapshotStore};
use panorama_common::{
    composite_id, Attributes, CheckExecution, Client, DashboardError, HistoryEntry, Record,
    SilenceSpec, SilencingPredicate, ID_SEPARATOR,
};
use panorama_module_correlation::{correlate, DatacenterStatus};
use panorama_module_sensu_pool::{DatacenterPool, DatacenterRegistry, PoolError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Accepted severities for aggregate results
pub const SEVERITIES: [&str; 4] = ["ok", "warning", "critical", "unknown"];

/// Log and convert a pool failure for the boundary layer
fn upstream<T>(result: Result<T, PoolError>) -> Result<T, DashboardError> {
    result.map_err(|error| {
        warn!(datacenter = %error.datacenter(), error = %error, "Datacenter request failed");
        DashboardError::from(error)
    })
}

/// Reject an empty path parameter before any request is sent
fn require(param: &str, value: &str) -> Result<(), DashboardError> {
    if value.is_empty() {
        return Err(DashboardError::invalid_param(param, "can't be empty"));
    }
    Ok(())
}

/// Composition of the registry, the snapshot store and the silencing predicate
pub struct Dashboard {
    registry: DatacenterRegistry,
    store: SnapshotStore,
    silencing: Arc<dyn SilencingPredicate>,
    page_size: usize,
}

impl Dashboard {
    pub fn new(
        registry: DatacenterRegistry,
        silencing: Arc<dyn SilencingPredicate>,
        page_size: usize,
    ) -> Self {
        Self {
            registry,
            store: SnapshotStore::new(),
            silencing,
            page_size,
        }
    }

    pub fn registry(&self) -> &DatacenterRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    fn pool(&self, dc: &str) -> Result<&DatacenterPool, DashboardError> {
        self.registry.resolve(dc).inspect_err(|error| warn!("{}", error))
    }

    /// Pull every datacenter, correlate, and install the result
    pub async fn refresh(&self) -> Arc<Snapshot> {
        let start = Instant::now();
        let pulls = pull_all(&self.registry, self.page_size).await;
        let model = correlate(pulls, self.silencing.as_ref());
        info!(
            clients = model.clients.len(),
            events = model.events.len(),
            "Refreshed snapshot in {:?}",
            start.elapsed()
        );
        self.store.replace(model)
    }

    pub fn datacenters(&self) -> Vec<DatacenterStatus> {
        self.store.datacenters()
    }

    /// Any successful answer of the health endpoint means healthy
    pub async fn datacenter_health(&self, dc: &str) -> Result<(), DashboardError> {
        let pool = self.pool(dc)?;
        upstream(pool.health().await).map(|_| ())
    }

    pub async fn get_client(&self, dc: &str, name: &str) -> Result<Client, DashboardError> {
        require("client", name)?;
        let pool = self.pool(dc)?;
        let mut client = upstream(pool.client(name).await)?;

        let silences = self.store.silences();
        let silenced = self.silencing.client_silenced(name, pool.name(), &silences);
        client.composite_id = Some(composite_id(pool.name(), ID_SEPARATOR, name));
        client.dc = pool.name().to_string();
        client.silenced = silenced.silenced;
        client.silenced_by = silenced.silenced_by;
        Ok(client)
    }

    /// Live history of a client, annotated with the silencing state of the
    /// current snapshot
    pub async fn get_client_history(
        &self,
        dc: &str,
        name: &str,
    ) -> Result<Vec<HistoryEntry>, DashboardError> {
        require("client", name)?;
        let pool = self.pool(dc)?;
        let mut history = upstream(pool.client_history(name).await)?;

        let silences = self.store.silences();
        for entry in &mut history {
            entry.client = name.to_string();
            entry.dc = pool.name().to_string();
            let Some(last_result) = &entry.last_result else {
                warn!(client = %name, check = %entry.check, "History entry has no last result");
                continue;
            };
            let silenced = self.silencing.check_silenced(last_result, name, pool.name(), &silences);
            entry.silenced = silenced.silenced;
            entry.silenced_by = silenced.silenced_by;
        }
        Ok(history)
    }

    pub async fn delete_client(&self, dc: &str, name: &str) -> Result<(), DashboardError> {
        require("client", name)?;
        upstream(self.pool(dc)?.delete_client(name).await)
    }

    pub async fn get_aggregate(&self, dc: &str, name: &str) -> Result<Record, DashboardError> {
        require("aggregate", name)?;
        upstream(self.pool(dc)?.aggregate(name).await)
    }

    pub async fn get_aggregate_checks(
        &self,
        dc: &str,
        name: &str,
    ) -> Result<Vec<Value>, DashboardError> {
        require("aggregate", name)?;
        upstream(self.pool(dc)?.aggregate_checks(name).await)
    }

    pub async fn get_aggregate_clients(
        &self,
        dc: &str,
        name: &str,
    ) -> Result<Vec<Value>, DashboardError> {
        require("aggregate", name)?;
        upstream(self.pool(dc)?.aggregate_clients(name).await)
    }

    pub async fn get_aggregate_results(
        &self,
        dc: &str,
        name: &str,
        severity: &str,
    ) -> Result<Vec<Value>, DashboardError> {
        require("aggregate", name)?;
        if !SEVERITIES.contains(&severity) {
            return Err(DashboardError::invalid_param(
                "severity",
                &format!("expected one of {}", SEVERITIES.join(", ")),
            ));
        }
        upstream(self.pool(dc)?.aggregate_results(name, severity).await)
    }

    pub async fn delete_aggregate(&self, dc: &str, name: &str) -> Result<(), DashboardError> {
        require("aggregate", name)?;
        upstream(self.pool(dc)?.delete_aggregate(name).await)
    }

    pub async fn issue_check_execution(
        &self,
        execution: &CheckExecution,
    ) -> Result<Attributes, DashboardError> {
        require("check", &execution.check)?;
        upstream(self.pool(&execution.dc)?.issue_check_execution(execution).await)
    }

    pub async fn delete_check_result(
        &self,
        check: &str,
        client: &str,
        dc: &str,
    ) -> Result<(), DashboardError> {
        require("check", check)?;
        require("client", client)?;
        upstream(self.pool(dc)?.delete_check_result(check, client).await)
    }

    /// Resolve an event by deleting it upstream
    pub async fn resolve_event(
        &self,
        check: &str,
        client: &str,
        dc: &str,
    ) -> Result<(), DashboardError> {
        require("check", check)?;
        require("client", client)?;
        upstream(self.pool(dc)?.delete_event(check, client).await)
    }

    pub async fn post_silence(&self, spec: &SilenceSpec) -> Result<Attributes, DashboardError> {
        if !spec.is_targeted() {
            return Err(DashboardError::invalid_param(
                "silence",
                "a subscription or a check is required",
            ));
        }
        upstream(self.pool(&spec.dc)?.silence(spec).await)
    }

    pub async fn clear_silenced(&self, spec: &SilenceSpec) -> Result<Attributes, DashboardError> {
        if !spec.is_targeted() {
            return Err(DashboardError::invalid_param(
                "silence",
                "an id, a subscription or a check is required",
            ));
        }
        upstream(self.pool(&spec.dc)?.clear_silenced(spec).await)
    }
}
