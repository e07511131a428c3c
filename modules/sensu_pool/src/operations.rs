//! Domain requests against a datacenter, built on the pool primitives.
//!
//! Nothing here adds failover logic; each operation is one primitive call
//! on a fixed `/<resource>/<identifier>` path.

use crate::endpoint::ApiPath;
use crate::pool::{DatacenterPool, PoolError};
use bytes::Bytes;
use panorama_common::{
    Attributes, CheckExecution, Client, Event, HistoryEntry, Record, Silence, SilenceSpec,
};
use serde_json::Value;

pub mod paths {
    use super::ApiPath;

    pub fn clients() -> ApiPath {
        ApiPath::new("clients")
    }

    pub fn client(name: &str) -> ApiPath {
        clients().segment(name)
    }

    pub fn client_history(name: &str) -> ApiPath {
        client(name).segment("history")
    }

    pub fn checks() -> ApiPath {
        ApiPath::new("checks")
    }

    pub fn events() -> ApiPath {
        ApiPath::new("events")
    }

    pub fn event(client: &str, check: &str) -> ApiPath {
        events().segment(client).segment(check)
    }

    pub fn result(client: &str, check: &str) -> ApiPath {
        ApiPath::new("results").segment(client).segment(check)
    }

    pub fn aggregates() -> ApiPath {
        ApiPath::new("aggregates")
    }

    pub fn aggregate(name: &str) -> ApiPath {
        aggregates().segment(name)
    }

    pub fn silenced() -> ApiPath {
        ApiPath::new("silenced")
    }

    pub fn silenced_clear() -> ApiPath {
        silenced().segment("clear")
    }

    pub fn stashes() -> ApiPath {
        ApiPath::new("stashes")
    }

    pub fn request() -> ApiPath {
        ApiPath::new("request")
    }

    pub fn info() -> ApiPath {
        ApiPath::new("info")
    }

    pub fn health() -> ApiPath {
        ApiPath::new("health")
    }
}

impl DatacenterPool {
    pub async fn clients(&self, limit: usize) -> Result<Vec<Client>, PoolError> {
        self.fetch_collection(&paths::clients(), limit).await
    }

    pub async fn checks(&self, limit: usize) -> Result<Vec<Record>, PoolError> {
        self.fetch_collection(&paths::checks(), limit).await
    }

    pub async fn events(&self, limit: usize) -> Result<Vec<Event>, PoolError> {
        self.fetch_collection(&paths::events(), limit).await
    }

    pub async fn aggregates(&self, limit: usize) -> Result<Vec<Record>, PoolError> {
        self.fetch_collection(&paths::aggregates(), limit).await
    }

    pub async fn silenced(&self, limit: usize) -> Result<Vec<Silence>, PoolError> {
        self.fetch_collection(&paths::silenced(), limit).await
    }

    pub async fn stashes(&self, limit: usize) -> Result<Vec<Record>, PoolError> {
        self.fetch_collection(&paths::stashes(), limit).await
    }

    pub async fn info(&self) -> Result<Attributes, PoolError> {
        self.get_map(&paths::info()).await
    }

    /// Raw body of the health endpoint; any 2xx means healthy
    pub async fn health(&self) -> Result<Bytes, PoolError> {
        self.get_bytes(&paths::health()).await
    }

    pub async fn client(&self, name: &str) -> Result<Client, PoolError> {
        self.fetch_record(&paths::client(name)).await
    }

    pub async fn client_history(&self, name: &str) -> Result<Vec<HistoryEntry>, PoolError> {
        self.fetch_collection(&paths::client_history(name), 0).await
    }

    pub async fn delete_client(&self, name: &str) -> Result<(), PoolError> {
        self.delete(&paths::client(name)).await
    }

    pub async fn aggregate(&self, name: &str) -> Result<Record, PoolError> {
        self.fetch_record(&paths::aggregate(name)).await
    }

    pub async fn aggregate_checks(&self, name: &str) -> Result<Vec<Value>, PoolError> {
        self.get_list(&paths::aggregate(name).segment("checks"), 0).await
    }

    pub async fn aggregate_clients(&self, name: &str) -> Result<Vec<Value>, PoolError> {
        self.get_list(&paths::aggregate(name).segment("clients"), 0).await
    }

    pub async fn aggregate_results(
        &self,
        name: &str,
        severity: &str,
    ) -> Result<Vec<Value>, PoolError> {
        let path = paths::aggregate(name).segment("results").segment(severity);
        self.get_list(&path, 0).await
    }

    pub async fn delete_aggregate(&self, name: &str) -> Result<(), PoolError> {
        self.delete(&paths::aggregate(name)).await
    }

    pub async fn issue_check_execution(
        &self,
        execution: &CheckExecution,
    ) -> Result<Attributes, PoolError> {
        self.post_payload(&paths::request(), execution).await
    }

    pub async fn delete_check_result(&self, check: &str, client: &str) -> Result<(), PoolError> {
        self.delete(&paths::result(client, check)).await
    }

    pub async fn delete_event(&self, check: &str, client: &str) -> Result<(), PoolError> {
        self.delete(&paths::event(client, check)).await
    }

    pub async fn silence(&self, spec: &SilenceSpec) -> Result<Attributes, PoolError> {
        self.post_payload(&paths::silenced(), spec).await
    }

    pub async fn clear_silenced(&self, spec: &SilenceSpec) -> Result<Attributes, PoolError> {
        self.post_payload(&paths::silenced_clear(), spec).await
    }
}
