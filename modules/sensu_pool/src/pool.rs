//! Datacenter pool: the replicas of one datacenter behind a failover loop.

use crate::endpoint::{ApiPath, Endpoint, RequestError};
use bytes::Bytes;
use panorama_common::{
    configuration::{sanitize_name, DatacenterConfig},
    tag_datacenter, Attributes, DashboardError, Validate,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Datacenter name can't be empty")]
    EmptyName,

    #[error("Datacenter name '{0}' contains reserved characters")]
    UnsanitizedName(String),

    #[error("Datacenter '{0}' has no endpoint")]
    NoEndpoints(String),

    #[error("Datacenter '{0}' is configured twice")]
    DuplicateName(String),

    #[error("Invalid endpoint for datacenter '{0}': {1}")]
    Endpoint(String, RequestError),
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Datacenter '{datacenter}' has no endpoint")]
    NoEndpoints { datacenter: String },

    /// Every replica failed; only the last attempted replica's error is kept
    #[error("All {attempts} endpoint(s) of datacenter '{datacenter}' failed, last error: {last}")]
    Exhausted {
        datacenter: String,
        attempts: usize,
        #[source]
        last: RequestError,
    },
}

impl PoolError {
    pub fn datacenter(&self) -> &str {
        match self {
            PoolError::NoEndpoints { datacenter } => datacenter,
            PoolError::Exhausted { datacenter, .. } => datacenter,
        }
    }
}

/// Upstream 404s are reported as missing resources, everything else as an unavailable datacenter
impl From<PoolError> for DashboardError {
    fn from(error: PoolError) -> Self {
        match &error {
            PoolError::Exhausted { last, .. } if last.status() == Some(StatusCode::NOT_FOUND) => {
                DashboardError::NotFound(last.to_string())
            }
            _ => DashboardError::Upstream {
                datacenter: error.datacenter().to_string(),
                message: error.to_string(),
            },
        }
    }
}

/// A named group of interchangeable Sensu API replicas
#[derive(Debug)]
pub struct DatacenterPool {
    name: String,
    endpoints: Vec<Endpoint>,
    rng: Mutex<StdRng>,
}

impl DatacenterPool {
    pub fn new(name: &str, endpoints: Vec<Endpoint>) -> Result<Self, BuildError> {
        if name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        if sanitize_name(name) != name {
            return Err(BuildError::UnsanitizedName(name.to_string()));
        }
        if endpoints.is_empty() {
            return Err(BuildError::NoEndpoints(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            endpoints,
            rng: Mutex::new(StdRng::from_os_rng()),
        })
    }

    pub fn from_config(config: &DatacenterConfig) -> Result<Self, BuildError> {
        let endpoints = config
            .endpoints
            .iter()
            .map(Endpoint::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BuildError::Endpoint(config.name.clone(), e))?;
        Self::new(&config.name, endpoints)
    }

    /// Replace the random source, making the attempt order reproducible
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Fresh uniform permutation of the endpoint indices
    fn attempt_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.endpoints.len()).collect();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        order.shuffle(&mut *rng);
        order
    }

    /// Run `op` against each replica in random order until one succeeds
    async fn failover<'a, T, F, Fut>(
        &'a self,
        operation: &'static str,
        path: &ApiPath,
        op: F,
    ) -> Result<T, PoolError>
    where
        F: Fn(&'a Endpoint) -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut last = None;
        for index in self.attempt_order() {
            let endpoint = &self.endpoints[index];
            debug!(
                datacenter = %self.name,
                url = %endpoint.url(),
                path = %path,
                "{} operation", operation
            );
            match op(endpoint).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!(
                        datacenter = %self.name,
                        url = %endpoint.url(),
                        path = %path,
                        error = %error,
                        "{} operation returned error", operation
                    );
                    last = Some(error);
                }
            }
        }

        match last {
            Some(last) => Err(PoolError::Exhausted {
                datacenter: self.name.clone(),
                attempts: self.endpoints.len(),
                last,
            }),
            None => Err(PoolError::NoEndpoints {
                datacenter: self.name.clone(),
            }),
        }
    }

    pub async fn delete(&self, path: &ApiPath) -> Result<(), PoolError> {
        self.failover("DELETE", path, |endpoint| endpoint.delete(path)).await
    }

    pub async fn get_bytes(&self, path: &ApiPath) -> Result<Bytes, PoolError> {
        self.failover("GET", path, |endpoint| endpoint.get_bytes(path)).await
    }

    pub async fn get_list(&self, path: &ApiPath, limit: usize) -> Result<Vec<Value>, PoolError> {
        self.failover("GET", path, |endpoint| endpoint.get_list(path, limit)).await
    }

    pub async fn get_map(&self, path: &ApiPath) -> Result<Attributes, PoolError> {
        self.failover("GET", path, |endpoint| endpoint.get_map(path)).await
    }

    pub async fn post_payload<B: Serialize + Sync + ?Sized>(
        &self,
        path: &ApiPath,
        body: &B,
    ) -> Result<Attributes, PoolError> {
        self.failover("POST", path, |endpoint| endpoint.post_payload(path, body)).await
    }

    /// Tag a raw record with this datacenter and validate it into `T`
    fn admit<T: DeserializeOwned + Validate>(&self, mut value: Value) -> Result<T, String> {
        if !tag_datacenter(&mut value, &self.name) {
            return Err("record is not an object".to_string());
        }
        let record: T = serde_json::from_value(value).map_err(|e| e.to_string())?;
        record.validate()?;
        Ok(record)
    }

    /// Fetch a list and admit its records; records failing validation are dropped
    pub async fn fetch_collection<T: DeserializeOwned + Validate>(
        &self,
        path: &ApiPath,
        limit: usize,
    ) -> Result<Vec<T>, PoolError> {
        let values = self.get_list(path, limit).await?;
        let total = values.len();
        let records: Vec<T> = values
            .into_iter()
            .filter_map(|value| match self.admit(value) {
                Ok(record) => Some(record),
                Err(reason) => {
                    warn!(
                        datacenter = %self.name,
                        path = %path,
                        reason = %reason,
                        "Dropping invalid record"
                    );
                    None
                }
            })
            .collect();

        if records.len() < total {
            debug!(
                datacenter = %self.name,
                path = %path,
                "Admitted {} of {} records", records.len(), total
            );
        }
        Ok(records)
    }

    /// Fetch a single record; a replica returning an invalid record counts as a failed attempt
    pub async fn fetch_record<T: DeserializeOwned + Validate>(
        &self,
        path: &ApiPath,
    ) -> Result<T, PoolError> {
        self.failover("GET", path, |endpoint| async move {
            let map = endpoint.get_map(path).await?;
            self.admit(Value::Object(map))
                .map_err(|reason| RequestError::Decode(endpoint.url().to_string(), reason))
        })
        .await
    }
}
