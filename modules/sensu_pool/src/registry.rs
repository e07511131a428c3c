//! Registry of configured datacenters.

use crate::pool::{BuildError, DatacenterPool};
use panorama_common::{configuration::DatacenterConfig, DashboardError};
use tracing::info;

/// Every configured datacenter pool, in configuration order
#[derive(Debug)]
pub struct DatacenterRegistry {
    pools: Vec<DatacenterPool>,
}

impl DatacenterRegistry {
    pub fn new(pools: Vec<DatacenterPool>) -> Result<Self, BuildError> {
        for (index, pool) in pools.iter().enumerate() {
            if pools[..index].iter().any(|other| other.name() == pool.name()) {
                return Err(BuildError::DuplicateName(pool.name().to_string()));
            }
        }
        Ok(Self { pools })
    }

    pub fn from_config(datacenters: &[DatacenterConfig]) -> Result<Self, BuildError> {
        let pools = datacenters
            .iter()
            .map(|config| {
                let pool = DatacenterPool::from_config(config)?;
                info!(
                    datacenter = %pool.name(),
                    endpoints = pool.endpoints().len(),
                    "Registered datacenter"
                );
                Ok(pool)
            })
            .collect::<Result<Vec<_>, BuildError>>()?;
        Self::new(pools)
    }

    /// Find the pool serving `name`.
    ///
    /// With a single datacenter configured it is returned whatever the name,
    /// so callers of a single-datacenter setup may omit it.
    pub fn resolve(&self, name: &str) -> Result<&DatacenterPool, DashboardError> {
        if let [only] = self.pools.as_slice() {
            return Ok(only);
        }
        if name.is_empty() {
            return Err(DashboardError::NameRequired);
        }
        self.pools
            .iter()
            .find(|pool| pool.name() == name)
            .ok_or_else(|| DashboardError::DatacenterNotFound(name.to_string()))
    }

    pub fn pools(&self) -> &[DatacenterPool] {
        &self.pools
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.iter().map(DatacenterPool::name)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_common::configuration::EndpointConfig;
    use std::time::Duration;

    fn datacenter(name: &str) -> DatacenterConfig {
        DatacenterConfig {
            name: name.to_string(),
            endpoints: vec![EndpointConfig {
                url: format!("http://{name}:4567"),
                user: None,
                pass: None,
                timeout: Duration::from_secs(1),
                insecure: false,
            }],
        }
    }

    #[test]
    fn test_single_datacenter_always_resolves() {
        let registry = DatacenterRegistry::from_config(&[datacenter("east")]).unwrap();
        assert_eq!(registry.resolve("").unwrap().name(), "east");
        assert_eq!(registry.resolve("elsewhere").unwrap().name(), "east");
    }

    #[test]
    fn test_resolve_among_several() {
        let registry =
            DatacenterRegistry::from_config(&[datacenter("east"), datacenter("west")]).unwrap();
        assert_eq!(registry.resolve("west").unwrap().name(), "west");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["east", "west"]);

        let error = registry.resolve("").unwrap_err();
        assert!(matches!(error, DashboardError::NameRequired));
        assert_eq!(error.to_string(), "The datacenter name can't be empty");

        let error = registry.resolve("north").unwrap_err();
        assert_eq!(error.to_string(), "Could not find the datacenter 'north'");
        assert_eq!(error.status_code(), 404);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = DatacenterRegistry::from_config(&[datacenter("east"), datacenter("east")]);
        assert!(matches!(result, Err(BuildError::DuplicateName(name)) if name == "east"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = DatacenterRegistry::new(vec![]).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(registry.resolve(""), Err(DashboardError::NameRequired)));
    }
}
