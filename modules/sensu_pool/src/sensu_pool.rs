//! Panorama Sensu API pool module.
//! Talks to the Sensu APIs of every configured datacenter, failing over
//! between the replicas of a datacenter in random order.

mod endpoint;
mod operations;
mod pool;
mod registry;

pub use endpoint::{ApiPath, Endpoint, RequestError};
pub use operations::paths;
pub use pool::{BuildError, DatacenterPool, PoolError};
pub use registry::DatacenterRegistry;
