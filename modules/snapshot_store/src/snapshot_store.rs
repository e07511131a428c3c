//! Panorama snapshot store module.
//! Holds the latest correlated snapshot, runs the refresh cycle and exposes
//! the dashboard operations built on the datacenter registry.

mod dashboard;
mod refresh;
mod store;

pub use dashboard::{Dashboard, SEVERITIES};
pub use refresh::{pull_all, pull_datacenter};
pub use store::{Snapshot, SnapshotStore};
