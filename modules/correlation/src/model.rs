//! Input and output collections of the correlation engine

use panorama_common::{Attributes, Client, Event, Record, Silence};
use serde::Serialize;

/// Collections pulled from one datacenter during a refresh
#[derive(Debug, Clone, Default)]
pub struct RawCollections {
    pub clients: Vec<Client>,
    pub checks: Vec<Record>,
    pub events: Vec<Event>,
    pub aggregates: Vec<Record>,
    pub silences: Vec<Silence>,
    pub stashes: Vec<Record>,
    pub info: Attributes,
}

/// Outcome of pulling one datacenter; a failed pull contributes no entity
#[derive(Debug, Clone)]
pub struct DatacenterPull {
    pub name: String,
    pub outcome: Result<RawCollections, String>,
}

impl DatacenterPull {
    pub fn reachable(name: &str, collections: RawCollections) -> Self {
        Self {
            name: name.to_string(),
            outcome: Ok(collections),
        }
    }

    pub fn unreachable(name: &str, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            outcome: Err(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub clients: usize,
    pub checks: usize,
    pub events: usize,
    pub silences: usize,
    pub aggregates: usize,
    pub stashes: usize,
}

/// Health of one datacenter as seen by the last refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatacenterStatus {
    pub name: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub info: Attributes,
    pub counts: EntityCounts,
}

/// Cross-referenced view of every datacenter, ready for the dashboard
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrelatedModel {
    pub clients: Vec<Client>,
    pub checks: Vec<Record>,
    pub events: Vec<Event>,
    pub aggregates: Vec<Record>,
    pub silences: Vec<Silence>,
    pub stashes: Vec<Record>,
    pub datacenters: Vec<DatacenterStatus>,
}

impl CorrelatedModel {
    pub fn datacenter(&self, name: &str) -> Option<&DatacenterStatus> {
        self.datacenters.iter().find(|dc| dc.name == name)
    }
}
