//! Pulls the raw collections of every datacenter for one refresh cycle

use futures::future::join_all;
use panorama_module_correlation::{DatacenterPull, RawCollections};
use panorama_module_sensu_pool::{DatacenterPool, DatacenterRegistry};
use tracing::{info, warn};

/// Pull every collection of one datacenter. Any failed collection fails the
/// whole datacenter so that a snapshot never mixes fresh and missing data.
pub async fn pull_datacenter(pool: &DatacenterPool, page_size: usize) -> DatacenterPull {
    let pulled = futures::try_join!(
        pool.clients(page_size),
        pool.checks(0),
        pool.events(page_size),
        pool.aggregates(page_size),
        pool.silenced(page_size),
        pool.stashes(page_size),
        pool.info(),
    );

    match pulled {
        Ok((clients, checks, events, aggregates, silences, stashes, info)) => {
            DatacenterPull::reachable(
                pool.name(),
                RawCollections {
                    clients,
                    checks,
                    events,
                    aggregates,
                    silences,
                    stashes,
                    info,
                },
            )
        }
        Err(error) => {
            warn!(datacenter = %pool.name(), error = %error, "Could not refresh datacenter");
            DatacenterPull::unreachable(pool.name(), error)
        }
    }
}

/// Pull every datacenter of the registry; datacenters are pulled independently
pub async fn pull_all(registry: &DatacenterRegistry, page_size: usize) -> Vec<DatacenterPull> {
    let pulls = join_all(registry.pools().iter().map(|pool| pull_datacenter(pool, page_size))).await;
    let reachable = pulls.iter().filter(|pull| pull.outcome.is_ok()).count();
    info!("Pulled {} of {} datacenter(s)", reachable, pulls.len());
    pulls
}
