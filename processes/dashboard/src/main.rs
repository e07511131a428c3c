//! 'main' for the Panorama dashboard process

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, File};
use panorama_common::{
    configuration::{environment, DashboardConfig},
    SubscriptionSilencing,
};
use panorama_module_sensu_pool::DatacenterRegistry;
use panorama_module_snapshot_store::Dashboard;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Parser)]
struct Args {
    #[arg(long, value_name = "PATH", default_values_t = vec!["dashboard.toml".to_string()])]
    config: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Get arguments and config
    let args = Args::parse();
    let mut builder = Config::builder();
    for file in &args.config {
        builder = builder.add_source(File::with_name(file));
    }
    let raw = builder
        .add_source(environment())
        .build()
        .context("Could not read configuration")?;
    let config = DashboardConfig::try_load(&raw)?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.dashboard.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Panorama dashboard process");
    debug!("Configuration: {:?}", config.public());

    let registry = DatacenterRegistry::from_config(&config.datacenters()?)?;
    info!("Monitoring {} datacenter(s)", registry.len());
    let dashboard = Dashboard::new(
        registry,
        Arc::new(SubscriptionSilencing::new()),
        config.dashboard.page_size,
    );

    let mut ticker = interval(config.dashboard.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = dashboard.refresh().await;
                for dc in snapshot.model.datacenters.iter().filter(|dc| !dc.reachable) {
                    warn!(datacenter = %dc.name, "Datacenter unreachable, left out of snapshot");
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    // Bye!
    info!("Exiting");
    Ok(())
}
