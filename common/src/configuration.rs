use config::{Case, Config, Environment};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Replacement shown instead of credentials in the public configuration
pub const MASK: &str = "*****";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("The Sensu API '{0}' has no host property")]
    MissingHost(String),

    #[error("No Sensu API is configured")]
    NoDatacenters,
}

/// Full dashboard configuration (from TOML).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DashboardConfig {
    #[serde(default)]
    pub dashboard: GlobalConfig,
    #[serde(default)]
    pub sensu: Vec<SensuConfig>,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    #[serde(default = "defaults::host")]
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    /// Seconds between two refreshes of the snapshot
    #[serde(default = "defaults::refresh")]
    pub refresh: u64,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Page size used when listing collections, 0 to disable pagination
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            refresh: defaults::refresh(),
            log_level: defaults::log_level(),
            page_size: defaults::page_size(),
        }
    }
}

impl GlobalConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.max(1))
    }

    /// Tracing filter directive for the configured level, `info` when unknown
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" => "warn",
            "error" | "fatal" | "panic" => "error",
            _ => "info",
        }
    }
}

/// One Sensu API replica. Entries sharing a name form a datacenter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SensuConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "defaults::sensu_port")]
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    /// Accept invalid TLS certificates
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout: u64,
}

impl SensuConfig {
    /// Base URL of this replica
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

/// Resolved settings for one backend endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub url: String,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub timeout: Duration,
    pub insecure: bool,
}

/// A named datacenter and its interchangeable replicas
#[derive(Debug, Clone, PartialEq)]
pub struct DatacenterConfig {
    pub name: String,
    pub endpoints: Vec<EndpointConfig>,
}

mod defaults {
    pub fn host() -> String {
        "0.0.0.0".to_string()
    }
    pub fn port() -> u16 {
        3000
    }
    pub fn refresh() -> u64 {
        10
    }
    pub fn log_level() -> String {
        "info".to_string()
    }
    pub fn page_size() -> usize {
        500
    }
    pub fn sensu_port() -> u16 {
        4567
    }
    pub fn timeout() -> u64 {
        10
    }
}

/// Strip characters which would break dashboard paths and URLs
pub fn sanitize_name(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, ':' | '/' | ';' | '?')).collect()
}

/// Environment overrides: `PANORAMA_DASHBOARD__PAGE_SIZE` sets `dashboard.page-size`
pub fn environment() -> Environment {
    Environment::with_prefix("PANORAMA")
        .separator("__")
        .convert_case(Case::Kebab)
}

impl DashboardConfig {
    pub fn try_load(config: &Config) -> Result<Self, ConfigError> {
        let full = Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config.default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config.clone())
            .build()?;
        Ok(full.try_deserialize()?)
    }

    /// Group the configured APIs into datacenters, in order of first appearance.
    pub fn datacenters(&self) -> Result<Vec<DatacenterConfig>, ConfigError> {
        if self.sensu.is_empty() {
            return Err(ConfigError::NoDatacenters);
        }

        let mut datacenters: Vec<DatacenterConfig> = Vec::new();
        for api in &self.sensu {
            let name = if api.name.is_empty() {
                let generated = format!("sensu-{}", rand::rng().random_range(0..100));
                warn!(
                    api = %api.url(),
                    name = %generated,
                    "The Sensu API has no name property, generating a temporary one"
                );
                generated
            } else {
                sanitize_name(&api.name)
            };

            if api.host.is_empty() {
                return Err(ConfigError::MissingHost(name));
            }

            let timeout = if api.timeout == 0 {
                warn!(
                    api = %api.url(),
                    "A timeout of 0 would fail every request, using {} seconds",
                    defaults::timeout()
                );
                defaults::timeout()
            } else {
                api.timeout
            };

            let endpoint = EndpointConfig {
                url: api.url(),
                user: api.user.clone().filter(|u| !u.is_empty()),
                pass: api.pass.clone(),
                timeout: Duration::from_secs(timeout),
                insecure: api.insecure,
            };

            match datacenters.iter_mut().find(|dc| dc.name == name) {
                Some(dc) => dc.endpoints.push(endpoint),
                None => datacenters.push(DatacenterConfig {
                    name,
                    endpoints: vec![endpoint],
                }),
            }
        }

        Ok(datacenters)
    }

    /// Copy of the configuration safe to expose to the front end
    pub fn public(&self) -> Self {
        let mut public = self.clone();
        for api in &mut public.sensu {
            api.user = api.user.as_ref().map(|_| MASK.to_string());
            api.pass = api.pass.as_ref().map(|_| MASK.to_string());
        }
        public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(toml: &str) -> DashboardConfig {
        let config = Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        DashboardConfig::try_load(&config).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = load(
            r#"
            [[sensu]]
            name = "east"
            host = "sensu-east"
            "#,
        );

        assert_eq!(cfg.dashboard.port, 3000);
        assert_eq!(cfg.dashboard.refresh, 10);
        assert_eq!(cfg.dashboard.page_size, 500);
        assert_eq!(cfg.sensu[0].port, 4567);
        assert_eq!(cfg.sensu[0].timeout, 10);
        assert_eq!(cfg.sensu[0].url(), "http://sensu-east:4567");
    }

    #[test]
    fn test_replicas_grouped_by_name() {
        let cfg = load(
            r#"
            [[sensu]]
            name = "east"
            host = "east-a"

            [[sensu]]
            name = "west"
            host = "west-a"
            ssl = true
            path = "/api"

            [[sensu]]
            name = "east"
            host = "east-b"
            port = 4568
            "#,
        );

        let dcs = cfg.datacenters().unwrap();
        assert_eq!(dcs.len(), 2);
        assert_eq!(dcs[0].name, "east");
        assert_eq!(dcs[0].endpoints.len(), 2);
        assert_eq!(dcs[0].endpoints[1].url, "http://east-b:4568");
        assert_eq!(dcs[1].endpoints[0].url, "https://west-a:4567/api");
    }

    #[test]
    fn test_name_sanitized_and_generated() {
        let cfg = load(
            r#"
            [[sensu]]
            name = "us:east/1?"
            host = "a"

            [[sensu]]
            host = "b"
            "#,
        );

        let dcs = cfg.datacenters().unwrap();
        assert_eq!(dcs[0].name, "useast1");
        assert!(dcs[1].name.starts_with("sensu-"));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let cfg = load(
            r#"
            [[sensu]]
            name = "east"
            host = "a"
            timeout = 0

            [[sensu]]
            name = "east"
            host = "b"
            timeout = 3
            "#,
        );

        let dcs = cfg.datacenters().unwrap();
        assert_eq!(dcs[0].endpoints[0].timeout, Duration::from_secs(10));
        assert_eq!(dcs[0].endpoints[1].timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_environment_overrides_kebab_keys() {
        let vars = config::Map::from([
            ("PANORAMA_DASHBOARD__PAGE_SIZE".to_string(), "42".to_string()),
            ("PANORAMA_DASHBOARD__LOG_LEVEL".to_string(), "debug".to_string()),
        ]);
        let config = Config::builder()
            .add_source(config::File::from_str(
                "[dashboard]\npage-size = 100\n",
                config::FileFormat::Toml,
            ))
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap();

        let cfg = DashboardConfig::try_load(&config).unwrap();
        assert_eq!(cfg.dashboard.page_size, 42);
        assert_eq!(cfg.dashboard.log_level, "debug");
        assert_eq!(cfg.dashboard.port, 3000);
    }

    #[test]
    fn test_missing_host_rejected() {
        let cfg = load(
            r#"
            [[sensu]]
            name = "east"
            "#,
        );
        assert!(matches!(cfg.datacenters(), Err(ConfigError::MissingHost(name)) if name == "east"));
    }

    #[test]
    fn test_no_datacenters_rejected() {
        let cfg = load("");
        assert!(matches!(cfg.datacenters(), Err(ConfigError::NoDatacenters)));
    }

    #[test]
    fn test_public_masks_credentials() {
        let cfg = load(
            r#"
            [[sensu]]
            name = "east"
            host = "a"
            user = "admin"
            pass = "secret"
            "#,
        );

        let public = cfg.public();
        assert_eq!(public.sensu[0].user.as_deref(), Some(MASK));
        assert_eq!(public.sensu[0].pass.as_deref(), Some(MASK));
        assert_eq!(cfg.sensu[0].pass.as_deref(), Some("secret"));
    }

    #[test]
    fn test_log_filter() {
        let mut global = GlobalConfig::default();
        assert_eq!(global.log_filter(), "info");
        global.log_level = "panic".to_string();
        assert_eq!(global.log_filter(), "error");
        global.log_level = "nonsense".to_string();
        assert_eq!(global.log_filter(), "info");
    }
}
