use crate::constants::DEFAULT_SERVICE_IP;
use crate::network::dns::{Config, NmVersionWindow};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;

/// Loads a configuration from a TOML file, with overrides from prefixed environment variables.
pub trait FromPath: Sized + DeserializeOwned {
    /// Creates a configuration object from the given path and ENV prefix.
    ///
    /// Nested keys are separated by `__` in variable names, e.g. `HOSTDNS_LOG__LEVEL`.
    ///
    /// ### Arguments
    /// - `path` - path to a configuration file
    /// - `env_prefix` - ENV prefix to use for overrides
    fn from_path(path: &Path, env_prefix: &str) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(env_prefix).split("__"));

        figment
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }
}

/// Configuration of the `hostdns` program.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostDnsConfig {
    /// The VPN interface DNS is configured for.
    pub interface_name: String,
    /// Address of the local stub resolver, used when the OS must send queries through it.
    #[serde(default = "default_service_ip")]
    pub service_ip: IpAddr,
    #[serde(default)]
    pub log: LogConfig,
    /// The DNS configuration to apply.
    #[serde(default)]
    pub dns: Config,
    #[serde(default)]
    pub network_manager: NetworkManagerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NetworkManagerConfig {
    /// NetworkManager versions that must be configured through NetworkManager itself.
    #[serde(default)]
    pub unsafe_versions: NmVersionWindow,
}

impl FromPath for HostDnsConfig {}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_ip() -> IpAddr {
    IpAddr::V4(DEFAULT_SERVICE_IP)
}
