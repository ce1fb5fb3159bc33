use crate::error::{DnsError, Result};
use crate::health::Health;
use crate::network::dns::mode::{DnsMode, NmVersionWindow};
use crate::network::dns::osconfig::{OsConfig, OsConfigurator};
use tracing::warn;

/// An [`OsConfigurator`] for platforms without DNS support. Accepts and discards global configs.
#[derive(Debug, Default)]
pub struct NoopManager;

impl OsConfigurator for NoopManager {
    fn set_dns(&mut self, config: OsConfig) -> Result<()> {
        config.ensure_global()
    }

    fn supports_split_dns(&self) -> bool {
        false
    }

    fn get_base_config(&self) -> Result<OsConfig> {
        Err(DnsError::BaseConfigNotSupported)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// No DNS mode exists on this platform.
pub fn detect_dns_mode(_nm_unsafe_versions: &NmVersionWindow) -> Result<Option<DnsMode>> {
    Ok(None)
}

pub fn new_os_configurator(
    _health: &Health,
    _interface_name: &str,
    _nm_unsafe_versions: &NmVersionWindow,
) -> Result<Box<dyn OsConfigurator>> {
    warn!("DNS configuration is not supported on this platform");
    Ok(Box::new(NoopManager))
}
