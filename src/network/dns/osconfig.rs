use crate::error::{DnsError, Result};
use crate::network::dns::fqdn::Fqdn;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Applies DNS settings to the operating system.
pub trait OsConfigurator {
    /// Updates the OS's DNS configuration to match `config`.
    ///
    /// If `config` is the zero value, all DNS configuration installed by this
    /// configurator is removed. Must not be called after [`close`](Self::close).
    fn set_dns(&mut self, config: OsConfig) -> Result<()>;

    /// Reports whether the configurator can install a resolver for specific DNS suffixes
    /// only. If false, it can only set a global resolver.
    fn supports_split_dns(&self) -> bool;

    /// Returns the resolver settings the OS would use without our configuration,
    /// even after [`set_dns`](Self::set_dns) has been called.
    ///
    /// Only meaningful when [`supports_split_dns`](Self::supports_split_dns) is false.
    /// Configurators that cannot do this return
    /// [`DnsError::BaseConfigNotSupported`](crate::error::DnsError::BaseConfigNotSupported).
    fn get_base_config(&self) -> Result<OsConfig>;

    /// Removes all DNS configuration installed by this configurator.
    fn close(&mut self) -> Result<()>;
}

/// An OS DNS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsConfig {
    /// IP addresses of the nameservers to use.
    pub nameservers: Vec<IpAddr>,
    /// Suffixes used when expanding single-label queries, in addition to the OS's own.
    pub search_domains: Vec<Fqdn>,
    /// Suffixes for which `nameservers` should be used. If empty, `nameservers` are
    /// installed as the primary resolver. A non-empty value requests split DNS.
    pub match_domains: Vec<Fqdn>,
}

impl OsConfig {
    pub fn is_zero(&self) -> bool {
        self.nameservers.is_empty() && self.search_domains.is_empty() && self.match_domains.is_empty()
    }

    /// Rejects a config that asks for split DNS.
    ///
    /// Configurators whose [`supports_split_dns`](OsConfigurator::supports_split_dns) is
    /// false call this before touching the system.
    pub fn ensure_global(&self) -> Result<()> {
        if self.match_domains.is_empty() {
            Ok(())
        } else {
            Err(DnsError::SplitDnsNotSupported)
        }
    }
}
