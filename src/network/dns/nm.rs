//! Configurator that programs DNS through NetworkManager's D-Bus API.
//!
//! Only used for NetworkManager versions that override other systemd-resolved clients.

use crate::constants::{NM_DEVICE_INTERFACE, NM_PATH, NM_SERVICE, RECONFIG_TIMEOUT};
use crate::error::{DnsError, Result};
use crate::network::dns::dbus::{bus_error, system_bus};
use crate::network::dns::osconfig::{OsConfig, OsConfigurator};
use dbus::arg::{PropMap, RefArg, Variant};
use dbus::blocking::Connection;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use tracing::debug;

/// Connection settings as returned by `GetAppliedConnection`.
type ConnectionSettings = HashMap<String, PropMap>;

/// Priority that overrides every other connection's DNS.
const HIGHEST_PRIORITY: i32 = i32::MIN;
/// Lower than all of NetworkManager's built-in automatic priorities.
const LOWER_PRIORITY: i32 = 200;

/// An [`OsConfigurator`] for NetworkManager.
pub struct NmManager {
    interface_name: String,
    conn: Connection,
}

impl NmManager {
    /// Creates a configurator for the interface `interface_name`.
    pub fn new(interface_name: &str) -> Result<Self> {
        Ok(Self {
            interface_name: interface_name.to_owned(),
            conn: system_bus()?,
        })
    }

    fn try_set(&self, config: &OsConfig) -> Result<()> {
        let nm = self.conn.with_proxy(NM_SERVICE, NM_PATH, RECONFIG_TIMEOUT);
        let (device_path,): (dbus::Path<'static>,) = nm
            .method_call(NM_SERVICE, "GetDeviceByIpIface", (self.interface_name.as_str(),))
            .map_err(bus_error("GetDeviceByIpIface"))?;

        let device = self
            .conn
            .with_proxy(NM_SERVICE, device_path, RECONFIG_TIMEOUT);
        let (mut settings, version): (ConnectionSettings, u64) = device
            .method_call(NM_DEVICE_INTERFACE, "GetAppliedConnection", (0u32,))
            .map_err(bus_error("GetAppliedConnection"))?;

        apply_dns_settings(&mut settings, config);

        device
            .method_call(NM_DEVICE_INTERFACE, "Reapply", (settings, version, 0u32))
            .map_err(bus_error("Reapply"))
    }
}

impl OsConfigurator for NmManager {
    fn set_dns(&mut self, config: OsConfig) -> Result<()> {
        debug!(
            "configuring DNS on {} through NetworkManager",
            self.interface_name
        );

        config.ensure_global()?;
        self.try_set(&config)
    }

    fn supports_split_dns(&self) -> bool {
        false
    }

    fn get_base_config(&self) -> Result<OsConfig> {
        Err(DnsError::BaseConfigNotSupported)
    }

    fn close(&mut self) -> Result<()> {
        self.set_dns(OsConfig::default())
    }
}

fn variant<T: RefArg + 'static>(value: T) -> Variant<Box<dyn RefArg>> {
    Variant(Box::new(value))
}

/// Rewrites the DNS parts of a connection's `ipv4` and `ipv6` settings to `config`.
fn apply_dns_settings(settings: &mut ConnectionSettings, config: &OsConfig) {
    // NetworkManager represents IPv4 addresses as u32 in network byte order, but IPv6
    // addresses as byte arrays.
    let mut dns_v4 = Vec::<u32>::new();
    let mut dns_v6 = Vec::<Vec<u8>>::new();
    for ns in &config.nameservers {
        match ns {
            IpAddr::V4(addr) => dns_v4.push(u32::from_le_bytes(addr.octets())),
            IpAddr::V6(addr) => dns_v6.push(addr.octets().to_vec()),
        }
    }

    let mut seen = HashSet::new();
    let mut search = Vec::new();
    for domain in &config.search_domains {
        if seen.insert(domain) {
            search.push(domain.with_trailing_dot().to_owned());
        }
    }
    // Route every domain to our nameservers.
    if !config.nameservers.is_empty() {
        search.push("~.".to_owned());
    }

    let priority = if config.nameservers.is_empty() {
        LOWER_PRIORITY
    } else {
        HIGHEST_PRIORITY
    };

    // LLMNR and mDNS are deliberately left alone: older NetworkManager versions reject
    // those settings.
    let ipv4 = settings.entry("ipv4".to_owned()).or_default();
    ipv4.insert("dns".to_owned(), variant(dns_v4));
    ipv4.insert("dns-search".to_owned(), variant(search.clone()));
    ipv4.insert("dns-priority".to_owned(), variant(priority));

    // Additional static DNS servers are only accepted in "auto" or "manual" mode, and
    // "manual" requires addresses, so use "auto".
    let ipv6 = settings.entry("ipv6".to_owned()).or_default();
    ipv6.insert("method".to_owned(), variant("auto".to_owned()));
    ipv6.insert("ignore-auto-dns".to_owned(), variant(true));
    ipv6.insert("ignore-auto-routes".to_owned(), variant(true));
    ipv6.insert("never-default".to_owned(), variant(true));
    ipv6.insert("dns".to_owned(), variant(dns_v6));
    ipv6.insert("dns-search".to_owned(), variant(search));
    ipv6.insert("dns-priority".to_owned(), variant(priority));

    // Deprecated properties that make Reapply fail.
    ipv6.remove("addresses");
    ipv6.remove("routes");
}
