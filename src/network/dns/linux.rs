use crate::constants::RESOLV_CONF;
use crate::error::Result;
use crate::health::Health;
use crate::network::dns::dbus;
use crate::network::dns::direct::{DirectFs, DirectManager, WholeFileFs};
use crate::network::dns::mode::{dns_mode, DnsMode, NmVersionWindow, ProbeEnv, ResolvconfStyle};
use crate::network::dns::nm::NmManager;
use crate::network::dns::osconfig::OsConfigurator;
use crate::network::dns::resolvconf::{resolvconf_style, DebianResolvconfManager, OpenresolvManager};
use crate::network::dns::resolved::ResolvedManager;
use std::io;

/// [`ProbeEnv`] backed by the live system.
#[derive(Debug, Default)]
pub struct SystemProbes {
    fs: DirectFs,
}

impl ProbeEnv for SystemProbes {
    fn read_resolv_conf(&self) -> io::Result<Vec<u8>> {
        self.fs.read_file(RESOLV_CONF)
    }

    fn dbus_ping(&self, name: &str, object_path: &str) -> Result<()> {
        dbus::ping(name, object_path)
    }

    fn nm_is_using_resolved(&self) -> Result<()> {
        dbus::nm_is_using_resolved()
    }

    fn nm_version(&self) -> Result<String> {
        dbus::nm_version()
    }

    fn resolvconf_style(&self) -> ResolvconfStyle {
        resolvconf_style()
    }
}

/// Detects the DNS mode of this host and creates the matching configurator for
/// `interface_name`.
///
/// The outcome of detection is recorded as the `dns-manager` health state.
///
/// ### Arguments
/// - `health` - the health registry
/// - `interface_name` - the interface DNS is configured for
/// - `nm_unsafe_versions` - NetworkManager versions that must be configured through NetworkManager
pub fn new_os_configurator(
    health: &Health,
    interface_name: &str,
    nm_unsafe_versions: &NmVersionWindow,
) -> Result<Box<dyn OsConfigurator>> {
    let mode = dns_mode(&SystemProbes::default(), nm_unsafe_versions);
    health.set_dns_manager_health(mode.as_ref().err());

    configurator_for(mode?, interface_name)
}

/// Detects the DNS mode of this host.
pub fn detect_dns_mode(nm_unsafe_versions: &NmVersionWindow) -> Result<Option<DnsMode>> {
    dns_mode(&SystemProbes::default(), nm_unsafe_versions).map(Some)
}

/// Creates the configurator for `mode`.
pub fn configurator_for(mode: DnsMode, interface_name: &str) -> Result<Box<dyn OsConfigurator>> {
    let configurator: Box<dyn OsConfigurator> = match mode {
        DnsMode::Direct => Box::new(DirectManager::new()),
        DnsMode::SystemdResolved => Box::new(ResolvedManager::new(interface_name)?),
        DnsMode::NetworkManager => Box::new(NmManager::new(interface_name)?),
        DnsMode::DebianResolvconf => Box::new(DebianResolvconfManager::new()),
        DnsMode::Openresolv => Box::new(OpenresolvManager::new()),
    };

    Ok(configurator)
}
