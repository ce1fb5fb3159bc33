//! System bus access for systemd-resolved and NetworkManager.

use crate::constants::{
    DBUS_PEER_INTERFACE, DBUS_PROBE_TIMEOUT, NM_DNS_MANAGER_INTERFACE, NM_DNS_MANAGER_PATH,
    NM_PATH, NM_SERVICE, RECONFIG_TIMEOUT, RESOLVED_MANAGER_INTERFACE, RESOLVED_PATH,
    RESOLVED_SERVICE,
};
use crate::error::{DnsError, Result};
use crate::network::dns::resolved::{LinkDomain, LinkNameserver, LinkSetting, Resolve1};
use dbus::blocking::stdintf::org_freedesktop_dbus::Properties;
use dbus::blocking::{Connection, Proxy};

/// Converts a D-Bus failure into a [`DnsError`] naming the D-Bus member involved.
pub fn bus_error(member: &'static str) -> impl FnOnce(dbus::Error) -> DnsError {
    move |e| DnsError::call(member, e.to_string())
}

/// Connects to the system bus.
pub fn system_bus() -> Result<Connection> {
    Connection::new_system().map_err(bus_error("connect"))
}

/// Pings `name` at `object_path`, giving up after [`DBUS_PROBE_TIMEOUT`].
pub fn ping(name: &str, object_path: &str) -> Result<()> {
    let conn = system_bus()?;
    let proxy = conn.with_proxy(name, object_path, DBUS_PROBE_TIMEOUT);

    proxy
        .method_call(DBUS_PEER_INTERFACE, "Ping", ())
        .map_err(bus_error("Ping"))
}

/// Reads a string property, giving up after [`DBUS_PROBE_TIMEOUT`].
///
/// A property of any other type is an error.
pub fn read_string_property(
    name: &str,
    object_path: &str,
    interface: &str,
    property: &str,
) -> Result<String> {
    let conn = system_bus()?;
    let proxy = conn.with_proxy(name, object_path, DBUS_PROBE_TIMEOUT);

    proxy.get(interface, property).map_err(bus_error("Get"))
}

/// Succeeds if NetworkManager's DNS manager runs in `systemd-resolved` mode.
pub fn nm_is_using_resolved() -> Result<()> {
    let mode = read_string_property(NM_SERVICE, NM_DNS_MANAGER_PATH, NM_DNS_MANAGER_INTERFACE, "Mode")?;

    if mode != "systemd-resolved" {
        return Err(DnsError::call(
            "Mode",
            format!("NetworkManager is using {mode:?} for DNS, not systemd-resolved"),
        ));
    }

    Ok(())
}

/// Reads NetworkManager's version string.
pub fn nm_version() -> Result<String> {
    read_string_property(NM_SERVICE, NM_PATH, NM_SERVICE, "Version")
}

/// [`Resolve1`] on the system bus.
pub struct SystemResolve1 {
    conn: Connection,
}

impl SystemResolve1 {
    pub fn new() -> Result<Self> {
        Ok(Self {
            conn: system_bus()?,
        })
    }

    fn proxy(&self) -> Proxy<'_, &Connection> {
        self.conn
            .with_proxy(RESOLVED_SERVICE, RESOLVED_PATH, RECONFIG_TIMEOUT)
    }
}

impl Resolve1 for SystemResolve1 {
    fn set_link_dns(&self, ifindex: i32, nameservers: &[LinkNameserver]) -> Result<()> {
        let nameservers = nameservers
            .iter()
            .map(|ns| (ns.family, ns.address.clone()))
            .collect::<Vec<_>>();

        self.proxy()
            .method_call(RESOLVED_MANAGER_INTERFACE, "SetLinkDNS", (ifindex, nameservers))
            .map_err(bus_error("SetLinkDNS"))
    }

    fn set_link_domains(&self, ifindex: i32, domains: &[LinkDomain]) -> Result<()> {
        let domains = domains
            .iter()
            .map(|d| (d.domain.clone(), d.routing_only))
            .collect::<Vec<_>>();

        self.proxy()
            .method_call(RESOLVED_MANAGER_INTERFACE, "SetLinkDomains", (ifindex, domains))
            .map_err(bus_error("SetLinkDomains"))
    }

    fn set_link_default_route(&self, ifindex: i32, default_route: bool) -> Result<()> {
        self.proxy()
            .method_call(
                RESOLVED_MANAGER_INTERFACE,
                "SetLinkDefaultRoute",
                (ifindex, default_route),
            )
            .map_err(bus_error("SetLinkDefaultRoute"))
    }

    fn set_link_setting(&self, ifindex: i32, setting: LinkSetting, value: &str) -> Result<()> {
        self.proxy()
            .method_call(RESOLVED_MANAGER_INTERFACE, setting.method(), (ifindex, value))
            .map_err(bus_error(setting.method()))
    }

    fn flush_caches(&self) -> Result<()> {
        self.proxy()
            .method_call(RESOLVED_MANAGER_INTERFACE, "FlushCaches", ())
            .map_err(bus_error("FlushCaches"))
    }

    fn revert_link(&self, ifindex: i32) -> Result<()> {
        self.proxy()
            .method_call(RESOLVED_MANAGER_INTERFACE, "RevertLink", (ifindex,))
            .map_err(bus_error("RevertLink"))
    }
}
