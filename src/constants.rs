use std::net::Ipv4Addr;
use std::time::Duration;

/// Path of the system resolver configuration file.
pub const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Path where the direct configurator keeps the pre-existing resolver configuration.
pub const RESOLV_CONF_BACKUP: &str = "/etc/resolv.pre-hostdns-backup.conf";

/// Marker written into every resolver file generated by this crate.
pub const GENERATED_MARKER: &str = "generated by hostdns";

/// Listen address of the systemd-resolved stub resolver.
///
/// This address is hard-coded into resolved. resolved only counts as the system resolver
/// if this is the sole nameserver in `/etc/resolv.conf`.
pub const RESOLVED_STUB_ADDR: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 53);

/// Timeout for a single D-Bus liveness probe or property read during mode detection.
pub const DBUS_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout for a single D-Bus call while reconfiguring DNS.
pub const RECONFIG_TIMEOUT: Duration = Duration::from_secs(1);

/// Address family values used in the systemd-resolved wire format.
pub const AF_INET: i32 = 2;
pub const AF_INET6: i32 = 10;

/// systemd-resolved D-Bus names.
pub const RESOLVED_SERVICE: &str = "org.freedesktop.resolve1";
pub const RESOLVED_PATH: &str = "/org/freedesktop/resolve1";
pub const RESOLVED_MANAGER_INTERFACE: &str = "org.freedesktop.resolve1.Manager";

/// NetworkManager D-Bus names.
pub const NM_SERVICE: &str = "org.freedesktop.NetworkManager";
pub const NM_PATH: &str = "/org/freedesktop/NetworkManager";
pub const NM_DNS_MANAGER_PATH: &str = "/org/freedesktop/NetworkManager/DnsManager";
pub const NM_DNS_MANAGER_INTERFACE: &str = "org.freedesktop.NetworkManager.DnsManager";
pub const NM_DEVICE_INTERFACE: &str = "org.freedesktop.NetworkManager.Device";

/// Standard D-Bus interfaces.
pub const DBUS_PEER_INTERFACE: &str = "org.freedesktop.DBus.Peer";

/// The resolvconf program.
pub const RESOLVCONF_COMMAND: &str = "resolvconf";

/// Record name used with Debian's resolvconf. The `tun-` prefix sorts it ahead of
/// physical interfaces in `/etc/resolvconf/interface-order`.
pub const DEBIAN_RESOLVCONF_RECORD: &str = "tun-hostdns.inet";

/// Directory holding Debian resolvconf's per-interface records.
pub const DEBIAN_RESOLVCONF_INTERFACES_DIR: &str = "/etc/resolvconf/run/interface";

/// Candidate locations of Debian resolvconf's `list-records` helper.
pub const DEBIAN_LIST_RECORDS_PATHS: &[&str] = &[
    "/lib/resolvconf/list-records",
    "/usr/lib/resolvconf/list-records",
];

/// Interface name used with openresolv.
pub const OPENRESOLV_INTERFACE: &str = "hostdns";

/// Default address of the caller's local DNS stub.
pub const DEFAULT_SERVICE_IP: Ipv4Addr = Ipv4Addr::new(100, 100, 100, 100);
