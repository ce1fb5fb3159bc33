//! Detection of the DNS management mechanism in use on the host.

use crate::constants::{
    NM_DNS_MANAGER_PATH, NM_SERVICE, RESOLVED_PATH, RESOLVED_SERVICE, RESOLVED_STUB_ADDR, RESOLV_CONF,
};
use crate::error::{DnsError, Result};
use crate::network::dns::resolvconf_file::{read_resolv, resolv_owner, ResolvOwner};
use serde::Deserialize;
use std::fmt;
use std::io;
use std::net::IpAddr;
use tracing::{info, warn};
use version_compare::Cmp;

/// A DNS management mechanism, and hence the configurator used for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsMode {
    Direct,
    SystemdResolved,
    NetworkManager,
    DebianResolvconf,
    Openresolv,
}

impl fmt::Display for DnsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DnsMode::Direct => "direct",
            DnsMode::SystemdResolved => "systemd-resolved",
            DnsMode::NetworkManager => "network-manager",
            DnsMode::DebianResolvconf => "debian-resolvconf",
            DnsMode::Openresolv => "openresolv",
        };

        f.write_str(name)
    }
}

/// Flavor of the installed `resolvconf` program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvconfStyle {
    /// No `resolvconf` program is installed.
    Absent,
    Debian,
    Openresolv,
}

/// Range of NetworkManager versions that must be configured through NetworkManager
/// rather than through systemd-resolved directly.
///
/// NetworkManager before 1.26.6 programmed resolved such that its own settings always took
/// precedence over other resolved clients, so DNS has to be set through it. 1.26.6 and later
/// fixed that, but ignore DNS settings for unmanaged interfaces, so resolved must be used
/// directly. Versions older than 1.26 reject DNS settings on unmanaged interfaces outright.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NmVersionWindow {
    pub first: String,
    pub last: String,
}

impl Default for NmVersionWindow {
    fn default() -> Self {
        Self {
            first: "1.26.0".to_owned(),
            last: "1.26.5".to_owned(),
        }
    }
}

impl NmVersionWindow {
    /// Reports whether `version` lies within the window, inclusive.
    ///
    /// Returns `None` if `version` cannot be compared with the bounds.
    pub fn contains(&self, version: &str) -> Option<bool> {
        let compare =
            |bound: &str, operator: Cmp| version_compare::compare_to(version, bound, operator).ok();

        Some(compare(&self.first, Cmp::Ge)? && compare(&self.last, Cmp::Le)?)
    }
}

/// The probes mode detection runs against the live system.
pub trait ProbeEnv {
    /// Reads `/etc/resolv.conf`.
    fn read_resolv_conf(&self) -> io::Result<Vec<u8>>;

    /// Pings a D-Bus peer with a bounded timeout.
    fn dbus_ping(&self, name: &str, object_path: &str) -> Result<()>;

    /// Succeeds if NetworkManager delegates DNS to systemd-resolved.
    fn nm_is_using_resolved(&self) -> Result<()>;

    /// Returns NetworkManager's version string.
    fn nm_version(&self) -> Result<String>;

    fn resolvconf_style(&self) -> ResolvconfStyle;
}

/// Key/value trace of the decisions taken during mode detection.
#[derive(Debug, Default)]
pub struct ModeTrace {
    entries: Vec<(&'static str, String)>,
}

impl ModeTrace {
    fn push(&mut self, key: &'static str, value: impl fmt::Display) {
        self.entries.push((key, value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ModeTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("]")
    }
}

/// Determines which DNS mode to use on this Linux host.
///
/// Probe failures fall back to [`DnsMode::Direct`]. Failing to read an existing
/// `/etc/resolv.conf` or to read the NetworkManager version is an error.
/// The decision trace is logged as a single line.
///
/// ### Arguments
/// - `env` - the probes to run against the system
/// - `nm_unsafe_versions` - NetworkManager versions that must be configured through NetworkManager
pub fn dns_mode(env: &impl ProbeEnv, nm_unsafe_versions: &NmVersionWindow) -> Result<DnsMode> {
    let mut trace = ModeTrace::default();
    let mode = detect_mode(env, nm_unsafe_versions, &mut trace);

    if let Ok(mode) = &mode {
        trace.push("ret", mode);
    }
    info!("dns: {trace}");

    mode
}

fn detect_mode(
    env: &impl ProbeEnv,
    nm_unsafe_versions: &NmVersionWindow,
    trace: &mut ModeTrace,
) -> Result<DnsMode> {
    let contents = match env.read_resolv_conf() {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            trace.push("rc", "missing");
            return Ok(DnsMode::Direct);
        }
        Err(e) => {
            return Err(DnsError::ReadResolvConf {
                path: RESOLV_CONF.into(),
                source: e,
            })
        }
    };

    match resolv_owner(&contents) {
        ResolvOwner::SystemdResolved => {
            trace.push("rc", "resolved");

            // Some systems have a resolv.conf that claims to be managed by resolved
            // without pointing at it. resolved must not be programmed in that case.
            if resolved_is_actually_resolver(&contents).is_err() {
                trace.push("resolved", "not-in-use");
                return Ok(DnsMode::Direct);
            }
            if env.dbus_ping(RESOLVED_SERVICE, RESOLVED_PATH).is_err() {
                trace.push("resolved", "no");
                return Ok(DnsMode::Direct);
            }
            trace.push("resolved", "yes");

            if env.dbus_ping(NM_SERVICE, NM_DNS_MANAGER_PATH).is_err() {
                trace.push("nm", "no");
                return Ok(DnsMode::SystemdResolved);
            }
            trace.push("nm", "yes");

            if env.nm_is_using_resolved().is_err() {
                trace.push("nm-resolved", "no");
                return Ok(DnsMode::SystemdResolved);
            }
            trace.push("nm-resolved", "yes");

            // Inside the window resolved has to be programmed through NetworkManager,
            // accepting that NetworkManager drops the interface's IPv6 configuration.
            let version = env
                .nm_version()
                .map_err(|e| DnsError::NetworkManagerVersion(Box::new(e)))?;

            match nm_unsafe_versions.contains(&version) {
                Some(true) => {
                    trace.push("nm-safe", "yes");
                    Ok(DnsMode::NetworkManager)
                }
                Some(false) => {
                    trace.push("nm-safe", "no");
                    Ok(DnsMode::SystemdResolved)
                }
                // An unrecognizable version is treated as outside the window.
                None => {
                    trace.push("nm-safe", "unparsable");
                    Ok(DnsMode::SystemdResolved)
                }
            }
        }
        ResolvOwner::Resolvconf => {
            trace.push("rc", "resolvconf");

            match env.resolvconf_style() {
                ResolvconfStyle::Absent => {
                    trace.push("resolvconf", "no");
                    Ok(DnsMode::Direct)
                }
                ResolvconfStyle::Debian => {
                    trace.push("resolvconf", "debian");
                    Ok(DnsMode::DebianResolvconf)
                }
                ResolvconfStyle::Openresolv => {
                    trace.push("resolvconf", "openresolv");
                    Ok(DnsMode::Openresolv)
                }
            }
        }
        ResolvOwner::NetworkManager => {
            // Configuring DNS through NetworkManager loses the interface's IPv6
            // configuration, so bypass it by rewriting resolv.conf.
            trace.push("rc", "nm");
            Ok(DnsMode::Direct)
        }
        ResolvOwner::Unknown => {
            trace.push("rc", "unknown");
            warn!("[unexpected] unrecognized owner of {RESOLV_CONF}, using direct manager");
            Ok(DnsMode::Direct)
        }
    }
}

/// Succeeds if every nameserver in the resolver file is the systemd-resolved stub.
///
/// Some systems list the stub more than once, so any number of repeats is accepted.
pub fn resolved_is_actually_resolver(contents: &[u8]) -> Result<()> {
    let config = read_resolv(contents)?;

    if config.nameservers.is_empty() {
        return Err(DnsError::Parse("resolv.conf has no nameservers".to_owned()));
    }

    if config
        .nameservers
        .iter()
        .any(|ns| *ns != IpAddr::V4(RESOLVED_STUB_ADDR))
    {
        return Err(DnsError::Parse(
            "resolv.conf doesn't point to systemd-resolved".to_owned(),
        ));
    }

    Ok(())
}
