//! Reading and writing `resolv.conf(5)` files.

use crate::constants::GENERATED_MARKER;
use crate::error::{DnsError, Result};
use crate::network::dns::fqdn::Fqdn;
use crate::network::dns::osconfig::OsConfig;
use resolv_conf::ScopedIp;
use std::fmt;
use std::fmt::Write;
use std::net::IpAddr;

/// The program that manages a resolver file, as claimed by its header comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvOwner {
    SystemdResolved,
    NetworkManager,
    Resolvconf,
    Unknown,
}

impl fmt::Display for ResolvOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolvOwner::SystemdResolved => "systemd-resolved",
            ResolvOwner::NetworkManager => "NetworkManager",
            ResolvOwner::Resolvconf => "resolvconf",
            ResolvOwner::Unknown => "unknown",
        };

        f.write_str(name)
    }
}

/// Returns the program that claims to manage the resolver file `contents`.
///
/// Only the leading comment block is inspected; the last marker found wins.
pub fn resolv_owner(contents: &[u8]) -> ResolvOwner {
    let mut likely = ResolvOwner::Unknown;

    for line in String::from_utf8_lossy(contents).lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('#') {
            // First non-comment line ends the header.
            return likely;
        }

        if line.contains("systemd-resolved") {
            likely = ResolvOwner::SystemdResolved;
        } else if line.contains("NetworkManager") {
            likely = ResolvOwner::NetworkManager;
        } else if line.contains("resolvconf") {
            likely = ResolvOwner::Resolvconf;
        }
    }

    likely
}

/// Reports whether `contents` was generated by this crate.
pub fn is_generated(contents: &[u8]) -> bool {
    String::from_utf8_lossy(contents).contains(GENERATED_MARKER)
}

/// Parses the nameservers and search domains out of a resolver file.
///
/// Directives other than `nameserver`, `search` and `domain` are ignored.
pub fn read_resolv(contents: &[u8]) -> Result<OsConfig> {
    let relevant = String::from_utf8_lossy(contents)
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with("nameserver")
                || line.starts_with("search")
                || line.starts_with("domain")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let parsed = resolv_conf::Config::parse(relevant.as_bytes())
        .map_err(|e| DnsError::Parse(format!("resolv.conf: {e}")))?;

    let nameservers = parsed
        .nameservers
        .iter()
        .map(|ns| match ns {
            ScopedIp::V4(ip) => IpAddr::V4(*ip),
            ScopedIp::V6(ip, _) => IpAddr::V6(*ip),
        })
        .collect();

    let search_domains = parsed
        .get_search()
        .map(|domains| {
            domains
                .iter()
                .map(|domain| Fqdn::new(domain))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(OsConfig {
        nameservers,
        search_domains,
        match_domains: Vec::new(),
    })
}

/// Renders a resolver file pointing at `nameservers`, with `search_domains`.
pub fn write_resolv_conf(nameservers: &[IpAddr], search_domains: &[Fqdn]) -> String {
    let mut out = format!(
        "# resolv.conf(5) file {GENERATED_MARKER}\n\
         # DO NOT EDIT THIS FILE BY HAND -- CHANGES WILL BE OVERWRITTEN\n\n"
    );

    for ns in nameservers {
        let _ = writeln!(out, "nameserver {ns}");
    }

    if !search_domains.is_empty() {
        let domains = search_domains
            .iter()
            .map(Fqdn::without_trailing_dot)
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "search {domains}");
    }

    out
}
