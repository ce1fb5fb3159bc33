use crate::network::dns::fqdn::Fqdn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

/// The port plain DNS resolvers listen on.
const DNS_PORT: u16 = 53;

/// An upstream DNS resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolver {
    /// Address of the resolver: a bare IP, an `ip:port` pair or a URL.
    pub addr: String,
    /// IPs to use for `addr` when it is a hostname.
    #[serde(default)]
    pub bootstrap_resolution: Vec<IpAddr>,
}

impl Resolver {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            bootstrap_resolution: Vec::new(),
        }
    }

    /// Returns the resolver's IP if it is a bare IP or an IP on port 53.
    pub fn plain_ip(&self) -> Option<IpAddr> {
        if let Ok(addr) = self.addr.parse::<SocketAddr>() {
            return (addr.port() == DNS_PORT).then_some(addr.ip());
        }

        self.addr.parse::<IpAddr>().ok()
    }
}

/// A DNS configuration, as requested by the VPN client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolvers for names not covered by a more specific route.
    /// If empty, the OS's own resolvers are used.
    pub default_resolvers: Vec<Resolver>,
    /// Maps a DNS suffix to the resolvers for queries within it.
    /// An entry with no resolvers is answered authoritatively from `hosts`.
    pub routes: BTreeMap<Fqdn, Vec<Resolver>>,
    /// Suffixes to try when expanding single-label queries.
    pub search_domains: Vec<Fqdn>,
    /// Static records, a mix of IPv4 and IPv6.
    /// A record here only resolves if `routes` covers its name.
    pub hosts: BTreeMap<Fqdn, Vec<IpAddr>>,
}

impl Config {
    /// Reports whether the configuration requires a resolver at the OS level.
    pub fn needs_os_resolver(&self) -> bool {
        self.has_default_resolvers() || self.has_routes()
    }

    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty()
    }

    pub fn has_default_resolvers(&self) -> bool {
        !self.default_resolvers.is_empty()
    }

    /// Reports whether the only resolvers are default resolvers, all of which are plain IPs
    /// (optionally with port 53).
    pub fn has_default_ip_resolvers_only(&self) -> bool {
        if !self.has_default_resolvers() || self.has_routes() {
            return false;
        }

        self.default_resolvers
            .iter()
            .all(|resolver| resolver.plain_ip().is_some())
    }

    /// Returns the resolvers shared by every route, or `None` if routes disagree
    /// or there are no routes.
    pub fn single_resolver_set(&self) -> Option<&[Resolver]> {
        let mut routes = self.routes.values();
        let first = routes.next()?;

        routes
            .all(|resolvers| resolvers == first)
            .then_some(first.as_slice())
    }

    /// Returns the route suffixes, ordered by their trailing-dot form.
    pub fn match_domains(&self) -> Vec<Fqdn> {
        // `Fqdn` orders by its trailing-dot form, so the map is already sorted.
        self.routes.keys().cloned().collect()
    }
}

/// Returns the plain IPs of `resolvers`, skipping any that are not plain IPs.
pub fn to_ips_only(resolvers: &[Resolver]) -> Vec<IpAddr> {
    resolvers.iter().filter_map(Resolver::plain_ip).collect()
}

#[cfg(test)]
mod tests {
    use super::{to_ips_only, Config, Resolver};
    use crate::network::dns::fqdn::Fqdn;
    use rstest::rstest;
    use std::net::IpAddr;

    fn fqdn(name: &str) -> Fqdn {
        Fqdn::new(name).unwrap()
    }

    fn resolvers(addrs: &[&str]) -> Vec<Resolver> {
        addrs.iter().map(|addr| Resolver::new(*addr)).collect()
    }

    #[rstest]
    #[case(&["1.1.1.1"], true)]
    #[case(&["1.1.1.1:53", "8.8.8.8"], true)]
    #[case(&["2606:4700::1111"], true)]
    #[case(&["[2606:4700::1111]:53"], true)]
    #[case(&["1.1.1.1:5353"], false)]
    #[case(&["dns.example.com"], false)]
    #[case(&["https://dns.example.com/dns-query"], false)]
    #[case(&["1.1.1.1", "tls://1.1.1.1"], false)]
    #[case(&[], false)]
    fn test_default_ip_resolvers_only(#[case] addrs: &[&str], #[case] expected: bool) {
        let config = Config {
            default_resolvers: resolvers(addrs),
            ..Default::default()
        };

        assert_eq!(config.has_default_ip_resolvers_only(), expected);
    }

    #[test]
    fn test_default_ip_resolvers_with_routes() {
        let mut config = Config {
            default_resolvers: resolvers(&["1.1.1.1"]),
            ..Default::default()
        };
        config
            .routes
            .insert(fqdn("corp.example.com"), resolvers(&["10.0.0.53"]));

        assert!(!config.has_default_ip_resolvers_only());
        assert!(config.needs_os_resolver());
    }

    #[test]
    fn test_needs_os_resolver() {
        let mut config = Config::default();
        assert!(!config.needs_os_resolver());

        config.search_domains.push(fqdn("example.com"));
        assert!(!config.needs_os_resolver());

        config.routes.insert(fqdn("ts.net"), Vec::new());
        assert!(config.needs_os_resolver());
    }

    #[test]
    fn test_match_domains_sorted() {
        let mut config = Config::default();
        for name in ["b.example.com", "a-b", "a", "z", "a.example.com"] {
            config.routes.insert(fqdn(name), Vec::new());
        }
        // Re-inserting an existing suffix must not duplicate it.
        config.routes.insert(fqdn("A."), resolvers(&["1.1.1.1"]));

        let names: Vec<_> = config
            .match_domains()
            .iter()
            .map(|d| d.with_trailing_dot().to_owned())
            .collect();
        assert_eq!(
            names,
            vec!["a-b.", "a.", "a.example.com.", "b.example.com.", "z."]
        );
    }

    #[test]
    fn test_single_resolver_set() {
        let mut config = Config::default();
        assert!(config.single_resolver_set().is_none());

        config
            .routes
            .insert(fqdn("a.example.com"), resolvers(&["10.0.0.1", "10.0.0.2"]));
        config
            .routes
            .insert(fqdn("b.example.com"), resolvers(&["10.0.0.1", "10.0.0.2"]));
        assert_eq!(
            config.single_resolver_set(),
            Some(resolvers(&["10.0.0.1", "10.0.0.2"]).as_slice())
        );

        // Order matters.
        config
            .routes
            .insert(fqdn("c.example.com"), resolvers(&["10.0.0.2", "10.0.0.1"]));
        assert!(config.single_resolver_set().is_none());
    }

    #[test]
    fn test_single_resolver_set_compares_bootstrap() {
        let mut with_bootstrap = Resolver::new("https://dns.example.com/dns-query");
        with_bootstrap
            .bootstrap_resolution
            .push("192.0.2.1".parse::<IpAddr>().unwrap());

        let mut config = Config::default();
        config
            .routes
            .insert(fqdn("a.example.com"), vec![with_bootstrap.clone()]);
        config.routes.insert(
            fqdn("b.example.com"),
            vec![Resolver::new("https://dns.example.com/dns-query")],
        );
        assert!(config.single_resolver_set().is_none());

        config
            .routes
            .insert(fqdn("b.example.com"), vec![with_bootstrap]);
        assert!(config.single_resolver_set().is_some());
    }

    #[test]
    fn test_to_ips_only() {
        let ips = to_ips_only(&resolvers(&["1.1.1.1", "dns.example.com", "[::1]:53"]));
        assert_eq!(
            ips,
            vec![
                "1.1.1.1".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ]
        );
    }
}
