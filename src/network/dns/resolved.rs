//! Configurator backed by systemd-resolved's D-Bus API.

use crate::constants::{AF_INET, AF_INET6};
use crate::error::{DnsError, Result};
use crate::network::dns::fqdn::Fqdn;
use crate::network::dns::osconfig::{OsConfig, OsConfigurator};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use tracing::debug;

/// A nameserver in resolved's `SetLinkDNS` wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNameserver {
    pub family: i32,
    pub address: Vec<u8>,
}

impl From<IpAddr> for LinkNameserver {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => Self {
                family: AF_INET,
                address: addr.octets().to_vec(),
            },
            IpAddr::V6(addr) => Self {
                family: AF_INET6,
                address: addr.octets().to_vec(),
            },
        }
    }
}

/// A domain in resolved's `SetLinkDomains` wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDomain {
    pub domain: String,
    pub routing_only: bool,
}

/// Per-link protocol toggles that are switched off on our link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSetting {
    Llmnr,
    MulticastDns,
    Dnssec,
    DnsOverTls,
}

impl LinkSetting {
    /// The `org.freedesktop.resolve1.Manager` method setting this toggle.
    pub fn method(&self) -> &'static str {
        match self {
            LinkSetting::Llmnr => "SetLinkLLMNR",
            LinkSetting::MulticastDns => "SetLinkMulticastDNS",
            LinkSetting::Dnssec => "SetLinkDNSSEC",
            LinkSetting::DnsOverTls => "SetLinkDNSOverTLS",
        }
    }
}

impl fmt::Display for LinkSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkSetting::Llmnr => "LLMNR",
            LinkSetting::MulticastDns => "mdns",
            LinkSetting::Dnssec => "DNSSEC",
            LinkSetting::DnsOverTls => "DoT",
        };

        f.write_str(name)
    }
}

/// The subset of `org.freedesktop.resolve1.Manager` used to configure a link.
pub trait Resolve1 {
    fn set_link_dns(&self, ifindex: i32, nameservers: &[LinkNameserver]) -> Result<()>;
    fn set_link_domains(&self, ifindex: i32, domains: &[LinkDomain]) -> Result<()>;
    fn set_link_default_route(&self, ifindex: i32, default_route: bool) -> Result<()>;
    fn set_link_setting(&self, ifindex: i32, setting: LinkSetting, value: &str) -> Result<()>;
    fn flush_caches(&self) -> Result<()>;
    fn revert_link(&self, ifindex: i32) -> Result<()>;
}

/// An [`OsConfigurator`] which uses the systemd-resolved D-Bus API.
pub struct ResolvedManager<B: Resolve1> {
    ifindex: i32,
    resolved: B,
}

impl<B: Resolve1> ResolvedManager<B> {
    /// Creates a configurator for the link with the given index.
    pub fn with_link(ifindex: i32, resolved: B) -> Self {
        Self { ifindex, resolved }
    }

    /// Calls that must succeed for the configuration to be in effect.
    fn apply(&self, config: &OsConfig) -> Result<()> {
        let nameservers = config
            .nameservers
            .iter()
            .copied()
            .map(LinkNameserver::from)
            .collect::<Vec<_>>();

        self.resolved.set_link_dns(self.ifindex, &nameservers)?;
        self.resolved
            .set_link_domains(self.ifindex, &link_domains(config))?;
        self.resolved
            .set_link_default_route(self.ifindex, config.match_domains.is_empty())?;

        Ok(())
    }

    /// Calls whose failure resolved copes with on its own (e.g. on old versions).
    fn apply_best_effort(&self) {
        for setting in [
            LinkSetting::Llmnr,
            LinkSetting::MulticastDns,
            LinkSetting::Dnssec,
            LinkSetting::DnsOverTls,
        ] {
            if let Err(e) = self.resolved.set_link_setting(self.ifindex, setting, "no") {
                debug!("failed to disable {setting}: {e}");
            }
        }

        if let Err(e) = self.resolved.flush_caches() {
            debug!("failed to flush resolved DNS cache: {e}");
        }
    }
}

/// Builds the link domain list: search domains first, then match domains not already
/// present (resolved treats search domains as match domains too), then a routing-only
/// root domain when full interception is requested.
fn link_domains(config: &OsConfig) -> Vec<LinkDomain> {
    let mut seen = HashSet::<&Fqdn>::new();
    let mut domains =
        Vec::with_capacity(config.search_domains.len() + config.match_domains.len() + 1);

    for domain in &config.search_domains {
        if seen.insert(domain) {
            domains.push(LinkDomain {
                domain: domain.with_trailing_dot().to_owned(),
                routing_only: false,
            });
        }
    }

    for domain in &config.match_domains {
        if seen.insert(domain) {
            domains.push(LinkDomain {
                domain: domain.with_trailing_dot().to_owned(),
                routing_only: true,
            });
        }
    }

    if config.match_domains.is_empty() && !config.nameservers.is_empty() {
        domains.push(LinkDomain {
            domain: ".".to_owned(),
            routing_only: true,
        });
    }

    domains
}

impl<B: Resolve1> OsConfigurator for ResolvedManager<B> {
    fn set_dns(&mut self, config: OsConfig) -> Result<()> {
        self.apply(&config)?;
        self.apply_best_effort();

        Ok(())
    }

    fn supports_split_dns(&self) -> bool {
        true
    }

    fn get_base_config(&self) -> Result<OsConfig> {
        Err(DnsError::BaseConfigNotSupported)
    }

    fn close(&mut self) -> Result<()> {
        self.resolved.revert_link(self.ifindex)
    }
}

#[cfg(target_os = "linux")]
impl ResolvedManager<crate::network::dns::dbus::SystemResolve1> {
    /// Creates a configurator for the interface `interface_name` on the system bus.
    pub fn new(interface_name: &str) -> Result<Self> {
        use crate::network::dns::dbus::SystemResolve1;
        use crate::utils::interface::interface_index;

        let resolved = SystemResolve1::new()?;
        let ifindex = interface_index(interface_name)?;

        Ok(Self::with_link(ifindex, resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tracing_test::traced_test;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Dns(i32, Vec<LinkNameserver>),
        Domains(i32, Vec<LinkDomain>),
        DefaultRoute(i32, bool),
        Setting(i32, LinkSetting, String),
        FlushCaches,
        Revert(i32),
    }

    /// Records calls; methods named in `failing` return an error.
    #[derive(Default)]
    struct RecordingResolved {
        calls: RefCell<Vec<Call>>,
        failing: Vec<&'static str>,
    }

    impl RecordingResolved {
        fn failing(methods: &[&'static str]) -> Self {
            Self {
                failing: methods.to_vec(),
                ..Default::default()
            }
        }

        fn record(&self, method: &'static str, call: Call) -> Result<()> {
            self.calls.borrow_mut().push(call);
            if self.failing.contains(&method) {
                return Err(DnsError::call(method, "org.freedesktop.DBus.Error.AccessDenied"));
            }
            Ok(())
        }
    }

    impl Resolve1 for RecordingResolved {
        fn set_link_dns(&self, ifindex: i32, nameservers: &[LinkNameserver]) -> Result<()> {
            self.record("SetLinkDNS", Call::Dns(ifindex, nameservers.to_vec()))
        }

        fn set_link_domains(&self, ifindex: i32, domains: &[LinkDomain]) -> Result<()> {
            self.record("SetLinkDomains", Call::Domains(ifindex, domains.to_vec()))
        }

        fn set_link_default_route(&self, ifindex: i32, default_route: bool) -> Result<()> {
            self.record(
                "SetLinkDefaultRoute",
                Call::DefaultRoute(ifindex, default_route),
            )
        }

        fn set_link_setting(&self, ifindex: i32, setting: LinkSetting, value: &str) -> Result<()> {
            self.record(
                setting.method(),
                Call::Setting(ifindex, setting, value.to_owned()),
            )
        }

        fn flush_caches(&self) -> Result<()> {
            self.record("FlushCaches", Call::FlushCaches)
        }

        fn revert_link(&self, ifindex: i32) -> Result<()> {
            self.record("RevertLink", Call::Revert(ifindex))
        }
    }

    fn fqdns(names: &[&str]) -> Vec<Fqdn> {
        names.iter().map(|name| Fqdn::new(name).unwrap()).collect()
    }

    fn domain(name: &str, routing_only: bool) -> LinkDomain {
        LinkDomain {
            domain: name.to_owned(),
            routing_only,
        }
    }

    #[test]
    fn test_full_interception() {
        let mut manager = ResolvedManager::with_link(7, RecordingResolved::default());
        let config = OsConfig {
            nameservers: vec!["100.100.100.100".parse().unwrap()],
            search_domains: fqdns(&["corp.example.com", "example.net"]),
            match_domains: Vec::new(),
        };

        manager.set_dns(config).unwrap();

        let calls = manager.resolved.calls.borrow();
        assert_eq!(
            calls[0],
            Call::Dns(
                7,
                vec![LinkNameserver {
                    family: AF_INET,
                    address: vec![100, 100, 100, 100]
                }]
            )
        );
        assert_eq!(
            calls[1],
            Call::Domains(
                7,
                vec![
                    domain("corp.example.com.", false),
                    domain("example.net.", false),
                    domain(".", true),
                ]
            )
        );
        assert_eq!(calls[2], Call::DefaultRoute(7, true));
        assert_eq!(
            calls[3..7]
                .iter()
                .map(|call| match call {
                    Call::Setting(7, setting, value) if value == "no" => *setting,
                    other => panic!("unexpected call {other:?}"),
                })
                .collect::<Vec<_>>(),
            vec![
                LinkSetting::Llmnr,
                LinkSetting::MulticastDns,
                LinkSetting::Dnssec,
                LinkSetting::DnsOverTls
            ]
        );
        assert_eq!(calls[7], Call::FlushCaches);
        assert_eq!(calls.len(), 8);
    }

    #[test]
    fn test_split_dns_domains() {
        let mut manager = ResolvedManager::with_link(3, RecordingResolved::default());
        let config = OsConfig {
            nameservers: vec!["fd7a:115c:a1e0::53".parse().unwrap()],
            search_domains: fqdns(&["corp.example.com"]),
            match_domains: fqdns(&["corp.example.com", "ts.net", "ts.net"]),
        };

        manager.set_dns(config).unwrap();

        let calls = manager.resolved.calls.borrow();
        match &calls[0] {
            Call::Dns(3, nameservers) => {
                assert_eq!(nameservers[0].family, AF_INET6);
                assert_eq!(nameservers[0].address.len(), 16);
            }
            other => panic!("unexpected call {other:?}"),
        }
        assert_eq!(
            calls[1],
            Call::Domains(
                3,
                vec![domain("corp.example.com.", false), domain("ts.net.", true)]
            )
        );
        assert_eq!(calls[2], Call::DefaultRoute(3, false));
    }

    #[test]
    fn test_zero_config_sets_nothing() {
        let mut manager = ResolvedManager::with_link(3, RecordingResolved::default());

        manager.set_dns(OsConfig::default()).unwrap();

        let calls = manager.resolved.calls.borrow();
        assert_eq!(calls[0], Call::Dns(3, Vec::new()));
        assert_eq!(calls[1], Call::Domains(3, Vec::new()));
        assert_eq!(calls[2], Call::DefaultRoute(3, true));
    }

    #[test]
    fn test_mandatory_failure_aborts() {
        let mut manager =
            ResolvedManager::with_link(3, RecordingResolved::failing(&["SetLinkDomains"]));

        let err = manager.set_dns(OsConfig::default()).unwrap_err();

        assert!(matches!(err, DnsError::Call { op: "SetLinkDomains", .. }));
        assert_eq!(
            err.to_string(),
            "SetLinkDomains: org.freedesktop.DBus.Error.AccessDenied"
        );
        // Nothing is attempted after the failed call.
        assert_eq!(manager.resolved.calls.borrow().len(), 2);
    }

    #[test]
    #[traced_test]
    fn test_best_effort_failures_are_logged() {
        let mut manager = ResolvedManager::with_link(
            3,
            RecordingResolved::failing(&["SetLinkDNSSEC", "FlushCaches"]),
        );

        manager
            .set_dns(OsConfig {
                nameservers: vec!["10.0.0.53".parse().unwrap()],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(manager.resolved.calls.borrow().len(), 8);
        assert!(logs_contain("failed to disable DNSSEC"));
        assert!(logs_contain("failed to flush resolved DNS cache"));
    }

    #[test]
    fn test_capabilities_and_close() {
        let mut manager = ResolvedManager::with_link(9, RecordingResolved::default());

        assert!(manager.supports_split_dns());
        assert!(manager.get_base_config().unwrap_err().is_not_supported());

        manager.close().unwrap();
        assert_eq!(*manager.resolved.calls.borrow(), vec![Call::Revert(9)]);
    }

    #[test]
    fn test_close_failure_is_returned() {
        let mut manager = ResolvedManager::with_link(9, RecordingResolved::failing(&["RevertLink"]));

        let err = manager.close().unwrap_err();
        assert_eq!(err.to_string(), "RevertLink: org.freedesktop.DBus.Error.AccessDenied");
    }
}
