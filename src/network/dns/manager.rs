//! Translation of a requested [`Config`] into what the OS and the local stub resolver need.

use crate::error::Result;
use crate::health::Health;
use crate::network::dns::config::{to_ips_only, Config, Resolver};
use crate::network::dns::fqdn::Fqdn;
use crate::network::dns::osconfig::{OsConfig, OsConfigurator};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// The result of compiling a [`Config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledConfig {
    /// What gets installed in the OS.
    pub os: OsConfig,
    /// Upstream resolvers the local stub forwards to, by suffix. `.` is the catch-all.
    pub stub_routes: BTreeMap<Fqdn, Vec<Resolver>>,
    /// Suffixes the local stub answers authoritatively from `hosts`.
    pub local_domains: Vec<Fqdn>,
    pub hosts: BTreeMap<Fqdn, Vec<IpAddr>>,
}

/// Owns the OS configurator and keeps it in sync with the requested [`Config`].
pub struct Manager {
    os: Box<dyn OsConfigurator>,
    health: Arc<Health>,
    service_ip: IpAddr,
}

impl Manager {
    /// Creates a new manager.
    ///
    /// ### Arguments
    /// - `os` - the OS configurator
    /// - `health` - the health registry
    /// - `service_ip` - the address of the local stub resolver
    pub fn new(os: Box<dyn OsConfigurator>, health: Arc<Health>, service_ip: IpAddr) -> Self {
        Self {
            os,
            health,
            service_ip,
        }
    }

    /// Applies `config`, returning what the local stub resolver must serve.
    ///
    /// The outcome is recorded as the `dns-os` health state.
    pub fn set(&mut self, config: &Config) -> Result<CompiledConfig> {
        let result = self.compile(config).and_then(|compiled| {
            debug!("setting OS DNS config: {:?}", compiled.os);
            self.os.set_dns(compiled.os.clone())?;
            Ok(compiled)
        });
        self.health.set_dns_os_health(result.as_ref().err());

        result
    }

    /// Returns the OS base configuration, see [`OsConfigurator::get_base_config`].
    pub fn base_config(&self) -> Result<OsConfig> {
        self.os.get_base_config()
    }

    /// Removes everything installed in the OS.
    pub fn down(&mut self) -> Result<()> {
        info!("removing DNS configuration");
        self.os.close()
    }

    /// Splits `config` into the OS part and the local stub part.
    pub fn compile(&self, config: &Config) -> Result<CompiledConfig> {
        let mut compiled = CompiledConfig {
            hosts: config.hosts.clone(),
            ..Default::default()
        };

        for (suffix, resolvers) in &config.routes {
            if resolvers.is_empty() {
                compiled.local_domains.push(suffix.clone());
            } else {
                compiled.stub_routes.insert(suffix.clone(), resolvers.clone());
            }
        }

        if !config.needs_os_resolver() {
            // Nothing to resolve, just set the search domains.
            compiled.os.search_domains = config.search_domains.clone();
            return Ok(compiled);
        }

        if config.has_default_ip_resolvers_only() {
            // Plain IP resolvers can go straight into the OS, no stub needed.
            compiled.os = OsConfig {
                nameservers: to_ips_only(&config.default_resolvers),
                search_domains: config.search_domains.clone(),
                match_domains: Vec::new(),
            };
            return Ok(compiled);
        }

        if config.has_default_resolvers() {
            // Routes or non-IP defaults: the stub handles everything.
            compiled
                .stub_routes
                .insert(Fqdn::root(), config.default_resolvers.clone());
            compiled.os = OsConfig {
                nameservers: vec![self.service_ip],
                search_domains: config.search_domains.clone(),
                match_domains: Vec::new(),
            };
            return Ok(compiled);
        }

        // Only routes from here on.
        if self.os.supports_split_dns() {
            let match_domains = config.match_domains();

            if let Some(resolvers) = config.single_resolver_set().filter(|set| {
                !set.is_empty() && set.iter().all(|resolver| resolver.plain_ip().is_some())
            }) {
                // The OS can route these suffixes to the resolvers natively.
                compiled.stub_routes.clear();
                compiled.os = OsConfig {
                    nameservers: to_ips_only(resolvers),
                    search_domains: config.search_domains.clone(),
                    match_domains,
                };
                return Ok(compiled);
            }

            compiled.os = OsConfig {
                nameservers: vec![self.service_ip],
                search_domains: config.search_domains.clone(),
                match_domains,
            };
            return Ok(compiled);
        }

        // No split DNS: take over all queries, and forward what we don't route
        // to the resolvers the OS would have used.
        let base = self.os.get_base_config()?;
        let fallback = base
            .nameservers
            .iter()
            .map(|ip| Resolver::new(ip.to_string()))
            .collect::<Vec<_>>();
        compiled.stub_routes.insert(Fqdn::root(), fallback);

        let mut search_domains = config.search_domains.clone();
        search_domains.extend(base.search_domains);
        compiled.os = OsConfig {
            nameservers: vec![self.service_ip],
            search_domains,
            match_domains: Vec::new(),
        };

        Ok(compiled)
    }
}
