#![cfg(unix)]

use hostdns::health::Health;
use hostdns::network::dns::direct::{DirectFs, DirectManager};
use hostdns::network::dns::{Config, Fqdn, Manager, OsConfigurator, Resolver};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

const ORIGINAL: &str = "# Generated by NetworkManager\nsearch lan\nnameserver 192.168.1.1\n";

fn setup_root(root: &Path) {
    fs::create_dir_all(root.join("etc")).unwrap();
    fs::write(root.join("etc/resolv.conf"), ORIGINAL).unwrap();
}

fn resolv_conf(root: &Path) -> String {
    fs::read_to_string(root.join("etc/resolv.conf")).unwrap()
}

fn service_ip() -> IpAddr {
    "100.100.100.100".parse().unwrap()
}

#[test]
fn test_split_routes_without_split_dns() {
    let dir = tempfile::tempdir().unwrap();
    setup_root(dir.path());

    let os = DirectManager::on_fs(DirectFs::with_root(dir.path()));
    let health = Arc::new(Health::new());
    let mut manager = Manager::new(Box::new(os), health.clone(), service_ip());

    let mut config = Config {
        search_domains: vec![Fqdn::new("corp.example.com").unwrap()],
        ..Default::default()
    };
    config.routes.insert(
        Fqdn::new("corp.example.com").unwrap(),
        vec![Resolver::new("10.0.0.53")],
    );

    let compiled = manager.set(&config).unwrap();

    // The stub takes over, forwarding everything else to the original nameserver.
    assert_eq!(compiled.os.nameservers, vec![service_ip()]);
    assert_eq!(
        compiled.stub_routes[&Fqdn::root()],
        vec![Resolver::new("192.168.1.1")]
    );

    let written = resolv_conf(dir.path());
    assert!(written.contains("nameserver 100.100.100.100\n"));
    assert!(written.contains("search corp.example.com lan\n"));
    assert_eq!(health.dns_os_health(), None);

    // Reapplying still sees the original file as the base config.
    let again = manager.set(&config).unwrap();
    assert_eq!(again, compiled);

    manager.down().unwrap();
    assert_eq!(resolv_conf(dir.path()), ORIGINAL);
}

#[test]
fn test_plain_default_resolvers() {
    let dir = tempfile::tempdir().unwrap();
    setup_root(dir.path());

    let mut os = DirectManager::on_fs(DirectFs::with_root(dir.path()));
    let base = os.get_base_config().unwrap();

    let config = Config {
        default_resolvers: vec![Resolver::new("9.9.9.9"), Resolver::new("149.112.112.112:53")],
        ..Default::default()
    };
    let manager = Manager::new(
        Box::new(DirectManager::on_fs(DirectFs::with_root(dir.path()))),
        Arc::new(Health::new()),
        service_ip(),
    );
    let compiled = manager.compile(&config).unwrap();
    assert!(compiled.stub_routes.is_empty());

    os.set_dns(compiled.os).unwrap();
    let written = resolv_conf(dir.path());
    assert!(written.contains("nameserver 9.9.9.9\nnameserver 149.112.112.112\n"));
    assert_eq!(os.get_base_config().unwrap(), base);

    os.close().unwrap();
    assert_eq!(resolv_conf(dir.path()), ORIGINAL);
}
