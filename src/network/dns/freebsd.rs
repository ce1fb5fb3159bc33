use crate::constants::RESOLV_CONF;
use crate::error::{DnsError, Result};
use crate::health::Health;
use crate::network::dns::direct::{DirectFs, DirectManager, WholeFileFs};
use crate::network::dns::mode::{DnsMode, NmVersionWindow};
use crate::network::dns::osconfig::OsConfigurator;
use crate::network::dns::resolvconf::OpenresolvManager;
use crate::network::dns::resolvconf_file::{resolv_owner, ResolvOwner};
use std::io;
use tracing::info;

/// Chooses the DNS mode on FreeBSD, where only resolvconf and the plain file exist.
pub fn freebsd_dns_mode(fs: &impl WholeFileFs) -> Result<DnsMode> {
    let contents = match fs.read_file(RESOLV_CONF) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DnsMode::Direct),
        Err(source) => {
            return Err(DnsError::ReadResolvConf {
                path: RESOLV_CONF.into(),
                source,
            })
        }
    };

    let mode = match resolv_owner(&contents) {
        ResolvOwner::Resolvconf => DnsMode::Openresolv,
        _ => DnsMode::Direct,
    };
    info!("dns: using {mode}");

    Ok(mode)
}

/// Detects the DNS mode of this host.
pub fn detect_dns_mode(_nm_unsafe_versions: &NmVersionWindow) -> Result<Option<DnsMode>> {
    freebsd_dns_mode(&DirectFs::new()).map(Some)
}

/// Creates the configurator for this FreeBSD host.
///
/// NetworkManager is not used on FreeBSD, so `_nm_unsafe_versions` is ignored.
pub fn new_os_configurator(
    health: &Health,
    _interface_name: &str,
    _nm_unsafe_versions: &NmVersionWindow,
) -> Result<Box<dyn OsConfigurator>> {
    let mode = freebsd_dns_mode(&DirectFs::new());
    health.set_dns_manager_health(mode.as_ref().err());

    match mode? {
        DnsMode::Openresolv => Ok(Box::new(OpenresolvManager::new())),
        _ => Ok(Box::new(DirectManager::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_freebsd_modes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc")).unwrap();
        let root = DirectFs::with_root(dir.path());

        assert_eq!(freebsd_dns_mode(&root).unwrap(), DnsMode::Direct);

        let resolv_conf = dir.path().join("etc/resolv.conf");
        fs::write(&resolv_conf, "# Generated by resolvconf\nnameserver 10.0.0.1\n").unwrap();
        assert_eq!(freebsd_dns_mode(&root).unwrap(), DnsMode::Openresolv);

        fs::write(&resolv_conf, "nameserver 10.0.0.1\n").unwrap();
        assert_eq!(freebsd_dns_mode(&root).unwrap(), DnsMode::Direct);
    }
}
