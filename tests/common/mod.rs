#![allow(dead_code)]

use hostdns::error::{DnsError, Result};
use hostdns::network::dns::{ProbeEnv, ResolvconfStyle};
use std::io;

pub const RESOLVED_FILE: &str = "\
# This is /run/systemd/resolve/stub-resolv.conf managed by man:systemd-resolved(8).
# Do not edit.

nameserver 127.0.0.53
options edns0 trust-ad
";

/// A host as seen by mode detection.
#[derive(Debug, Clone)]
pub struct TestHost {
    pub resolv_conf: Option<String>,
    pub resolved_running: bool,
    pub nm_running: bool,
    pub nm_dns_mode: String,
    pub nm_version: Option<String>,
    pub resolvconf: ResolvconfStyle,
}

impl TestHost {
    pub fn resolved() -> Self {
        Self {
            resolv_conf: Some(RESOLVED_FILE.to_owned()),
            resolved_running: true,
            nm_running: false,
            nm_dns_mode: "default".to_owned(),
            nm_version: None,
            resolvconf: ResolvconfStyle::Absent,
        }
    }

    pub fn resolved_with_nm(version: &str) -> Self {
        Self {
            nm_running: true,
            nm_dns_mode: "systemd-resolved".to_owned(),
            nm_version: Some(version.to_owned()),
            ..Self::resolved()
        }
    }

    pub fn with_file(contents: &str) -> Self {
        Self {
            resolv_conf: Some(contents.to_owned()),
            ..Self::resolved()
        }
    }
}

impl ProbeEnv for TestHost {
    fn read_resolv_conf(&self) -> io::Result<Vec<u8>> {
        self.resolv_conf
            .as_ref()
            .map(|contents| contents.as_bytes().to_vec())
            .ok_or_else(|| io::ErrorKind::NotFound.into())
    }

    fn dbus_ping(&self, name: &str, _object_path: &str) -> Result<()> {
        let running = match name {
            "org.freedesktop.resolve1" => self.resolved_running,
            "org.freedesktop.NetworkManager" => self.nm_running,
            _ => false,
        };

        if !running {
            return Err(DnsError::call("Ping", format!("{name} is not running")));
        }

        Ok(())
    }

    fn nm_is_using_resolved(&self) -> Result<()> {
        if self.nm_dns_mode != "systemd-resolved" {
            return Err(DnsError::call("Mode", self.nm_dns_mode.clone()));
        }

        Ok(())
    }

    fn nm_version(&self) -> Result<String> {
        self.nm_version
            .clone()
            .ok_or_else(|| DnsError::call("Get", "no Version property"))
    }

    fn resolvconf_style(&self) -> ResolvconfStyle {
        self.resolvconf
    }
}
