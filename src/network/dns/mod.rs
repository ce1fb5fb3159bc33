pub mod config;
pub mod fqdn;
pub mod manager;
pub mod mode;
pub mod osconfig;
pub mod resolvconf_file;
pub mod resolved;

#[cfg(unix)]
pub mod direct;
#[cfg(unix)]
pub mod resolvconf;

#[cfg(target_os = "linux")]
pub mod dbus;
#[cfg(target_os = "linux")]
pub mod nm;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{configurator_for, detect_dns_mode, new_os_configurator, SystemProbes};

#[cfg(target_os = "freebsd")]
mod freebsd;
#[cfg(target_os = "freebsd")]
pub use freebsd::{detect_dns_mode, freebsd_dns_mode, new_os_configurator};

#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
mod noop;
#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
pub use noop::{detect_dns_mode, new_os_configurator, NoopManager};

pub use config::{Config, Resolver};
pub use fqdn::Fqdn;
pub use manager::{CompiledConfig, Manager};
pub use mode::{dns_mode, DnsMode, NmVersionWindow, ProbeEnv, ResolvconfStyle};
pub use osconfig::{OsConfig, OsConfigurator};
