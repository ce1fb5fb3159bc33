//! Configurators for the two `resolvconf(8)` implementations.

use crate::constants::{
    DEBIAN_LIST_RECORDS_PATHS, DEBIAN_RESOLVCONF_INTERFACES_DIR, DEBIAN_RESOLVCONF_RECORD,
    OPENRESOLV_INTERFACE, RESOLVCONF_COMMAND,
};
use crate::error::{DnsError, Result};
use crate::network::dns::mode::ResolvconfStyle;
use crate::network::dns::osconfig::{OsConfig, OsConfigurator};
use crate::network::dns::resolvconf_file::{read_resolv, write_resolv_conf};
use crate::utils::command::{check_output, run_command, run_command_in, run_to_completion, run_with_input};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Exit code of Debian's resolvconf when given an unknown option such as `--version`.
const DEBIAN_UNKNOWN_OPTION_CODE: i32 = 99;

/// Determines which `resolvconf` implementation is installed, if any.
pub fn resolvconf_style() -> ResolvconfStyle {
    if which::which(RESOLVCONF_COMMAND).is_err() {
        return ResolvconfStyle::Absent;
    }

    let output = run_command(RESOLVCONF_COMMAND, ["--version"])
        .and_then(|child| child.wait_with_output().map_err(DnsError::from));

    match output {
        Ok(output) => style_from_version_output(output.status.code(), &output.stdout),
        Err(e) => {
            debug!("running resolvconf --version: {e}");
            ResolvconfStyle::Openresolv
        }
    }
}

/// Classifies `resolvconf --version` by exit code and output.
fn style_from_version_output(code: Option<i32>, stdout: &[u8]) -> ResolvconfStyle {
    if code == Some(DEBIAN_UNKNOWN_OPTION_CODE) || stdout.starts_with(b"Debian resolvconf") {
        return ResolvconfStyle::Debian;
    }

    ResolvconfStyle::Openresolv
}

/// Renders `config` as the record fed to resolvconf on stdin.
fn render(config: &OsConfig) -> String {
    write_resolv_conf(&config.nameservers, &config.search_domains)
}

/// An [`OsConfigurator`] for Debian's resolvconf.
#[derive(Debug, Default)]
pub struct DebianResolvconfManager;

impl DebianResolvconfManager {
    pub fn new() -> Self {
        Self
    }

    fn delete_record(&self) -> Result<()> {
        run_to_completion(RESOLVCONF_COMMAND, ["-d", DEBIAN_RESOLVCONF_RECORD])?;
        Ok(())
    }
}

impl OsConfigurator for DebianResolvconfManager {
    fn set_dns(&mut self, config: OsConfig) -> Result<()> {
        config.ensure_global()?;

        if config.is_zero() {
            return self.delete_record();
        }

        run_with_input(
            RESOLVCONF_COMMAND,
            ["-a", DEBIAN_RESOLVCONF_RECORD],
            render(&config).as_bytes(),
        )?;

        Ok(())
    }

    fn supports_split_dns(&self) -> bool {
        false
    }

    fn get_base_config(&self) -> Result<OsConfig> {
        let list_records = DEBIAN_LIST_RECORDS_PATHS
            .iter()
            .copied()
            .find(|path| Path::new(path).exists())
            .ok_or_else(|| DnsError::call("list-records", "helper program not found"))?;

        let dir = Path::new(DEBIAN_RESOLVCONF_INTERFACES_DIR);
        let child = run_command_in(list_records, std::iter::empty::<&str>(), dir)?;
        let output = check_output(list_records, child.wait_with_output()?)?;

        let mut contents = Vec::new();
        for record in foreign_entries(&output.stdout, DEBIAN_RESOLVCONF_RECORD) {
            contents.extend(fs::read(dir.join(record))?);
            contents.push(b'\n');
        }

        read_resolv(&contents)
    }

    fn close(&mut self) -> Result<()> {
        self.delete_record()
    }
}

/// An [`OsConfigurator`] for openresolv.
#[derive(Debug, Default)]
pub struct OpenresolvManager;

impl OpenresolvManager {
    pub fn new() -> Self {
        Self
    }

    fn delete_interface(&self) -> Result<()> {
        run_to_completion(RESOLVCONF_COMMAND, ["-f", "-d", OPENRESOLV_INTERFACE])?;
        Ok(())
    }
}

impl OsConfigurator for OpenresolvManager {
    fn set_dns(&mut self, config: OsConfig) -> Result<()> {
        config.ensure_global()?;

        if config.is_zero() {
            return self.delete_interface();
        }

        // Metric 0 and exclusive mode make our nameservers the only ones in use.
        run_with_input(
            RESOLVCONF_COMMAND,
            ["-m", "0", "-x", "-a", OPENRESOLV_INTERFACE],
            render(&config).as_bytes(),
        )?;

        Ok(())
    }

    fn supports_split_dns(&self) -> bool {
        false
    }

    fn get_base_config(&self) -> Result<OsConfig> {
        let interfaces = run_to_completion(RESOLVCONF_COMMAND, ["-i"])?;
        let interfaces = foreign_entries(&interfaces.stdout, OPENRESOLV_INTERFACE);
        if interfaces.is_empty() {
            return Ok(OsConfig::default());
        }

        let mut args = vec!["-l".to_owned()];
        args.extend(interfaces);
        let output = run_to_completion(RESOLVCONF_COMMAND, &args)?;

        read_resolv(&output.stdout)
    }

    fn close(&mut self) -> Result<()> {
        self.delete_interface()
    }
}

/// Splits whitespace-separated names out of `output`, leaving out `ours`.
fn foreign_entries(output: &[u8], ours: &str) -> Vec<String> {
    String::from_utf8_lossy(output)
        .split_whitespace()
        .filter(|entry| *entry != ours)
        .map(str::to_owned)
        .collect()
}
