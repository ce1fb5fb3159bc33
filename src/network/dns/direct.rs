//! Configurator that rewrites `/etc/resolv.conf` directly.
//!
//! The file found before our first write is moved to a backup location and restored on
//! revert, so it doubles as the OS base configuration.

use crate::constants::{RESOLV_CONF, RESOLV_CONF_BACKUP};
use crate::error::Result;
use crate::network::dns::osconfig::{OsConfig, OsConfigurator};
use crate::network::dns::resolvconf_file::{is_generated, read_resolv, write_resolv_conf};
use crate::utils::command::run_to_completion;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Whole-file filesystem operations on absolute paths.
pub trait WholeFileFs {
    fn exists(&self, path: &str) -> io::Result<bool>;
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;
    fn write_file(&self, path: &str, contents: &[u8], mode: u32) -> io::Result<()>;
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;
    fn remove(&self, path: &str) -> io::Result<()>;
}

/// [`WholeFileFs`] on the real filesystem, optionally relative to a root directory.
#[derive(Debug, Clone)]
pub struct DirectFs {
    root: PathBuf,
}

impl DirectFs {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Resolves every absolute path relative to `root` (useful for testing).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Default for DirectFs {
    fn default() -> Self {
        Self::new()
    }
}

impl WholeFileFs for DirectFs {
    fn exists(&self, path: &str) -> io::Result<bool> {
        match fs::symlink_metadata(self.path(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(path))
    }

    fn write_file(&self, path: &str, contents: &[u8], mode: u32) -> io::Result<()> {
        let path = self.path(path);
        fs::write(&path, contents)?;
        set_mode(&path, mode)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.path(from), self.path(to))
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.path(path))
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Writes `contents` to `path` through a temporary file, so readers never see a partial file.
fn atomic_write_file(fs: &impl WholeFileFs, path: &str, contents: &[u8], mode: u32) -> io::Result<()> {
    let tmp = format!("{path}.hostdns-tmp");
    fs.write_file(&tmp, contents, mode)?;

    fs.rename(&tmp, path).inspect_err(|_| {
        let _ = fs.remove(&tmp);
    })
}

/// An [`OsConfigurator`] which manages `/etc/resolv.conf` as a plain file.
pub struct DirectManager<F: WholeFileFs = DirectFs> {
    fs: F,
    restart_resolved: bool,
}

impl DirectManager<DirectFs> {
    /// Creates a configurator for the real `/etc/resolv.conf`.
    pub fn new() -> Self {
        Self {
            fs: DirectFs::new(),
            restart_resolved: true,
        }
    }
}

impl Default for DirectManager<DirectFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: WholeFileFs> DirectManager<F> {
    /// Creates a configurator on the given filesystem. systemd-resolved is never restarted.
    pub fn on_fs(fs: F) -> Self {
        Self {
            fs,
            restart_resolved: false,
        }
    }

    /// Reports whether the current resolv.conf was written by us.
    fn owned_by_us(&self) -> Result<bool> {
        match self.fs.read_file(RESOLV_CONF) {
            Ok(contents) => Ok(is_generated(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Moves the current resolv.conf to the backup location, unless it is already ours.
    fn backup_config(&self) -> Result<()> {
        if !self.fs.exists(RESOLV_CONF)? || self.owned_by_us()? {
            return Ok(());
        }

        self.fs.rename(RESOLV_CONF, RESOLV_CONF_BACKUP)?;
        debug!("backed up {RESOLV_CONF} to {RESOLV_CONF_BACKUP}");

        Ok(())
    }

    /// Puts the backed-up resolv.conf back in place.
    fn restore_backup(&self) -> Result<()> {
        if !self.fs.exists(RESOLV_CONF_BACKUP)? {
            // Nothing was backed up; remove our file if it is the one in place.
            if self.owned_by_us()? {
                self.fs.remove(RESOLV_CONF)?;
            }
            return Ok(());
        }

        if self.fs.exists(RESOLV_CONF)? && !self.owned_by_us()? {
            // Someone else replaced our file. Theirs wins, and the backup is stale.
            warn!("{RESOLV_CONF} was replaced by another program, discarding backup");
            self.fs.remove(RESOLV_CONF_BACKUP)?;
            return Ok(());
        }

        self.fs.rename(RESOLV_CONF_BACKUP, RESOLV_CONF)?;
        info!("restored {RESOLV_CONF} from backup");

        Ok(())
    }

    /// Restarts systemd-resolved (best effort) so it picks up a file it used to manage.
    fn restart_resolved_if_running(&self) {
        if !self.restart_resolved || which::which("systemctl").is_err() {
            return;
        }

        // is-active exits non-zero if the service is not running.
        if run_to_completion("systemctl", ["is-active", "--quiet", "systemd-resolved.service"])
            .is_err()
        {
            return;
        }

        if let Err(e) = run_to_completion("systemctl", ["restart", "systemd-resolved.service"]) {
            warn!("failed to restart systemd-resolved: {e}");
        }
    }
}

impl<F: WholeFileFs> OsConfigurator for DirectManager<F> {
    fn set_dns(&mut self, config: OsConfig) -> Result<()> {
        config.ensure_global()?;

        if config.is_zero() {
            self.restore_backup()?;
        } else {
            self.backup_config()?;

            let contents = write_resolv_conf(&config.nameservers, &config.search_domains);
            atomic_write_file(&self.fs, RESOLV_CONF, contents.as_bytes(), 0o644)?;
        }

        self.restart_resolved_if_running();

        Ok(())
    }

    fn supports_split_dns(&self) -> bool {
        false
    }

    fn get_base_config(&self) -> Result<OsConfig> {
        let path = if self.owned_by_us()? {
            RESOLV_CONF_BACKUP
        } else {
            RESOLV_CONF
        };

        match self.fs.read_file(path) {
            Ok(contents) => read_resolv(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(OsConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.restore_backup()?;
        self.restart_resolved_if_running();

        Ok(())
    }
}
