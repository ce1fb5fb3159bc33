//! Registry of subsystem health, shared by the DNS configurators and their callers.

use crate::error::DnsError;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// A subsystem whose health is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    /// The OS DNS configurator.
    DnsOs,
    /// Detection of the host's DNS management mode.
    DnsManager,
}

impl Subsystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::DnsOs => "dns-os",
            Subsystem::DnsManager => "dns-manager",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded health error.
///
/// Holds the rendered message so it can be shared with every reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthError(Arc<str>);

impl HealthError {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HealthError {}

impl From<&DnsError> for HealthError {
    fn from(err: &DnsError) -> Self {
        Self::new(err.to_string())
    }
}

/// Callback invoked when a subsystem becomes healthy or unhealthy.
pub type Watcher = Arc<dyn Fn(Subsystem, Option<&HealthError>) + Send + Sync>;

/// A health item its owner marks as healthy or in a warning state.
#[derive(Debug, Default)]
pub struct Warnable {
    debug_flag: Option<String>,
    is_set: AtomicBool,
    err: Mutex<Option<HealthError>>,
}

impl Warnable {
    /// Updates the state. `Some` means unhealthy.
    pub fn set(&self, err: Option<HealthError>) {
        let mut guard = self.err.lock().unwrap_or_else(PoisonError::into_inner);
        self.is_set.store(err.is_some(), Ordering::Release);
        *guard = err;
    }

    /// Returns the current error, without locking when healthy.
    pub fn get(&self) -> Option<HealthError> {
        if !self.is_set.load(Ordering::Acquire) {
            return None;
        }

        self.err
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn debug_flag(&self) -> Option<&str> {
        self.debug_flag.as_deref()
    }
}

#[derive(Default)]
struct Inner {
    sys_err: HashMap<Subsystem, Option<HealthError>>,
    warnables: Vec<Arc<Warnable>>,
    watchers: Vec<Watcher>,
}

/// The health registry.
///
/// Created once and shared behind an [`Arc`] by everything that reports or reads health.
#[derive(Default)]
pub struct Health {
    inner: Mutex<Inner>,
}

impl Health {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the current error of `key`. `None` means healthy.
    ///
    /// Returns whether this was a transition between healthy and unhealthy. A subsystem that
    /// was never reported counts as healthy. A new error replacing an old one is stored
    /// without a transition.
    /// Watchers run only on transitions.
    pub fn set(&self, key: Subsystem, err: Option<HealthError>) -> bool {
        let watchers = {
            let mut inner = self.lock();
            if !set_locked(&mut inner.sys_err, key, err.clone()) {
                return false;
            }

            inner.watchers.clone()
        };

        match &err {
            Some(e) => warn!("health({key}): error: {e}"),
            None => info!("health({key}): ok"),
        }

        for watcher in watchers {
            watcher(key, err.as_ref());
        }

        true
    }

    /// Returns the last error recorded for `key`, or `None` if healthy or never set.
    pub fn get(&self, key: Subsystem) -> Option<HealthError> {
        self.lock().sys_err.get(&key).cloned().flatten()
    }

    /// Records the state of the OS DNS configurator.
    pub fn set_dns_os_health(&self, err: Option<&DnsError>) -> bool {
        self.set(Subsystem::DnsOs, err.map(HealthError::from))
    }

    /// Records the state of DNS mode detection.
    pub fn set_dns_manager_health(&self, err: Option<&DnsError>) -> bool {
        self.set(Subsystem::DnsManager, err.map(HealthError::from))
    }

    pub fn dns_os_health(&self) -> Option<HealthError> {
        self.get(Subsystem::DnsOs)
    }

    /// Registers a new, initially healthy, warnable.
    pub fn new_warnable(&self) -> Arc<Warnable> {
        self.register_warnable(Warnable::default())
    }

    /// Registers a new warnable that reports `debug_flag` while unhealthy.
    pub fn new_warnable_with_debug_flag(&self, debug_flag: impl Into<String>) -> Arc<Warnable> {
        self.register_warnable(Warnable {
            debug_flag: Some(debug_flag.into()),
            ..Default::default()
        })
    }

    fn register_warnable(&self, warnable: Warnable) -> Arc<Warnable> {
        let warnable = Arc::new(warnable);
        self.lock().warnables.push(warnable.clone());
        warnable
    }

    /// Registers `watcher` to be called on every subsystem transition.
    ///
    /// Watchers are called without the registry lock held.
    pub fn register_watcher(
        &self,
        watcher: impl Fn(Subsystem, Option<&HealthError>) + Send + Sync + 'static,
    ) {
        self.lock().watchers.push(Arc::new(watcher));
    }

    /// Returns every current problem as one error, or `None` if all is well.
    ///
    /// Messages are sorted so the result is stable.
    pub fn overall_error(&self) -> Option<HealthError> {
        let inner = self.lock();

        let mut problems = inner
            .sys_err
            .iter()
            .filter_map(|(key, err)| err.as_ref().map(|e| format!("{key}: {e}")))
            .chain(
                inner
                    .warnables
                    .iter()
                    .filter_map(|w| w.get().map(|e| e.to_string())),
            )
            .collect::<Vec<_>>();

        if problems.is_empty() {
            return None;
        }

        problems.sort();
        Some(HealthError::new(problems.join("; ")))
    }

    /// Returns the sorted debug flags of all unhealthy warnables.
    pub fn warnable_debug_flags(&self) -> Vec<String> {
        let inner = self.lock();

        let mut flags = inner
            .warnables
            .iter()
            .filter(|w| w.get().is_some())
            .filter_map(|w| w.debug_flag().map(str::to_owned))
            .collect::<Vec<_>>();

        flags.sort();
        flags
    }
}

impl fmt::Debug for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Health")
            .field("sys_err", &inner.sys_err)
            .field("warnables", &inner.warnables.len())
            .field("watchers", &inner.watchers.len())
            .finish()
    }
}

fn set_locked(
    sys_err: &mut HashMap<Subsystem, Option<HealthError>>,
    key: Subsystem,
    err: Option<HealthError>,
) -> bool {
    match sys_err.get_mut(&key) {
        None => {
            // Unknown counts as healthy, so only a first error is a transition.
            let transition = err.is_some();
            sys_err.insert(key, err);
            transition
        }
        Some(old) if old.is_some() == err.is_some() => {
            // Same state; keep the freshest error for diagnostics.
            if err.is_some() {
                *old = err;
            }
            false
        }
        Some(old) => {
            *old = err;
            true
        }
    }
}
