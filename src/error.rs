//! Error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used for failures coming from external mechanisms (D-Bus, processes, ...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for DNS configuration operations.
pub type Result<T> = std::result::Result<T, DnsError>;

/// Errors returned by the DNS configuration layer.
#[derive(Debug, Error)]
pub enum DnsError {
    /// The resolver file exists but could not be read.
    #[error("reading {}: {source}", path.display())]
    ReadResolvConf {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// NetworkManager is reachable but its version could not be determined.
    #[error("checking NetworkManager version: {0}")]
    NetworkManagerVersion(#[source] Box<DnsError>),

    /// A call into the underlying DNS mechanism failed.
    #[error("{op}: {source}")]
    Call {
        /// The name of the failed operation (e.g. `SetLinkDNS`).
        op: &'static str,
        #[source]
        source: BoxError,
    },

    /// The configurator cannot recover the OS base configuration.
    #[error("getting OS base config is not supported")]
    BaseConfigNotSupported,

    /// Match domains were requested from a configurator that only installs a global resolver.
    #[error("split DNS is not supported by this configurator")]
    SplitDnsNotSupported,

    /// The network interface could not be resolved.
    #[error("interface {name}: {reason}")]
    Interface { name: String, reason: String },

    /// An external command exited unsuccessfully.
    #[error("{program} failed: {stderr}")]
    Command { program: String, stderr: String },

    /// Input could not be parsed (resolver file contents, domain names).
    #[error("parse error: {0}")]
    Parse(String),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DnsError {
    /// Wraps an external failure with the name of the operation that produced it.
    pub fn call(op: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Call {
            op,
            source: source.into(),
        }
    }

    /// Returns `true` if this is the dedicated "base config not supported" error.
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::BaseConfigNotSupported)
    }
}
