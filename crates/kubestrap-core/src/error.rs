//! Error types for lifecycle operations

use crate::download::DownloadError;
use crate::render::ArtifactKind;
use thiserror::Error;

/// Result type alias for kubestrap-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the resolver, generator, cache, probes and orchestrator
#[derive(Error, Debug)]
pub enum Error {
    /// The requested release is not a semantic version
    #[error("invalid Kubernetes version {version:?}: {source}")]
    InvalidVersion {
        /// The string as given
        version: String,
        /// Why it did not parse
        #[source]
        source: semver::Error,
    },

    /// An artifact could not be rendered
    #[error("rendering {artifact}: {reason}")]
    TemplateRender {
        /// Which artifact failed
        artifact: ArtifactKind,
        /// What went wrong
        reason: String,
    },

    /// The feature gate string is not a list of `Gate=bool` pairs
    #[error("parsing feature gates {gates:?}: {reason}")]
    FeatureGateParse {
        /// The gate string as configured
        gates: String,
        /// The offending entry
        reason: String,
    },

    /// A command failed or could not be run
    #[error("running `{command}`: {source}")]
    Exec {
        /// The exact command line
        command: String,
        /// Output captured before the failure
        output: String,
        /// The runner's error
        #[source]
        source: command_executor::Error,
    },

    /// A release binary could not be fetched or verified
    #[error("downloading {binary} {version}: {source}")]
    Download {
        /// Binary name
        binary: String,
        /// Requested release
        version: String,
        /// Transfer or checksum failure
        #[source]
        source: DownloadError,
    },

    /// A status query could not reach the node
    #[error("probing {target}: {source}")]
    Probe {
        /// What was being probed
        target: String,
        /// Transport failure
        #[source]
        source: command_executor::Error,
    },

    /// A file could not be staged onto the host
    #[error("transferring {path}: {source}")]
    Stage {
        /// Target path on the host
        path: String,
        /// The runner's error
        #[source]
        source: command_executor::Error,
    },

    /// A convergence loop ran out of attempts
    #[error("timed out waiting to {operation} after {attempts} attempts: {source}")]
    RetryExhausted {
        /// What was being waited on
        operation: String,
        /// Attempts made
        attempts: u32,
        /// The last failure
        #[source]
        source: Box<Error>,
    },

    /// The add-on catalog could not be enumerated
    #[error("enumerating add-ons: {0}")]
    Addons(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] kubestrap_config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lifecycle step failed
    #[error("{operation}: {source}")]
    Operation {
        /// The step, e.g. "generating kubeadm config"
        operation: &'static str,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a runner failure for `command`, keeping whatever output it produced
    pub fn exec(command: impl Into<String>, source: command_executor::Error) -> Self {
        Self::Exec {
            command: command.into(),
            output: source.output().unwrap_or_default().to_string(),
            source,
        }
    }

    /// Create an add-on enumeration error
    pub fn addons(message: impl Into<String>) -> Self {
        Self::Addons(message.into())
    }

    /// The innermost error, skipping [`Error::Operation`] wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Attach the name of the failing lifecycle step to a result
pub trait OperationContext<T> {
    /// Wrap the error, if any, in [`Error::Operation`]
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T, E: Into<Error>> OperationContext<T> for std::result::Result<T, E> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|e| Error::Operation {
            operation,
            source: Box::new(e.into()),
        })
    }
}
