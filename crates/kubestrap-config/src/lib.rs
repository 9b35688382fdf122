//! # Kubestrap Configuration
//!
//! YAML configuration for a single-node Kubernetes installation.
//!
//! A configuration document names the node, the Kubernetes release to run,
//! the container runtime, per-component flag overrides and a few switches
//! controlling what gets staged onto the host. The [`parser`] module turns a
//! file into a validated [`Config`].

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub mod parser;
pub mod resolver;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Malformed `component.key=value` extra option
    #[error("Invalid extra option {option:?}: {reason}")]
    InvalidExtraOption {
        /// The option as written
        option: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// The cluster to bootstrap
    pub cluster: ClusterConfig,

    /// Tool settings
    #[serde(default, skip_serializing_if = "Settings::is_default")]
    pub settings: Settings,

    /// Reach the node over SSH instead of running locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshSettings>,
}

/// Everything the lifecycle operations derive their behaviour from
///
/// Operations only ever read a `ClusterConfig`; derived values such as the
/// resolved version are recomputed on every call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClusterConfig {
    /// Node name, used for registration and the hosts file
    pub node_name: String,

    /// Address the API server advertises
    pub node_ip: String,

    /// Target release, e.g. `v1.13.0`
    pub kubernetes_version: String,

    /// Container runtime selector: empty, `docker`, `containerd`, `crio`, `cri-o` or a custom name
    #[serde(default)]
    pub container_runtime: String,

    /// Explicit CRI socket path, overriding the runtime's canonical socket
    #[serde(default)]
    pub cri_socket: String,

    /// Service network; the built-in default is used when empty
    #[serde(default)]
    pub service_cidr: String,

    /// Kubelet `--network-plugin` value
    #[serde(default)]
    pub network_plugin: String,

    /// Comma separated `Gate=bool` pairs
    #[serde(default)]
    pub feature_gates: String,

    /// Per-component flag overrides
    #[serde(default)]
    pub extra_options: Vec<ExtraOption>,

    /// Stage a bridge CNI configuration so pods can start without a network add-on
    #[serde(default)]
    pub enable_default_cni: bool,

    /// Load control-plane images from the local image cache before converging
    #[serde(default)]
    pub should_load_cached_images: bool,

    /// API server port; zero or negative selects the default
    #[serde(default)]
    pub node_port: i32,
}

/// A control-plane component that accepts extra flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    /// kube-apiserver
    Apiserver,
    /// kube-controller-manager
    ControllerManager,
    /// kube-scheduler
    Scheduler,
    /// kubelet
    Kubelet,
}

impl Component {
    /// The control-plane components configured through the bootstrap config
    pub const CONTROL_PLANE: [Component; 3] = [
        Component::Apiserver,
        Component::ControllerManager,
        Component::Scheduler,
    ];

    /// Name used in `component.key=value` options
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Apiserver => "apiserver",
            Component::ControllerManager => "controller-manager",
            Component::Scheduler => "scheduler",
            Component::Kubelet => "kubelet",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "apiserver" => Ok(Component::Apiserver),
            "controller-manager" => Ok(Component::ControllerManager),
            "scheduler" => Ok(Component::Scheduler),
            "kubelet" => Ok(Component::Kubelet),
            other => Err(format!("unknown component {:?}", other)),
        }
    }
}

/// A single `component.key=value` flag override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtraOption {
    /// Component receiving the flag
    pub component: Component,
    /// Flag name without leading dashes
    pub key: String,
    /// Flag value
    pub value: String,
}

impl ExtraOption {
    /// Build an option programmatically
    pub fn new(component: Component, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            component,
            key: key.into(),
            value: value.into(),
        }
    }
}

impl FromStr for ExtraOption {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ConfigError::InvalidExtraOption {
            option: s.to_string(),
            reason: reason.to_string(),
        };

        let (component, flag) = s
            .split_once('.')
            .ok_or_else(|| invalid("expected component.key=value"))?;
        let component = component.parse::<Component>().map_err(|e| invalid(&e))?;
        let (key, value) = flag
            .split_once('=')
            .ok_or_else(|| invalid("expected component.key=value"))?;
        if key.is_empty() {
            return Err(invalid("empty flag name"));
        }

        Ok(ExtraOption::new(component, key, value))
    }
}

impl TryFrom<String> for ExtraOption {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ExtraOption> for String {
    fn from(option: ExtraOption) -> Self {
        option.to_string()
    }
}

impl fmt::Display for ExtraOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}={}", self.component, self.key, self.value)
    }
}

/// Tool settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Default log level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Where downloaded release binaries are cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Custom files mirrored onto the host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_dir: Option<PathBuf>,

    /// Where control-plane image tarballs are cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_cache_dir: Option<PathBuf>,

    /// Add-on name to enable flag (`"true"` / `"false"`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub addons: BTreeMap<String, String>,
}

impl Settings {
    /// Check if settings are default (all None)
    fn is_default(&self) -> bool {
        self == &Settings::default()
    }

    /// Binary cache root, defaulting to `~/.kubestrap/cache`
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| state_dir().join("cache"))
    }

    /// Custom files root, defaulting to `~/.kubestrap/files`
    pub fn files_dir(&self) -> PathBuf {
        self.files_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| state_dir().join("files"))
    }

    /// Image cache root, defaulting to `~/.kubestrap/cache/images`
    pub fn image_cache_dir(&self) -> PathBuf {
        self.image_cache_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| self.cache_dir().join("images"))
    }
}

/// SSH connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SshSettings {
    /// Host name or address
    pub host: String,
    /// Login user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Port, default 22
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
    /// Additional arguments for the ssh client
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

impl SshSettings {
    /// Identity file with `~` expanded
    pub fn identity_file(&self) -> Option<PathBuf> {
        self.identity_file.as_deref().map(expand_home)
    }
}

fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".kubestrap")
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
