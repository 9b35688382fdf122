//! Configuration parser with environment variable substitution

use crate::{
    resolver::{resolve_env_vars, ResolutionContext},
    ClusterConfig, Config, ConfigError, Result,
};
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::Path;

/// The only configuration document version understood
pub const CONFIG_VERSION: &str = "1.0";

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string, substituting the process environment
pub fn parse_str(content: &str) -> Result<Config> {
    parse_with_context(content, &ResolutionContext::new())
}

/// Parse YAML configuration with an explicit variable context
pub fn parse_with_context(content: &str, context: &ResolutionContext) -> Result<Config> {
    let content = resolve_env_vars(content, context)?;
    let config: Config = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported version: {}, expected {}",
            config.version, CONFIG_VERSION
        )));
    }

    validate_cluster(&config.cluster)?;

    if let Some(ssh) = &config.ssh {
        if ssh.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ssh.host must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate the cluster section
///
/// The Kubernetes version is only checked for presence: its syntax is the
/// version resolver's business and fails there with a dedicated error.
pub fn validate_cluster(cluster: &ClusterConfig) -> Result<()> {
    if cluster.node_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "cluster.node_name must not be empty".to_string(),
        ));
    }

    cluster.node_ip.parse::<IpAddr>().map_err(|_| {
        ConfigError::ValidationError(format!(
            "cluster.node_ip {:?} is not an IP address",
            cluster.node_ip
        ))
    })?;

    if cluster.kubernetes_version.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "cluster.kubernetes_version must not be empty".to_string(),
        ));
    }

    if !cluster.service_cidr.is_empty() {
        cluster.service_cidr.parse::<IpNet>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "cluster.service_cidr {:?} is not a CIDR",
                cluster.service_cidr
            ))
        })?;
    }

    Ok(())
}
