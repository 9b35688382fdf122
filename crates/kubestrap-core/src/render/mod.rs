//! Configuration artifact generation
//!
//! Every artifact is rendered from a [`ClusterConfig`] into memory. Nothing in
//! this module touches the filesystem or the node; the orchestrator stages the
//! results through a command runner.

mod cni;
mod hosts;
mod kubeadm;
mod kubelet;

pub use cni::default_cni_config;
pub use hosts::hosts_file;
pub use kubeadm::{BootstrapOptions, bootstrap_config};
pub use kubelet::{kubelet_service, kubelet_unit};

use crate::error::Result;
use crate::version::ResolvedVersion;
use command_executor::CopyableFile;
use kubestrap_config::ClusterConfig;
use std::fmt;

/// The closed set of artifacts the generator knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `MasterConfiguration` for releases before 1.12
    BootstrapConfigV1,
    /// `InitConfiguration` + `ClusterConfiguration` from 1.12
    BootstrapConfigV2,
    /// Base `kubelet.service`
    KubeletService,
    /// Drop-in carrying the kubelet command line
    KubeletUnit,
    /// `/etc/hosts`
    HostsFile,
    /// Bridge network for pods when no CNI add-on is installed
    CniDefault,
}

impl ArtifactKind {
    /// Stable name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::BootstrapConfigV1 => "bootstrap-config-v1",
            ArtifactKind::BootstrapConfigV2 => "bootstrap-config-v2",
            ArtifactKind::KubeletService => "kubelet-service",
            ArtifactKind::KubeletUnit => "kubelet-unit",
            ArtifactKind::HostsFile => "hosts-file",
            ArtifactKind::CniDefault => "cni-default",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendered file contents bound for a fixed path on the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// What was rendered
    pub kind: ArtifactKind,
    /// Target path on the node
    pub path: String,
    /// File contents
    pub contents: String,
    /// Octal permission string
    pub permissions: &'static str,
}

impl RenderedArtifact {
    pub(crate) fn new(
        kind: ArtifactKind,
        path: &str,
        contents: String,
        permissions: &'static str,
    ) -> Self {
        Self {
            kind,
            path: path.to_string(),
            contents,
            permissions,
        }
    }

    /// Convert into a file the command runner can stage
    pub fn to_copyable(&self) -> CopyableFile {
        CopyableFile::from_memory(self.contents.as_bytes(), &self.path, self.permissions)
    }
}

/// Render every artifact a convergence pass stages, in staging order
///
/// The default CNI configuration is included only when the cluster asks for it.
pub fn generate_artifacts(cfg: &ClusterConfig) -> Result<Vec<RenderedArtifact>> {
    let version = ResolvedVersion::parse(&cfg.kubernetes_version)?;

    let mut artifacts = vec![
        kubelet_service(),
        kubelet_unit(cfg, &version)?,
        bootstrap_config(cfg, &version)?,
        hosts_file(cfg)?,
    ];
    if cfg.enable_default_cni {
        artifacts.extend(default_cni_config()?);
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::error::Error;

    fn cluster(version: &str) -> ClusterConfig {
        ClusterConfig {
            node_name: "kubestrap".to_string(),
            node_ip: "192.168.39.10".to_string(),
            kubernetes_version: version.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_artifact_paths_and_modes() {
        let artifacts = generate_artifacts(&cluster("v1.13.0")).unwrap();
        let layout: Vec<(&str, &str)> = artifacts
            .iter()
            .map(|a| (a.path.as_str(), a.permissions))
            .collect();

        assert_eq!(
            layout,
            vec![
                (KUBELET_SERVICE_FILE, "0640"),
                (KUBELET_SYSTEMD_CONF_FILE, "0640"),
                (KUBEADM_CONFIG_FILE, "0640"),
                (ETC_HOSTS, "0644"),
            ]
        );
    }

    #[test]
    fn test_default_cni_written_twice() {
        let mut cfg = cluster("v1.13.0");
        cfg.enable_default_cni = true;
        let artifacts = generate_artifacts(&cfg).unwrap();

        let cni: Vec<&RenderedArtifact> = artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::CniDefault)
            .collect();
        assert_eq!(cni.len(), 2);
        assert_eq!(cni[0].path, DEFAULT_CNI_CONFIG_PATH);
        assert_eq!(cni[1].path, DEFAULT_RKT_NET_CONFIG_PATH);
        assert_eq!(cni[0].contents, cni[1].contents);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut cfg = cluster("v1.12.1");
        cfg.feature_gates = "PodPriority=false,CoreDNS=true".to_string();
        cfg.container_runtime = "containerd".to_string();
        assert_eq!(generate_artifacts(&cfg).unwrap(), generate_artifacts(&cfg).unwrap());
    }

    #[test]
    fn test_failures_are_distinct() {
        let err = generate_artifacts(&cluster("one.two")).unwrap_err();
        assert!(matches!(err, Error::InvalidVersion { .. }));

        let mut cfg = cluster("v1.13.0");
        cfg.feature_gates = "CoreDNS".to_string();
        let err = generate_artifacts(&cfg).unwrap_err();
        assert!(matches!(err, Error::FeatureGateParse { .. }));

        let mut cfg = cluster("v1.13.0");
        cfg.node_name.clear();
        let err = generate_artifacts(&cfg).unwrap_err();
        assert!(matches!(err, Error::TemplateRender { .. }));
    }

    #[test]
    fn test_copyable_keeps_path_and_mode() {
        let artifact = hosts_file(&cluster("v1.13.0")).unwrap();
        let file = artifact.to_copyable();
        assert_eq!(file.target_path(), ETC_HOSTS);
        assert_eq!(file.mode().unwrap(), 0o644);
    }
}
