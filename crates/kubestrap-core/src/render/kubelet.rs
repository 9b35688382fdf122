//! systemd units for the kubelet

use super::{ArtifactKind, RenderedArtifact};
use crate::constants::{KUBELET_SERVICE_FILE, KUBELET_SYSTEMD_CONF_FILE};
use crate::error::Result;
use crate::extra_args::{extra_config_for_component, to_flags};
use crate::features::FeatureGates;
use crate::runtime::{ContainerRuntime, resolve_container_runtime};
use crate::version::ResolvedVersion;
use kubestrap_config::{ClusterConfig, Component};

const KUBELET_SERVICE: &str = "\
[Unit]
Description=kubelet: The Kubernetes Node Agent
Documentation=https://kubernetes.io/docs/

[Service]
ExecStart=/usr/bin/kubelet
Restart=always
StartLimitInterval=0
RestartSec=600ms

[Install]
WantedBy=multi-user.target
";

/// The base `kubelet.service`; the command line lives in the drop-in
pub fn kubelet_service() -> RenderedArtifact {
    RenderedArtifact::new(
        ArtifactKind::KubeletService,
        KUBELET_SERVICE_FILE,
        KUBELET_SERVICE.to_string(),
        "0640",
    )
}

/// Render the drop-in that sets the kubelet command line
///
/// Flags are the kubelet's versioned defaults overridden by user options,
/// then runtime flags unless the user picked a runtime, then the network plugin.
pub fn kubelet_unit(cfg: &ClusterConfig, version: &ResolvedVersion) -> Result<RenderedArtifact> {
    let options = extra_config_for_component(Component::Kubelet, &cfg.extra_options, version.version());
    let mut options = resolve_container_runtime(options, &cfg.container_runtime);
    if !cfg.network_plugin.is_empty() {
        options.insert("network-plugin".to_string(), cfg.network_plugin.clone());
    }

    let gates = FeatureGates::parse(&cfg.feature_gates)?;

    let mut exec_start = String::from("/usr/bin/kubelet");
    let flags = to_flags(&options);
    if !flags.is_empty() {
        exec_start.push(' ');
        exec_start.push_str(&flags);
    }
    if let Some(gates) = gates.component_flag() {
        exec_start.push_str(" --feature-gates=");
        exec_start.push_str(&gates);
    }

    let wants = ContainerRuntime::from_selector(&cfg.container_runtime).service_unit();
    let contents = format!(
        "[Unit]\nWants={wants}\n\n[Service]\nExecStart=\nExecStart={exec_start}\n\n[Install]\n"
    );

    Ok(RenderedArtifact::new(
        ArtifactKind::KubeletUnit,
        KUBELET_SYSTEMD_CONF_FILE,
        contents,
        "0640",
    ))
}
