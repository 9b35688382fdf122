//! Per-component flags: versioned defaults merged with user overrides

use crate::constants::ADMISSION_CONTROLLERS;
use crate::version::{first_alpha, is_between};
use kubestrap_config::{Component, ExtraOption};
use semver::Version;
use std::collections::BTreeMap;

/// Flags for one component, keyed by flag name so a key appears at most once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentExtraArgs {
    /// The component receiving the flags
    pub component: Component,
    /// Flag name to value
    pub options: BTreeMap<String, String>,
}

/// A default flag valid for releases in `[since, until)`
struct VersionedOption {
    component: Component,
    key: &'static str,
    value: &'static str,
    since: Option<Version>,
    until: Option<Version>,
}

impl VersionedOption {
    fn always(component: Component, key: &'static str, value: &'static str) -> Self {
        Self {
            component,
            key,
            value,
            since: None,
            until: None,
        }
    }

    fn since(mut self, version: Version) -> Self {
        self.since = Some(version);
        self
    }

    fn until(mut self, version: Version) -> Self {
        self.until = Some(version);
        self
    }

    fn applies_to(&self, component: Component, version: &Version) -> bool {
        self.component == component
            && is_between(version, self.since.as_ref(), self.until.as_ref())
    }
}

fn versioned_defaults() -> Vec<VersionedOption> {
    use Component::*;

    vec![
        VersionedOption::always(Kubelet, "fail-swap-on", "false"),
        VersionedOption::always(Kubelet, "kubeconfig", "/etc/kubernetes/kubelet.conf"),
        VersionedOption::always(Kubelet, "bootstrap-kubeconfig", "/etc/kubernetes/bootstrap-kubelet.conf"),
        VersionedOption::always(Kubelet, "require-kubeconfig", "true").until(first_alpha(1, 10)),
        VersionedOption::always(Kubelet, "pod-manifest-path", "/etc/kubernetes/manifests"),
        VersionedOption::always(Kubelet, "allow-privileged", "true"),
        VersionedOption::always(Kubelet, "cluster-dns", "10.96.0.10"),
        VersionedOption::always(Kubelet, "cluster-domain", "cluster.local"),
        VersionedOption::always(Kubelet, "authorization-mode", "Webhook"),
        VersionedOption::always(Kubelet, "client-ca-file", "/var/lib/kubestrap/certs/ca.crt"),
        VersionedOption::always(Kubelet, "cgroup-driver", "cgroupfs"),
        VersionedOption::always(Kubelet, "cadvisor-port", "0").until(first_alpha(1, 12)),
        VersionedOption::always(Apiserver, "admission-control", ADMISSION_CONTROLLERS)
            .since(first_alpha(1, 9))
            .until(first_alpha(1, 11)),
        VersionedOption::always(Apiserver, "enable-admission-plugins", ADMISSION_CONTROLLERS)
            .since(first_alpha(1, 11)),
        VersionedOption::always(ControllerManager, "leader-elect", "false"),
        VersionedOption::always(Scheduler, "leader-elect", "false"),
    ]
}

/// Defaults for `component` at `version`, overridden key-by-key by matching user options
pub fn extra_config_for_component(
    component: Component,
    user_options: &[ExtraOption],
    version: &Version,
) -> BTreeMap<String, String> {
    let mut options: BTreeMap<String, String> = versioned_defaults()
        .into_iter()
        .filter(|default| default.applies_to(component, version))
        .map(|default| (default.key.to_string(), default.value.to_string()))
        .collect();

    for option in user_options.iter().filter(|o| o.component == component) {
        options.insert(option.key.clone(), option.value.clone());
    }
    options
}

/// Extra arguments for the control-plane components written into the bootstrap config
///
/// Components whose flag set comes out empty are left out.
pub fn control_plane_extra_args(
    user_options: &[ExtraOption],
    version: &Version,
    feature_gates: Option<&str>,
) -> Vec<ComponentExtraArgs> {
    Component::CONTROL_PLANE
        .into_iter()
        .filter_map(|component| {
            let mut options = extra_config_for_component(component, user_options, version);
            if let Some(gates) = feature_gates {
                options.insert("feature-gates".to_string(), gates.to_string());
            }
            (!options.is_empty()).then_some(ComponentExtraArgs { component, options })
        })
        .collect()
}

/// Render options as `--key=value` flags in key order
pub fn to_flags(options: &BTreeMap<String, String>) -> String {
    options
        .iter()
        .map(|(key, value)| format!("--{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
