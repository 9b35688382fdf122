//! Container runtime selection and CRI socket resolution

use std::collections::BTreeMap;
use tracing::debug;

const CRIO_SOCKET: &str = "/var/run/crio/crio.sock";
const CONTAINERD_SOCKET: &str = "/run/containerd/containerd.sock";
const CONTAINERD_ENDPOINT: &str = "unix:///run/containerd/containerd.sock";
const RUNTIME_REQUEST_TIMEOUT: &str = "15m";

/// The kubelet flag that selects a runtime
pub const CONTAINER_RUNTIME_FLAG: &str = "container-runtime";

/// A container runtime selector as written in the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRuntime {
    /// No selector, or `docker`
    Docker,
    /// `crio` or `cri-o`
    Crio,
    /// `containerd`
    Containerd,
    /// Any other name, handed to the kubelet verbatim
    Custom(String),
}

impl ContainerRuntime {
    /// Interpret a selector string
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "" | "docker" => ContainerRuntime::Docker,
            "crio" | "cri-o" => ContainerRuntime::Crio,
            "containerd" => ContainerRuntime::Containerd,
            other => ContainerRuntime::Custom(other.to_string()),
        }
    }

    /// Whether the host needs preconditioning for a CRI runtime
    pub fn is_alternate(&self) -> bool {
        !matches!(self, ContainerRuntime::Docker)
    }

    /// Canonical socket of a known CRI runtime
    pub fn socket(&self) -> Option<&'static str> {
        match self {
            ContainerRuntime::Crio => Some(CRIO_SOCKET),
            ContainerRuntime::Containerd => Some(CONTAINERD_SOCKET),
            _ => None,
        }
    }

    /// systemd unit the kubelet should start after
    pub fn service_unit(&self) -> &'static str {
        match self {
            ContainerRuntime::Crio => "crio.service",
            ContainerRuntime::Containerd => "containerd.service",
            _ => "docker.socket",
        }
    }
}

/// Inject runtime flags into kubelet options unless the user already chose a runtime
///
/// An explicit `container-runtime` option wins and the selector is ignored.
/// Known runtimes get their endpoint and timeout defaults, unknown non-empty
/// selectors are passed through as the runtime name, and an empty selector
/// leaves the options alone.
pub fn resolve_container_runtime(
    mut options: BTreeMap<String, String>,
    selector: &str,
) -> BTreeMap<String, String> {
    if options.contains_key(CONTAINER_RUNTIME_FLAG) {
        debug!("container runtime already set through extra options, ignoring selector {selector:?}");
        return options;
    }
    if selector.is_empty() {
        return options;
    }

    let endpoint = match ContainerRuntime::from_selector(selector) {
        ContainerRuntime::Crio => CRIO_SOCKET,
        ContainerRuntime::Containerd => CONTAINERD_ENDPOINT,
        _ => {
            options.insert(CONTAINER_RUNTIME_FLAG.to_string(), selector.to_string());
            return options;
        }
    };

    options.insert(CONTAINER_RUNTIME_FLAG.to_string(), "remote".to_string());
    options.insert("container-runtime-endpoint".to_string(), endpoint.to_string());
    options.insert("image-service-endpoint".to_string(), endpoint.to_string());
    options.insert(
        "runtime-request-timeout".to_string(),
        RUNTIME_REQUEST_TIMEOUT.to_string(),
    );
    options
}

/// The CRI socket kubeadm should use: the explicit path, else the runtime's canonical one, else empty
pub fn resolve_cri_socket(explicit_path: &str, selector: &str) -> String {
    if !explicit_path.is_empty() {
        return explicit_path.to_string();
    }
    ContainerRuntime::from_selector(selector)
        .socket()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_explicit_runtime_wins() {
        let input = options(&[("container-runtime", "docker"), ("max-pods", "150")]);
        for selector in ["", "containerd", "crio", "rkt"] {
            assert_eq!(resolve_container_runtime(input.clone(), selector), input);
        }
    }

    #[test]
    fn test_containerd_defaults() {
        let resolved = resolve_container_runtime(BTreeMap::new(), "containerd");
        assert_eq!(
            resolved,
            options(&[
                ("container-runtime", "remote"),
                ("container-runtime-endpoint", "unix:///run/containerd/containerd.sock"),
                ("image-service-endpoint", "unix:///run/containerd/containerd.sock"),
                ("runtime-request-timeout", "15m"),
            ])
        );
    }

    #[test]
    fn test_crio_aliases_agree() {
        let crio = resolve_container_runtime(BTreeMap::new(), "crio");
        assert_eq!(crio, resolve_container_runtime(BTreeMap::new(), "cri-o"));
        assert_eq!(crio["container-runtime-endpoint"], "/var/run/crio/crio.sock");
        assert_eq!(crio.len(), 4);
    }

    #[test]
    fn test_unknown_and_empty_selectors() {
        let rkt = resolve_container_runtime(BTreeMap::new(), "rkt");
        assert_eq!(rkt, options(&[("container-runtime", "rkt")]));

        let untouched = options(&[("max-pods", "150")]);
        assert_eq!(resolve_container_runtime(untouched.clone(), ""), untouched);
    }

    #[test]
    fn test_cri_socket() {
        assert_eq!(resolve_cri_socket("/custom.sock", "containerd"), "/custom.sock");
        assert_eq!(resolve_cri_socket("", "containerd"), "/run/containerd/containerd.sock");
        assert_eq!(resolve_cri_socket("", "cri-o"), "/var/run/crio/crio.sock");
        assert_eq!(resolve_cri_socket("", "crio"), "/var/run/crio/crio.sock");
        assert_eq!(resolve_cri_socket("", "docker"), "");
        assert_eq!(resolve_cri_socket("", "rkt"), "");
        assert_eq!(resolve_cri_socket("", ""), "");
    }

    #[test]
    fn test_alternate_runtime() {
        assert!(!ContainerRuntime::from_selector("").is_alternate());
        assert!(!ContainerRuntime::from_selector("docker").is_alternate());
        assert!(ContainerRuntime::from_selector("cri-o").is_alternate());
        assert!(ContainerRuntime::from_selector("rkt").is_alternate());
    }
}
