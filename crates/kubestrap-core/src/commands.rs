//! Shell command lines sent to the node
//!
//! These strings drive external tools and are kept exactly as those tools expect.

use crate::constants::{
    ALTERNATE_RUNTIME_PREFLIGHT, BINARY_INSTALL_DIR, KUBEADM_CONFIG_FILE, LEGACY_SKIP_PREFLIGHT,
    PREFLIGHT_CHECKS,
};
use crate::runtime::ContainerRuntime;
use crate::version::ResolvedVersion;

/// Query the kubelet's systemd state
pub const KUBELET_STATUS: &str = "sudo systemctl is-active kubelet";

/// Load the bridge netfilter module needed by CRI runtimes
pub const LOAD_BR_NETFILTER: &str = "sudo modprobe br_netfilter";

/// Enable IPv4 forwarding
pub const ENABLE_IP_FORWARD: &str = "sudo sh -c \"echo '1' > /proc/sys/net/ipv4/ip_forward\"";

/// Reload units, then enable and start the kubelet
pub const START_KUBELET: &str = "
sudo systemctl daemon-reload &&
sudo systemctl enable kubelet &&
sudo systemctl start kubelet
";

/// `kubeadm init` against the staged bootstrap config
///
/// Releases that skip preflight checks get one `--ignore-preflight-errors`
/// per known-noisy check, plus `CRI` when the runtime is not Docker. Older
/// releases only know the blanket `--skip-preflight-checks`.
pub fn kubeadm_init(version: &ResolvedVersion, runtime: &ContainerRuntime) -> String {
    let mut command = format!("sudo {BINARY_INSTALL_DIR}/kubeadm init --config {KUBEADM_CONFIG_FILE}");
    if version.skip_preflight_checks() {
        let alternate = runtime.is_alternate().then_some(ALTERNATE_RUNTIME_PREFLIGHT);
        for check in PREFLIGHT_CHECKS.into_iter().chain(alternate) {
            command.push_str(" --ignore-preflight-errors=");
            command.push_str(check);
        }
    } else {
        command.push(' ');
        command.push_str(LEGACY_SKIP_PREFLIGHT);
    }
    command
}

/// Phase commands that rebuild the control plane, in execution order
pub fn restart_phases(version: &ResolvedVersion) -> [String; 4] {
    let phases = version.phases();
    let phase = phases.prefix();
    [
        format!("sudo kubeadm {phase} phase certs all --config {KUBEADM_CONFIG_FILE}"),
        format!("sudo kubeadm {phase} phase kubeconfig all --config {KUBEADM_CONFIG_FILE}"),
        format!(
            "sudo kubeadm {phase} phase {} all --config {KUBEADM_CONFIG_FILE}",
            phases.control_plane()
        ),
        format!("sudo kubeadm {phase} phase etcd local --config {KUBEADM_CONFIG_FILE}"),
    ]
}

/// Read the kubelet journal, following it when asked
pub fn kubelet_logs(follow: bool) -> String {
    let flags: Vec<&str> = if follow { vec!["-f"] } else { Vec::new() };
    format!("sudo journalctl {} -u kubelet", flags.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_phases_1_13() {
        let version = ResolvedVersion::parse("v1.13.0").unwrap();
        assert_eq!(
            restart_phases(&version),
            [
                "sudo kubeadm init phase certs all --config /var/lib/kubeadm.yaml",
                "sudo kubeadm init phase kubeconfig all --config /var/lib/kubeadm.yaml",
                "sudo kubeadm init phase control-plane all --config /var/lib/kubeadm.yaml",
                "sudo kubeadm init phase etcd local --config /var/lib/kubeadm.yaml",
            ]
        );
    }

    #[test]
    fn test_restart_phases_before_1_13() {
        let version = ResolvedVersion::parse("v1.12.4").unwrap();
        let phases = restart_phases(&version);
        assert_eq!(phases[0], "sudo kubeadm alpha phase certs all --config /var/lib/kubeadm.yaml");
        assert_eq!(phases[2], "sudo kubeadm alpha phase controlplane all --config /var/lib/kubeadm.yaml");
    }

    #[test]
    fn test_init_preflight_flags() {
        let docker = ContainerRuntime::from_selector("");
        let crio = ContainerRuntime::from_selector("crio");

        let modern = ResolvedVersion::parse("v1.13.0").unwrap();
        let command = kubeadm_init(&modern, &docker);
        assert!(command.starts_with("sudo /usr/bin/kubeadm init --config /var/lib/kubeadm.yaml --ignore-preflight-errors="));
        assert_eq!(command.matches("--ignore-preflight-errors=").count(), PREFLIGHT_CHECKS.len());
        assert!(kubeadm_init(&modern, &crio).ends_with(" --ignore-preflight-errors=CRI"));

        let legacy = ResolvedVersion::parse("v1.8.0").unwrap();
        assert_eq!(
            kubeadm_init(&legacy, &crio),
            "sudo /usr/bin/kubeadm init --config /var/lib/kubeadm.yaml --skip-preflight-checks"
        );
        assert!(!kubeadm_init(&legacy, &docker).contains("--ignore-preflight-errors"));
    }

    #[test]
    fn test_log_commands() {
        assert_eq!(kubelet_logs(true), "sudo journalctl -f -u kubelet");
        assert_eq!(kubelet_logs(false), "sudo journalctl  -u kubelet");
    }
}
