//! Well-known paths, ports and defaults on the managed node

/// API server port used when the configuration leaves it unset or non-positive
pub const DEFAULT_API_SERVER_PORT: i32 = 8443;

/// Service network used when the configuration leaves it empty
pub const DEFAULT_SERVICE_CIDR: &str = "10.96.0.0/12";

/// Certificate directory handed to kubeadm
pub const DEFAULT_CERT_DIR: &str = "/var/lib/kubestrap/certs/";

/// Where the local etcd member keeps its data
pub const ETCD_DATA_DIR: &str = "/data/kubestrap";

/// CRI socket kubeadm falls back to when no runtime socket is known
pub const DOCKERSHIM_SOCKET: &str = "/var/run/dockershim.sock";

/// Bootstrap configuration consumed by every kubeadm invocation
pub const KUBEADM_CONFIG_FILE: &str = "/var/lib/kubeadm.yaml";

/// Base systemd unit for the kubelet
pub const KUBELET_SERVICE_FILE: &str = "/lib/systemd/system/kubelet.service";

/// Drop-in carrying the kubelet command line
pub const KUBELET_SYSTEMD_CONF_FILE: &str = "/etc/systemd/system/kubelet.service.d/10-kubeadm.conf";

/// Host name resolution file
pub const ETC_HOSTS: &str = "/etc/hosts";

/// Default CNI network configuration
pub const DEFAULT_CNI_CONFIG_PATH: &str = "/etc/cni/net.d/k8s.conf";

/// The same configuration where rkt looks for it
pub const DEFAULT_RKT_NET_CONFIG_PATH: &str = "/etc/rkt/net.d/k8s.conf";

/// Where release binaries are installed on the node
pub const BINARY_INSTALL_DIR: &str = "/usr/bin";

/// Manifests for built-in add-ons
pub const ADDONS_DIR: &str = "/etc/kubernetes/addons";

/// Admin credentials written by kubeadm
pub const ADMIN_KUBECONFIG: &str = "/etc/kubernetes/admin.conf";

/// Staging directory for image tarballs
pub const IMAGE_STAGING_DIR: &str = "/tmp";

/// Release binaries fetched for every convergence
///
/// `kubectl` drives the post-init cluster operations on the node.
pub const CLUSTER_BINARIES: [&str; 3] = ["kubelet", "kubeadm", "kubectl"];

/// Base URL of Kubernetes release artifacts
pub const KUBERNETES_RELEASE_URL: &str = "https://dl.k8s.io/release";

/// Architecture of the fetched binaries
pub const RELEASE_ARCH: &str = "amd64";

/// Preflight checks that always fail on a single reused node
pub const PREFLIGHT_CHECKS: [&str; 8] = [
    "DirAvailable--etc-kubernetes-manifests",
    "DirAvailable--data-kubestrap",
    "Port-10250",
    "FileAvailable--etc-kubernetes-manifests-kube-scheduler.yaml",
    "FileAvailable--etc-kubernetes-manifests-kube-apiserver.yaml",
    "FileAvailable--etc-kubernetes-manifests-kube-controller-manager.yaml",
    "FileAvailable--etc-kubernetes-manifests-etcd.yaml",
    "Swap",
];

/// Additional check that fails when the runtime is not Docker
pub const ALTERNATE_RUNTIME_PREFLIGHT: &str = "CRI";

/// Blanket preflight skip understood by releases before 1.9
pub const LEGACY_SKIP_PREFLIGHT: &str = "--skip-preflight-checks";

/// Admission plugins enabled on the API server, under whichever flag the release understands
pub const ADMISSION_CONTROLLERS: &str = "Initializers,NamespaceLifecycle,LimitRanger,ServiceAccount,\
DefaultStorageClass,DefaultTolerationSeconds,NodeRestriction,MutatingAdmissionWebhook,ValidatingAdmissionWebhook,ResourceQuota";
