//! kubeadm bootstrap configuration in both schema generations

use super::{ArtifactKind, RenderedArtifact};
use crate::constants::{
    DEFAULT_API_SERVER_PORT, DEFAULT_CERT_DIR, DEFAULT_SERVICE_CIDR, DOCKERSHIM_SOCKET,
    ETCD_DATA_DIR, KUBEADM_CONFIG_FILE,
};
use crate::error::{Error, Result};
use crate::extra_args::{ComponentExtraArgs, control_plane_extra_args};
use crate::features::FeatureGates;
use crate::runtime::resolve_cri_socket;
use crate::version::{ConfigSchema, ResolvedVersion};
use kubestrap_config::{ClusterConfig, Component};
use serde::Serialize;
use std::collections::BTreeMap;

/// Typed inputs to the bootstrap configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Address the API server advertises
    pub advertise_address: String,
    /// API server port
    pub api_server_port: i32,
    /// Certificate directory
    pub cert_dir: String,
    /// Service network
    pub service_cidr: String,
    /// Release tag, e.g. `v1.13.0`
    pub kubernetes_version: String,
    /// etcd data directory
    pub etcd_data_dir: String,
    /// Node name
    pub node_name: String,
    /// CRI socket, empty when the runtime has no canonical one
    pub cri_socket: String,
    /// Control-plane component flags
    pub extra_args: Vec<ComponentExtraArgs>,
    /// Gates understood by kubeadm
    pub feature_gates: BTreeMap<String, bool>,
    /// Keep workloads schedulable on the master
    pub no_taint_master: bool,
    /// Schema to render
    pub schema: ConfigSchema,
}

impl BootstrapOptions {
    /// Derive options for `version` from the cluster configuration
    pub fn new(cfg: &ClusterConfig, version: &ResolvedVersion) -> Result<Self> {
        let gates = FeatureGates::parse(&cfg.feature_gates)?;
        let component_gates = gates.component_flag();
        let extra_args =
            control_plane_extra_args(&cfg.extra_options, version.version(), component_gates.as_deref());

        let api_server_port = if cfg.node_port <= 0 {
            DEFAULT_API_SERVER_PORT
        } else {
            cfg.node_port
        };
        let service_cidr = if cfg.service_cidr.is_empty() {
            DEFAULT_SERVICE_CIDR.to_string()
        } else {
            cfg.service_cidr.clone()
        };

        Ok(Self {
            advertise_address: cfg.node_ip.clone(),
            api_server_port,
            cert_dir: DEFAULT_CERT_DIR.to_string(),
            service_cidr,
            kubernetes_version: version.release_tag(),
            etcd_data_dir: ETCD_DATA_DIR.to_string(),
            node_name: cfg.node_name.clone(),
            cri_socket: resolve_cri_socket(&cfg.cri_socket, &cfg.container_runtime),
            extra_args,
            feature_gates: gates.kubeadm,
            no_taint_master: version.no_taint_master(),
            schema: version.schema(),
        })
    }

    fn artifact_kind(&self) -> ArtifactKind {
        match self.schema {
            ConfigSchema::V1Alpha1 => ArtifactKind::BootstrapConfigV1,
            ConfigSchema::V1Alpha3 => ArtifactKind::BootstrapConfigV2,
        }
    }

    fn args_for(&self, component: Component) -> Option<BTreeMap<String, String>> {
        self.extra_args
            .iter()
            .find(|args| args.component == component)
            .map(|args| args.options.clone())
    }

    /// Render the YAML document set for the selected schema
    pub fn render(&self) -> Result<String> {
        let kind = self.artifact_kind();
        for (field, value) in [
            ("advertise address", &self.advertise_address),
            ("node name", &self.node_name),
        ] {
            if value.is_empty() {
                return Err(Error::TemplateRender {
                    artifact: kind,
                    reason: format!("{field} is empty"),
                });
            }
        }

        let documents = match self.schema {
            ConfigSchema::V1Alpha1 => vec![to_yaml(kind, &self.master_configuration())?],
            ConfigSchema::V1Alpha3 => vec![
                to_yaml(kind, &self.init_configuration())?,
                to_yaml(kind, &self.cluster_configuration())?,
                to_yaml(kind, &KubeletConfiguration::default())?,
            ],
        };
        Ok(documents.join("---\n"))
    }

    fn master_configuration(&self) -> MasterConfiguration<'_> {
        MasterConfiguration {
            api_version: self.schema.api_version(),
            kind: "MasterConfiguration",
            no_taint_master: self.no_taint_master,
            api: ApiEndpoint {
                advertise_address: &self.advertise_address,
                bind_port: self.api_server_port,
                control_plane_endpoint: Some("localhost"),
            },
            kubernetes_version: &self.kubernetes_version,
            certificates_dir: &self.cert_dir,
            networking: Networking {
                service_subnet: &self.service_cidr,
                dns_domain: None,
            },
            etcd: LegacyEtcd {
                data_dir: &self.etcd_data_dir,
            },
            node_name: &self.node_name,
            cri_socket: (!self.cri_socket.is_empty()).then_some(self.cri_socket.as_str()),
            extra_args: self.component_extra_args(),
            feature_gates: self.feature_gates.clone(),
        }
    }

    fn init_configuration(&self) -> InitConfiguration<'_> {
        let cri_socket = if self.cri_socket.is_empty() {
            DOCKERSHIM_SOCKET
        } else {
            &self.cri_socket
        };

        InitConfiguration {
            api_version: self.schema.api_version(),
            kind: "InitConfiguration",
            api_endpoint: ApiEndpoint {
                advertise_address: &self.advertise_address,
                bind_port: self.api_server_port,
                control_plane_endpoint: None,
            },
            bootstrap_tokens: vec![BootstrapToken {
                groups: vec!["system:bootstrappers:kubeadm:default-node-token"],
                ttl: "24h0m0s",
                usages: vec!["signing", "authentication"],
            }],
            node_registration: NodeRegistration {
                cri_socket,
                name: &self.node_name,
                taints: self.no_taint_master.then(Vec::new),
            },
        }
    }

    fn cluster_configuration(&self) -> ClusterConfiguration<'_> {
        ClusterConfiguration {
            api_version: self.schema.api_version(),
            kind: "ClusterConfiguration",
            extra_args: self.component_extra_args(),
            feature_gates: self.feature_gates.clone(),
            certificates_dir: &self.cert_dir,
            cluster_name: "kubernetes",
            control_plane_endpoint: format!("localhost:{}", self.api_server_port),
            etcd: Etcd {
                local: LegacyEtcd {
                    data_dir: &self.etcd_data_dir,
                },
            },
            kubernetes_version: &self.kubernetes_version,
            networking: Networking {
                service_subnet: &self.service_cidr,
                dns_domain: Some("cluster.local"),
            },
        }
    }

    fn component_extra_args(&self) -> ComponentArgs {
        ComponentArgs {
            api_server: self.args_for(Component::Apiserver),
            controller_manager: self.args_for(Component::ControllerManager),
            scheduler: self.args_for(Component::Scheduler),
        }
    }
}

/// Render the bootstrap configuration artifact
pub fn bootstrap_config(cfg: &ClusterConfig, version: &ResolvedVersion) -> Result<RenderedArtifact> {
    let options = BootstrapOptions::new(cfg, version)?;
    let contents = options.render()?;
    Ok(RenderedArtifact::new(
        options.artifact_kind(),
        KUBEADM_CONFIG_FILE,
        contents,
        "0640",
    ))
}

fn to_yaml<T: Serialize>(kind: ArtifactKind, document: &T) -> Result<String> {
    serde_yaml::to_string(document).map_err(|e| Error::TemplateRender {
        artifact: kind,
        reason: e.to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MasterConfiguration<'a> {
    api_version: &'static str,
    kind: &'static str,
    no_taint_master: bool,
    api: ApiEndpoint<'a>,
    kubernetes_version: &'a str,
    certificates_dir: &'a str,
    networking: Networking<'a>,
    etcd: LegacyEtcd<'a>,
    node_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cri_socket: Option<&'a str>,
    #[serde(flatten)]
    extra_args: ComponentArgs,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    feature_gates: BTreeMap<String, bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitConfiguration<'a> {
    api_version: &'static str,
    kind: &'static str,
    api_endpoint: ApiEndpoint<'a>,
    bootstrap_tokens: Vec<BootstrapToken>,
    node_registration: NodeRegistration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterConfiguration<'a> {
    api_version: &'static str,
    kind: &'static str,
    #[serde(flatten)]
    extra_args: ComponentArgs,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    feature_gates: BTreeMap<String, bool>,
    certificates_dir: &'a str,
    cluster_name: &'static str,
    control_plane_endpoint: String,
    etcd: Etcd<'a>,
    kubernetes_version: &'a str,
    networking: Networking<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEndpoint<'a> {
    advertise_address: &'a str,
    bind_port: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    control_plane_endpoint: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Networking<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    dns_domain: Option<&'static str>,
    service_subnet: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyEtcd<'a> {
    data_dir: &'a str,
}

#[derive(Serialize)]
struct Etcd<'a> {
    local: LegacyEtcd<'a>,
}

#[derive(Serialize)]
struct BootstrapToken {
    groups: Vec<&'static str>,
    ttl: &'static str,
    usages: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeRegistration<'a> {
    cri_socket: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    taints: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ComponentArgs {
    #[serde(rename = "apiServerExtraArgs", skip_serializing_if = "Option::is_none")]
    api_server: Option<BTreeMap<String, String>>,
    #[serde(rename = "controllerManagerExtraArgs", skip_serializing_if = "Option::is_none")]
    controller_manager: Option<BTreeMap<String, String>>,
    #[serde(rename = "schedulerExtraArgs", skip_serializing_if = "Option::is_none")]
    scheduler: Option<BTreeMap<String, String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KubeletConfiguration {
    api_version: &'static str,
    kind: &'static str,
    eviction_hard: BTreeMap<&'static str, &'static str>,
}

impl Default for KubeletConfiguration {
    fn default() -> Self {
        // Disk pressure evictions make no sense on a throwaway node
        let eviction_hard = ["imagefs.available", "nodefs.available", "nodefs.inodesFree"]
            .into_iter()
            .map(|signal| (signal, "0%"))
            .collect();
        Self {
            api_version: "kubelet.config.k8s.io/v1beta1",
            kind: "KubeletConfiguration",
            eviction_hard,
        }
    }
}
