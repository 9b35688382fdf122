//! Post-bootstrap fixes applied against the live cluster
//!
//! These run while the API server may still be coming up. Each operation is
//! idempotent so callers can retry it until it sticks.

use crate::constants::{ADMIN_KUBECONFIG, DEFAULT_API_SERVER_PORT};
use crate::error::{Error, Result};
use async_trait::async_trait;
use command_executor::CommandRunner;
use kubestrap_config::ClusterConfig;
use std::sync::Arc;
use tracing::{debug, info};

const MASTER_TAINT: &str = "node-role.kubernetes.io/master";
const RBAC_BINDING: &str = "kubestrap-rbac";

/// Cluster-level operations the orchestrator needs after kubeadm has run
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Make `node_name` schedulable by removing the master taint
    async fn unmark_master(&self, node_name: &str) -> Result<()>;

    /// Grant `cluster-admin` to the `kube-system:default` service account
    async fn elevate_kube_system_privileges(&self) -> Result<()>;

    /// Point kube-proxy at the node's API endpoint and restart it
    async fn restart_kube_proxy(&self, cfg: &ClusterConfig) -> Result<()>;
}

/// [`ClusterOps`] implemented with `kubectl` on the node
pub struct KubectlOps {
    runner: Arc<dyn CommandRunner>,
    kubeconfig: String,
}

impl KubectlOps {
    /// Run kubectl through `runner` with the admin credentials kubeadm wrote
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            kubeconfig: ADMIN_KUBECONFIG.to_string(),
        }
    }

    /// Use other credentials
    pub fn with_kubeconfig(mut self, kubeconfig: impl Into<String>) -> Self {
        self.kubeconfig = kubeconfig.into();
        self
    }

    fn kubectl(&self, args: &str) -> String {
        format!("sudo kubectl --kubeconfig={} {}", self.kubeconfig, args)
    }

    async fn exec(&self, cmd: String) -> Result<String> {
        debug!(command = %cmd, "Running");
        self.runner
            .combined_output(&cmd)
            .await
            .map_err(|e| Error::exec(cmd, e))
    }
}

#[async_trait]
impl ClusterOps for KubectlOps {
    async fn unmark_master(&self, node_name: &str) -> Result<()> {
        let taints = self
            .exec(self.kubectl(&format!(
                "get node {node_name} -o jsonpath='{{.spec.taints[*].key}}'"
            )))
            .await?;
        if !taints.split_whitespace().any(|key| key == MASTER_TAINT) {
            return Ok(());
        }

        self.exec(self.kubectl(&format!("taint nodes {node_name} {MASTER_TAINT}:NoSchedule-")))
            .await?;
        info!(node = %node_name, "Removed master taint");
        Ok(())
    }

    async fn elevate_kube_system_privileges(&self) -> Result<()> {
        let get = self.kubectl(&format!("get clusterrolebinding {RBAC_BINDING}"));
        let create = self.kubectl(&format!(
            "create clusterrolebinding {RBAC_BINDING} --clusterrole=cluster-admin --serviceaccount=kube-system:default"
        ));
        self.exec(format!("{get} || {create}")).await.map(drop)
    }

    async fn restart_kube_proxy(&self, cfg: &ClusterConfig) -> Result<()> {
        let port = if cfg.node_port <= 0 {
            DEFAULT_API_SERVER_PORT
        } else {
            cfg.node_port
        };
        let server = format!("https://{}:{}", cfg.node_ip, port);

        let get = self.kubectl("-n kube-system get configmap kube-proxy -o yaml");
        let replace = self.kubectl("-n kube-system replace -f -");
        self.exec(format!(
            "{get} | sed 's#server: https://.*#server: {server}#' | {replace}"
        ))
        .await?;

        self.exec(self.kubectl("-n kube-system delete pods -l k8s-app=kube-proxy"))
            .await?;
        info!(server = %server, "Restarted kube-proxy");
        Ok(())
    }
}
