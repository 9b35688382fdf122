//! Lifecycle orchestration for a kubeadm-managed node
//!
//! [`KubeadmBootstrapper`] is stateless between calls: every operation
//! resolves the version and renders what it needs from the [`ClusterConfig`]
//! it is handed.

use crate::addons::{AddonCatalog, LocalAddons, StaticAddons};
use crate::cache::BinaryCache;
use crate::cluster_ops::{ClusterOps, KubectlOps};
use crate::commands::{
    ENABLE_IP_FORWARD, LOAD_BR_NETFILTER, START_KUBELET, kubeadm_init, kubelet_logs, restart_phases,
};
use crate::constants::{BINARY_INSTALL_DIR, CLUSTER_BINARIES, DEFAULT_API_SERVER_PORT};
use crate::download::HttpDownloader;
use crate::error::{Error, OperationContext, Result};
use crate::health::{self, HEALTH_CHECK_TIMEOUT, LifecycleState};
use crate::images::{cached_images, load_cached_images};
use crate::render::generate_artifacts;
use crate::retry::{RetryPolicy, retry_after};
use crate::runtime::ContainerRuntime;
use crate::version::ResolvedVersion;
use command_executor::{CommandRunner, CopyableFile};
use futures::io::{AsyncWrite, AsyncWriteExt};
use kubestrap_config::{ClusterConfig, ConfigError, Settings};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Drives bootstrap, reconstruction and convergence of a single node
pub struct KubeadmBootstrapper {
    runner: Arc<dyn CommandRunner>,
    cache: BinaryCache,
    cluster_ops: Arc<dyn ClusterOps>,
    addons: Arc<dyn AddonCatalog>,
    image_cache_dir: PathBuf,
    unmark_policy: RetryPolicy,
    elevate_policy: RetryPolicy,
    health_timeout: Duration,
}

impl KubeadmBootstrapper {
    /// Create a bootstrapper with kubectl-based cluster operations and no add-ons
    pub fn new(runner: Arc<dyn CommandRunner>, cache: BinaryCache) -> Self {
        let image_cache_dir = cache.root().join("images");
        Self {
            cluster_ops: Arc::new(KubectlOps::new(runner.clone())),
            addons: Arc::new(StaticAddons::default()),
            runner,
            cache,
            image_cache_dir,
            unmark_policy: RetryPolicy::unmark_master(),
            elevate_policy: RetryPolicy::elevate_privileges(),
            health_timeout: HEALTH_CHECK_TIMEOUT,
        }
    }

    /// Create a bootstrapper wired from tool settings: HTTPS downloads into the
    /// configured cache, local add-ons and the configured image cache
    pub fn from_settings(runner: Arc<dyn CommandRunner>, settings: &Settings) -> Self {
        let cache = BinaryCache::new(settings.cache_dir(), Arc::new(HttpDownloader::new()));
        Self::new(runner, cache)
            .with_addons(Arc::new(LocalAddons::new(
                settings.files_dir(),
                settings.addons.clone(),
            )))
            .with_image_cache_dir(settings.image_cache_dir())
    }

    /// Use other cluster operations
    pub fn with_cluster_ops(mut self, cluster_ops: Arc<dyn ClusterOps>) -> Self {
        self.cluster_ops = cluster_ops;
        self
    }

    /// Use another add-on catalog
    pub fn with_addons(mut self, addons: Arc<dyn AddonCatalog>) -> Self {
        self.addons = addons;
        self
    }

    /// Look for image tarballs in `dir`
    pub fn with_image_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_cache_dir = dir.into();
        self
    }

    /// Override the post-bootstrap retry loops
    pub fn with_retry_policies(mut self, unmark: RetryPolicy, elevate: RetryPolicy) -> Self {
        self.unmark_policy = unmark;
        self.elevate_policy = elevate;
        self
    }

    /// Limit API server health checks to `timeout`
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    async fn exec(&self, cmd: &str) -> Result<String> {
        debug!(command = %cmd, "Running");
        self.runner
            .combined_output(cmd)
            .await
            .map_err(|e| Error::exec(cmd, e))
    }

    async fn stage(&self, file: &CopyableFile) -> Result<()> {
        let path = file.target_path();
        debug!(path = %path, "Transferring");
        self.runner
            .copy(file)
            .await
            .map_err(|source| Error::Stage { path, source })
    }

    /// Bootstrap a new control plane with `kubeadm init`
    pub async fn start_cluster(&self, cfg: &ClusterConfig) -> Result<()> {
        let version = ResolvedVersion::parse(&cfg.kubernetes_version).during("parsing kubernetes version")?;
        let runtime = ContainerRuntime::from_selector(&cfg.container_runtime);

        if runtime.is_alternate() {
            info!(runtime = %cfg.container_runtime, "Preparing host for container runtime");
            for cmd in [LOAD_BR_NETFILTER, ENABLE_IP_FORWARD] {
                self.exec(cmd).await.during("preparing host for container runtime")?;
            }
        }

        let init = kubeadm_init(&version, &runtime);
        info!(version = %version, "Running kubeadm init");
        self.exec(&init).await.during("kubeadm init")?;

        if version.needs_master_unmark() {
            let node_name = cfg.node_name.as_str();
            retry_after(&self.unmark_policy, "unmark master", || {
                self.cluster_ops.unmark_master(node_name)
            })
            .await?;
        }

        retry_after(
            &self.elevate_policy,
            "elevate kube-system RBAC privileges",
            || self.cluster_ops.elevate_kube_system_privileges(),
        )
        .await?;

        info!(node = %cfg.node_name, "Cluster started");
        Ok(())
    }

    /// Rebuild control-plane state after a host restart, one phase at a time
    pub async fn restart_cluster(&self, cfg: &ClusterConfig) -> Result<()> {
        let version = ResolvedVersion::parse(&cfg.kubernetes_version).during("parsing kubernetes version")?;

        for cmd in restart_phases(&version) {
            info!(command = %cmd, "Running phase");
            self.exec(&cmd).await.during("restarting control plane")?;
        }

        self.cluster_ops
            .restart_kube_proxy(cfg)
            .await
            .during("restarting kube-proxy")?;

        info!(node = %cfg.node_name, "Cluster restarted");
        Ok(())
    }

    /// Converge the node onto `cfg`: stage binaries, configuration and add-ons, then (re)start the kubelet
    ///
    /// Safe to call repeatedly. A failure stops the pass without rolling back
    /// files already staged.
    pub async fn update_cluster(&self, cfg: &ClusterConfig) -> Result<()> {
        let version = ResolvedVersion::parse(&cfg.kubernetes_version).during("parsing kubernetes version")?;

        if cfg.should_load_cached_images {
            load_cached_images(self.runner.as_ref(), &cached_images(&version), &self.image_cache_dir)
                .await
                .during("loading cached images")?;
        }

        let artifacts = generate_artifacts(cfg).during("generating configuration")?;

        let binaries = self
            .cache
            .fetch_all(&CLUSTER_BINARIES, &version)
            .await
            .during("downloading binaries")?;

        let addons = self.addons.assets().await.during("adding add-ons")?;

        let mut files: Vec<CopyableFile> = artifacts.iter().map(|a| a.to_copyable()).collect();
        files.extend(
            binaries
                .into_iter()
                .zip(CLUSTER_BINARIES)
                .map(|(path, name)| CopyableFile::from_file(path, BINARY_INSTALL_DIR, name, "0755")),
        );
        files.extend(addons);

        for file in &files {
            self.stage(file).await.during("transferring files")?;
        }

        self.exec(START_KUBELET).await.during("starting kubelet")?;
        info!(version = %version, files = files.len(), "Cluster updated");
        Ok(())
    }

    /// Lifecycle state of the kubelet service
    pub async fn kubelet_status(&self) -> Result<LifecycleState> {
        health::kubelet_status(self.runner.as_ref()).await
    }

    /// Lifecycle state of the API server at the node's advertised address
    pub async fn apiserver_status(&self, cfg: &ClusterConfig) -> Result<LifecycleState> {
        let ip: IpAddr = cfg.node_ip.parse().map_err(|_| {
            ConfigError::ValidationError(format!("node_ip {:?} is not an IP address", cfg.node_ip))
        })?;
        let port = if cfg.node_port <= 0 {
            DEFAULT_API_SERVER_PORT
        } else {
            cfg.node_port
        };
        let port = u16::try_from(port).map_err(|_| {
            ConfigError::ValidationError(format!("node_port {port} is not a TCP port"))
        })?;

        Ok(health::apiserver_status(ip, port, self.health_timeout).await)
    }

    /// Write the kubelet journal to `sink`, streaming it when following
    pub async fn cluster_logs_to(
        &self,
        follow: bool,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        let cmd = kubelet_logs(follow);
        if follow {
            self.runner
                .combined_output_to(&cmd, sink)
                .await
                .map_err(|e| Error::exec(&cmd, e))
                .during("getting cluster logs")?;
        } else {
            let logs = self.exec(&cmd).await.during("getting cluster logs")?;
            sink.write_all(logs.as_bytes()).await?;
            sink.flush().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for KubeadmBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeadmBootstrapper")
            .field("cache", &self.cache)
            .field("image_cache_dir", &self.image_cache_dir)
            .field("unmark_policy", &self.unmark_policy)
            .field("elevate_policy", &self.elevate_policy)
            .finish_non_exhaustive()
    }
}
