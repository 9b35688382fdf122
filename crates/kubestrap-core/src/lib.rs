//! # Kubestrap Core
//!
//! Lifecycle management for a single-node Kubernetes control plane driven by
//! kubeadm.
//!
//! The crate is layered leaves first:
//!
//! - [`version`] parses a release and derives its version-gated capabilities
//! - [`render`] produces the bootstrap config, kubelet units, hosts file and
//!   default CNI configuration in memory
//! - [`cache`] fetches release binaries into a versioned, verified cache
//! - [`health`] maps kubelet and API server probes to a [`LifecycleState`]
//! - [`bootstrapper`] sequences everything against a node through a
//!   [`command_executor::CommandRunner`]
//!
//! ```rust,ignore
//! use command_executor::ExecRunner;
//! use kubestrap_core::KubeadmBootstrapper;
//! use std::sync::Arc;
//!
//! let bootstrapper = KubeadmBootstrapper::from_settings(Arc::new(ExecRunner), &config.settings);
//! bootstrapper.update_cluster(&config.cluster).await?;
//! bootstrapper.start_cluster(&config.cluster).await?;
//! ```

#![warn(missing_docs)]

pub mod addons;
pub mod bootstrapper;
pub mod cache;
pub mod cluster_ops;
pub mod commands;
pub mod constants;
pub mod download;
pub mod error;
pub mod extra_args;
pub mod features;
pub mod health;
pub mod images;
pub mod render;
pub mod retry;
pub mod runtime;
pub mod version;

pub use addons::{AddonCatalog, LocalAddons, StaticAddons};
pub use bootstrapper::KubeadmBootstrapper;
pub use cache::BinaryCache;
pub use cluster_ops::{ClusterOps, KubectlOps};
pub use download::{Checksum, DownloadError, Downloader, HttpDownloader};
pub use error::{Error, OperationContext, Result};
pub use health::LifecycleState;
pub use render::{ArtifactKind, RenderedArtifact, generate_artifacts};
pub use retry::RetryPolicy;
pub use version::ResolvedVersion;
