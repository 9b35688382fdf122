//! Loading control-plane images from a local cache before `kubeadm` pulls them

use crate::constants::IMAGE_STAGING_DIR;
use crate::error::{Error, Result};
use crate::version::{ResolvedVersion, first_alpha};
use command_executor::{CommandRunner, CopyableFile};
use semver::Version;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const REGISTRY: &str = "k8s.gcr.io";

/// Images kubeadm pulls for `version`
pub fn cached_images(version: &ResolvedVersion) -> Vec<String> {
    let tag = version.release_tag();
    let v = version.version();
    let arch_suffix = if *v >= first_alpha(1, 12) { "" } else { "-amd64" };

    let mut images: Vec<String> = ["kube-proxy", "kube-scheduler", "kube-controller-manager", "kube-apiserver"]
        .into_iter()
        .map(|component| format!("{REGISTRY}/{component}{arch_suffix}:{tag}"))
        .collect();

    let (etcd, dns): (&str, &[&str]) = if *v >= Version::new(1, 13, 0) {
        ("3.2.24", &["coredns/coredns:1.2.6"])
    } else if *v >= first_alpha(1, 12) {
        ("3.2.24", &["coredns/coredns:1.2.2"])
    } else {
        (
            "3.1.12",
            &[
                "k8s-dns-kube-dns-amd64:1.14.8",
                "k8s-dns-dnsmasq-nanny-amd64:1.14.8",
                "k8s-dns-sidecar-amd64:1.14.8",
            ],
        )
    };
    images.push(format!("{REGISTRY}/pause{arch_suffix}:3.1"));
    images.push(format!("{REGISTRY}/etcd{arch_suffix}:{etcd}"));
    images.extend(dns.iter().map(|image| {
        if image.starts_with("coredns/") {
            image.to_string()
        } else {
            format!("{REGISTRY}/{image}")
        }
    }));
    images
}

/// Where the tarball of `image` lives under `cache_dir`
pub fn image_tarball(cache_dir: &Path, image: &str) -> PathBuf {
    cache_dir.join(image.replace(':', "_"))
}

/// Copy each cached tarball to the node and `docker load` it
///
/// Images without a cached tarball are skipped; kubeadm pulls them instead.
pub async fn load_cached_images(runner: &dyn CommandRunner, images: &[String], cache_dir: &Path) -> Result<()> {
    for image in images {
        let tarball = image_tarball(cache_dir, image);
        if async_fs::metadata(&tarball).await.is_err() {
            debug!(image = %image, path = %tarball.display(), "No cached tarball, skipping");
            continue;
        }

        let name = image.replace(['/', ':'], "_");
        let file = CopyableFile::from_file(&tarball, IMAGE_STAGING_DIR, name.as_str(), "0644");
        let staged = file.target_path();
        runner.copy(&file).await.map_err(|source| Error::Stage {
            path: staged.clone(),
            source,
        })?;

        info!(image = %image, "Loading cached image");
        let load = format!("sudo docker load -i {staged}");
        runner.run(&load).await.map_err(|e| Error::exec(&load, e))?;
        let cleanup = format!("sudo rm -f {staged}");
        runner.run(&cleanup).await.map_err(|e| Error::exec(&cleanup, e))?;
    }
    Ok(())
}
