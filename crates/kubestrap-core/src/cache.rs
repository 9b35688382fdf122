//! Versioned cache of Kubernetes release binaries

use crate::constants::{KUBERNETES_RELEASE_URL, RELEASE_ARCH};
use crate::download::{Checksum, DownloadError, Downloader};
use crate::error::{Error, Result};
use crate::version::ResolvedVersion;
use futures::future::join_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Release binaries cached under `<root>/<version>/<binary>`
///
/// An existing entry is trusted without re-verification. Entries are only ever
/// added, one version directory at a time.
#[derive(Clone)]
pub struct BinaryCache {
    root: PathBuf,
    release_url: String,
    arch: String,
    downloader: Arc<dyn Downloader>,
}

impl BinaryCache {
    /// Create a cache rooted at `root` that fills misses with `downloader`
    pub fn new(root: impl Into<PathBuf>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            root: root.into(),
            release_url: KUBERNETES_RELEASE_URL.to_string(),
            arch: RELEASE_ARCH.to_string(),
            downloader,
        }
    }

    /// Fetch releases from a mirror instead of the upstream bucket
    pub fn with_release_url(mut self, release_url: impl Into<String>) -> Self {
        self.release_url = release_url.into();
        self
    }

    /// Fetch binaries for another architecture
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Cache root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `binary` for `version` lives in the cache
    pub fn path_for(&self, binary: &str, version: &ResolvedVersion) -> PathBuf {
        self.root.join(version.release_tag()).join(binary)
    }

    /// Release URL of `binary` for `version`
    pub fn release_url(&self, binary: &str, version: &ResolvedVersion) -> String {
        format!(
            "{}/{}/bin/linux/{}/{}",
            self.release_url.trim_end_matches('/'),
            version.release_tag(),
            self.arch,
            binary
        )
    }

    /// Return the cached path of `binary`, downloading and verifying it on a miss
    pub async fn fetch(&self, binary: &str, version: &ResolvedVersion) -> Result<PathBuf> {
        let target = self.path_for(binary, version);
        let wrap = |source: DownloadError| Error::Download {
            binary: binary.to_string(),
            version: version.release_tag(),
            source,
        };

        match async_fs::metadata(&target).await {
            Ok(_) => {
                debug!(binary = %binary, version = %version, path = %target.display(), "Cache hit");
                return Ok(target);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(wrap(e.into())),
        }

        if let Some(dir) = target.parent() {
            async_fs::create_dir_all(dir).await.map_err(|e| wrap(e.into()))?;
        }

        let url = self.release_url(binary, version);
        let checksum = Checksum::sha256_at(format!("{url}.sha256"));

        info!(binary = %binary, version = %version, "Downloading");
        if let Err(e) = self.downloader.download(&url, &target, &checksum).await {
            // Never leave a partial entry behind, whatever the downloader did
            if let Err(cleanup) = discard_entry(&target).await {
                warn!(path = %target.display(), error = %cleanup, "Failed to remove partial download");
            }
            return Err(wrap(e));
        }
        info!(binary = %binary, version = %version, "Finished downloading");

        Ok(target)
    }

    /// Fetch several binaries concurrently
    ///
    /// Every fetch runs to completion; the first failure in `binaries` order is returned.
    pub async fn fetch_all(&self, binaries: &[&str], version: &ResolvedVersion) -> Result<Vec<PathBuf>> {
        join_all(binaries.iter().map(|binary| self.fetch(binary, version)))
            .await
            .into_iter()
            .collect()
    }
}

/// Remove a cache entry; an entry that was never written is not an error
async fn discard_entry(target: &Path) -> std::io::Result<()> {
    match async_fs::remove_file(target).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl std::fmt::Debug for BinaryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryCache")
            .field("root", &self.root)
            .field("release_url", &self.release_url)
            .field("arch", &self.arch)
            .finish_non_exhaustive()
    }
}
