//! Shared fixtures for kubestrap-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kubestrap_config::ClusterConfig;
use kubestrap_core::download::{ChecksumSource, write_verified};
use kubestrap_core::{Checksum, DownloadError, Downloader};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

/// Serves release binaries from memory and publishes their digests
#[derive(Default)]
pub struct MemoryDownloader {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    bodies: HashMap<String, Vec<u8>>,
    digests: HashMap<String, String>,
    transfers: Vec<String>,
}

impl MemoryDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url` with a matching `<url>.sha256`
    pub fn serve(self, url: &str, body: &[u8]) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.bodies.insert(url.to_string(), body.to_vec());
            inner
                .digests
                .insert(format!("{url}.sha256"), hex::encode(Sha256::digest(body)));
        }
        self
    }

    /// Serve `body` at `url` but publish the digest of something else
    pub fn serve_corrupted(self, url: &str, body: &[u8]) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.bodies.insert(url.to_string(), body.to_vec());
            inner.digests.insert(
                format!("{url}.sha256"),
                hex::encode(Sha256::digest(b"the real release")),
            );
        }
        self
    }

    /// URLs transferred so far
    pub fn transfers(&self) -> Vec<String> {
        self.inner.lock().unwrap().transfers.clone()
    }
}

#[async_trait]
impl Downloader for MemoryDownloader {
    async fn download(&self, url: &str, target: &Path, checksum: &Checksum) -> Result<(), DownloadError> {
        let (body, expected) = {
            let mut inner = self.inner.lock().unwrap();
            inner.transfers.push(url.to_string());
            let expected = match &checksum.source {
                ChecksumSource::Digest(digest) => Some(digest.clone()),
                ChecksumSource::Url(checksum_url) => inner.digests.get(checksum_url).cloned(),
            };
            (inner.bodies.get(url).cloned(), expected)
        };

        let not_found = || DownloadError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, url.to_string()));
        let body = body.ok_or_else(not_found)?;
        let expected = expected.ok_or_else(not_found)?;
        write_verified(&mut Cursor::new(body), target, &expected)
    }
}

/// Release URL of `binary` in the upstream bucket
pub fn release_url(version: &str, binary: &str) -> String {
    format!("https://dl.k8s.io/release/{version}/bin/linux/amd64/{binary}")
}

/// A minimal valid cluster for `version`
pub fn cluster(version: &str) -> ClusterConfig {
    ClusterConfig {
        node_name: "kubestrap".to_string(),
        node_ip: "192.168.39.10".to_string(),
        kubernetes_version: version.to_string(),
        ..Default::default()
    }
}
