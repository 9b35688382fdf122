//! Verified file transfer
//!
//! A download lands in a temporary file next to its target and is renamed
//! into place only once the digest matches, so the target path either holds
//! a complete verified file or nothing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Failures of a single verified transfer
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The HTTP request failed or returned an error status
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The transferred bytes do not match the published digest
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Published digest
        expected: String,
        /// Digest of what arrived
        actual: String,
    },

    /// The published digest is not a hex SHA-256
    #[error("malformed checksum {0:?}")]
    MalformedChecksum(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Digest algorithms understood by the downloader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// SHA-256, hex encoded
    Sha256,
}

/// Where the expected digest comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumSource {
    /// Known up front
    Digest(String),
    /// Published next to the artifact
    Url(String),
}

/// The expected digest of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    /// Digest algorithm
    pub algorithm: ChecksumAlgorithm,
    /// Digest or where to fetch it
    pub source: ChecksumSource,
}

impl Checksum {
    /// SHA-256 published at `url`
    pub fn sha256_at(url: impl Into<String>) -> Self {
        Self {
            algorithm: ChecksumAlgorithm::Sha256,
            source: ChecksumSource::Url(url.into()),
        }
    }

    /// A known SHA-256 digest
    pub fn sha256(digest: impl Into<String>) -> Self {
        Self {
            algorithm: ChecksumAlgorithm::Sha256,
            source: ChecksumSource::Digest(digest.into()),
        }
    }
}

/// Transfers `url` to `target`, verified against `checksum`
///
/// Implementations must leave nothing at `target` when they fail.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Perform the verified transfer
    async fn download(&self, url: &str, target: &Path, checksum: &Checksum) -> Result<(), DownloadError>;
}

/// Extract the digest from a `.sha256` file, which may carry a trailing file name
pub fn parse_checksum_file(contents: &str) -> Result<String, DownloadError> {
    let digest = contents.split_whitespace().next().unwrap_or_default();
    if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DownloadError::MalformedChecksum(contents.trim().to_string()));
    }
    Ok(digest.to_ascii_lowercase())
}

struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Copy `reader` to `target` through a temporary file, renaming it into place only if
/// its SHA-256 equals `expected`
pub fn write_verified(reader: &mut impl Read, target: &Path, expected: &str) -> Result<(), DownloadError> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut writer = HashingWriter {
        inner: NamedTempFile::new_in(dir)?,
        hasher: Sha256::new(),
    };
    io::copy(reader, &mut writer)?;
    writer.flush()?;

    let actual = hex::encode(writer.hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected) {
        // The temporary file is removed on drop
        return Err(DownloadError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    writer
        .inner
        .persist(target)
        .map_err(|e| DownloadError::Io(e.error))?;
    Ok(())
}

/// Downloads over HTTPS with reqwest's blocking client on smol's blocking pool
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(600),
        }
    }
}

impl HttpDownloader {
    /// Create a downloader with default timeouts
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit each whole request to `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn transfer(&self, url: &str, target: &Path, checksum: &Checksum) -> Result<(), DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()?;

        let expected = match &checksum.source {
            ChecksumSource::Digest(digest) => digest.clone(),
            ChecksumSource::Url(checksum_url) => {
                debug!(url = %checksum_url, "Fetching checksum");
                let text = client.get(checksum_url).send()?.error_for_status()?.text()?;
                parse_checksum_file(&text)?
            }
        };

        let mut response = client.get(url).send()?.error_for_status()?;
        write_verified(&mut response, target, &expected)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, target: &Path, checksum: &Checksum) -> Result<(), DownloadError> {
        let this = self.clone();
        let url = url.to_string();
        let target: PathBuf = target.to_path_buf();
        let checksum = checksum.clone();
        smol::unblock(move || this.transfer(&url, &target, &checksum)).await
    }
}
