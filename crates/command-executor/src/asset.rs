//! Files that can be staged onto a host by a [`CommandRunner`](crate::CommandRunner)

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the bytes of a [`CopyableFile`] come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Contents rendered in memory
    Memory(Vec<u8>),
    /// A file on the local filesystem, read when the copy happens
    File(PathBuf),
}

/// A file destined for a fixed path on the target host
#[derive(Clone, PartialEq, Eq)]
pub struct CopyableFile {
    source: AssetSource,
    target_dir: String,
    target_name: String,
    permissions: String,
}

impl CopyableFile {
    /// Create an asset from in-memory contents, addressed by its full target path
    pub fn from_memory(contents: impl Into<Vec<u8>>, target_path: &str, permissions: impl Into<String>) -> Self {
        let (dir, name) = split_target(target_path);
        Self {
            source: AssetSource::Memory(contents.into()),
            target_dir: dir,
            target_name: name,
            permissions: permissions.into(),
        }
    }

    /// Create an asset backed by a local file
    pub fn from_file(
        path: impl Into<PathBuf>,
        target_dir: impl Into<String>,
        target_name: impl Into<String>,
        permissions: impl Into<String>,
    ) -> Self {
        Self {
            source: AssetSource::File(path.into()),
            target_dir: target_dir.into(),
            target_name: target_name.into(),
            permissions: permissions.into(),
        }
    }

    /// Where the bytes come from
    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    /// Directory the file lands in on the target
    pub fn target_dir(&self) -> &str {
        &self.target_dir
    }

    /// File name on the target
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Full target path
    pub fn target_path(&self) -> String {
        if self.target_dir.ends_with('/') {
            format!("{}{}", self.target_dir, self.target_name)
        } else {
            format!("{}/{}", self.target_dir, self.target_name)
        }
    }

    /// Permission string as given, e.g. `"0644"`
    pub fn permissions(&self) -> &str {
        &self.permissions
    }

    /// Permission bits parsed from the octal string
    pub fn mode(&self) -> Result<u32> {
        u32::from_str_radix(self.permissions.trim_start_matches("0o"), 8).map_err(|_| {
            Error::InvalidPermissions {
                path: self.target_path(),
                mode: self.permissions.clone(),
            }
        })
    }

    /// Load the file contents
    pub async fn read(&self) -> Result<Vec<u8>> {
        match &self.source {
            AssetSource::Memory(bytes) => Ok(bytes.clone()),
            AssetSource::File(path) => Ok(async_fs::read(path).await?),
        }
    }
}

impl fmt::Debug for CopyableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            AssetSource::Memory(bytes) => format!("memory ({} bytes)", bytes.len()),
            AssetSource::File(path) => path.display().to_string(),
        };
        f.debug_struct("CopyableFile")
            .field("source", &source)
            .field("target", &self.target_path())
            .field("permissions", &self.permissions)
            .finish()
    }
}

fn split_target(target_path: &str) -> (String, String) {
    let path = Path::new(target_path);
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_asset_splits_target_path() {
        let file = CopyableFile::from_memory("x", "/var/lib/kubeadm.yaml", "0640");
        assert_eq!(file.target_dir(), "/var/lib");
        assert_eq!(file.target_name(), "kubeadm.yaml");
        assert_eq!(file.target_path(), "/var/lib/kubeadm.yaml");
        assert_eq!(file.mode().unwrap(), 0o640);
    }

    #[test]
    fn test_invalid_mode() {
        let file = CopyableFile::from_memory("x", "/etc/hosts", "rw-r--r--");
        assert!(matches!(file.mode(), Err(Error::InvalidPermissions { .. })));
    }

    #[test]
    fn test_debug_hides_contents() {
        let file = CopyableFile::from_memory(vec![0u8; 4], "/etc/hosts", "0644");
        let rendered = format!("{:?}", file);
        assert!(rendered.contains("memory (4 bytes)"));
        assert!(rendered.contains("/etc/hosts"));
    }
}
