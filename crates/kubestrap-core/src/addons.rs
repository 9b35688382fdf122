//! Additional assets staged with every convergence
//!
//! Two sources feed the catalog: files mirrored from a local directory onto
//! the node's root filesystem, and built-in bundles toggled in the settings.

use crate::constants::ADDONS_DIR;
use crate::error::{Error, Result};
use async_trait::async_trait;
use command_executor::CopyableFile;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Enumerates add-on files to stage
#[async_trait]
pub trait AddonCatalog: Send + Sync {
    /// Every enabled asset; a hard enumeration failure is an error
    async fn assets(&self) -> Result<Vec<CopyableFile>>;
}

/// A fixed list of assets
#[derive(Debug, Clone, Default)]
pub struct StaticAddons(pub Vec<CopyableFile>);

#[async_trait]
impl AddonCatalog for StaticAddons {
    async fn assets(&self) -> Result<Vec<CopyableFile>> {
        Ok(self.0.clone())
    }
}

/// A named set of assets shipped with kubestrap
#[derive(Debug, Clone)]
pub struct AddonBundle {
    /// Name used in the settings' `addons` map
    pub name: &'static str,
    /// Whether the bundle is staged when the settings do not mention it
    pub enabled_by_default: bool,
    /// Files in the bundle
    pub assets: Vec<CopyableFile>,
}

const DEFAULT_STORAGE_CLASS: &str = "\
apiVersion: storage.k8s.io/v1
kind: StorageClass
metadata:
  namespace: kube-system
  name: standard
  annotations:
    storageclass.beta.kubernetes.io/is-default-class: \"true\"
  labels:
    addonmanager.kubernetes.io/mode: EnsureExists
provisioner: kubernetes.io/no-provisioner
volumeBindingMode: WaitForFirstConsumer
";

/// Bundles known to kubestrap
pub fn builtin_bundles() -> Vec<AddonBundle> {
    vec![AddonBundle {
        name: "default-storageclass",
        enabled_by_default: true,
        assets: vec![CopyableFile::from_memory(
            DEFAULT_STORAGE_CLASS,
            &format!("{ADDONS_DIR}/storageclass.yaml"),
            "0640",
        )],
    }]
}

/// Custom files from a local directory plus the built-in bundles
#[derive(Debug, Clone)]
pub struct LocalAddons {
    files_dir: PathBuf,
    enabled: BTreeMap<String, String>,
    bundles: Vec<AddonBundle>,
}

impl LocalAddons {
    /// Mirror `files_dir` and stage bundles according to `enabled`
    pub fn new(files_dir: impl Into<PathBuf>, enabled: BTreeMap<String, String>) -> Self {
        Self {
            files_dir: files_dir.into(),
            enabled,
            bundles: builtin_bundles(),
        }
    }

    /// Replace the built-in bundles
    pub fn with_bundles(mut self, bundles: Vec<AddonBundle>) -> Self {
        self.bundles = bundles;
        self
    }

    fn is_enabled(&self, bundle: &AddonBundle) -> Option<bool> {
        match self.enabled.get(bundle.name) {
            None => Some(bundle.enabled_by_default),
            Some(flag) => flag.trim().parse::<bool>().ok(),
        }
    }
}

#[async_trait]
impl AddonCatalog for LocalAddons {
    async fn assets(&self) -> Result<Vec<CopyableFile>> {
        let root = self.files_dir.clone();
        let mut assets = smol::unblock(move || custom_assets(&root))
            .await
            .map_err(|e| Error::addons(format!("reading {}: {e}", self.files_dir.display())))?;

        for bundle in &self.bundles {
            match self.is_enabled(bundle) {
                Some(true) => assets.extend(bundle.assets.iter().cloned()),
                Some(false) => debug!(addon = bundle.name, "Add-on disabled"),
                None => warn!(
                    addon = bundle.name,
                    value = ?self.enabled.get(bundle.name),
                    "Ignoring add-on with an unparsable enable flag"
                ),
            }
        }
        Ok(assets)
    }
}

/// Every file under `root`, targeted at the same relative path under `/`
fn custom_assets(root: &Path) -> walkdir::Result<Vec<CopyableFile>> {
    let mut assets = Vec::new();
    if !root.is_dir() {
        return Ok(assets);
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let target_dir = match relative.parent() {
            Some(parent) => format!("/{}", parent.display()),
            None => "/".to_string(),
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        assets.push(CopyableFile::from_file(entry.path(), target_dir, name, "0640"));
    }

    assets.sort_by_key(|asset| asset.target_path());
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn targets(assets: &[CopyableFile]) -> Vec<String> {
        assets.iter().map(|a| a.target_path()).collect()
    }

    #[smol_potat::test]
    async fn test_custom_files_mirror_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("etc/ssl/certs")).unwrap();
        fs::write(dir.path().join("etc/ssl/certs/corp.pem"), "pem").unwrap();
        fs::write(dir.path().join("motd"), "hi").unwrap();

        let catalog = LocalAddons::new(dir.path(), BTreeMap::new()).with_bundles(Vec::new());
        let assets = catalog.assets().await.unwrap();

        assert_eq!(targets(&assets), vec!["/etc/ssl/certs/corp.pem", "/motd"]);
    }

    #[smol_potat::test]
    async fn test_nested_files_keep_their_modes_and_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("etc/kubernetes/manifests/extra")).unwrap();
        fs::write(dir.path().join("etc/kubernetes/manifests/extra/b.yaml"), "b").unwrap();
        fs::write(dir.path().join("etc/kubernetes/manifests/a.yaml"), "a").unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let catalog = LocalAddons::new(dir.path(), BTreeMap::new()).with_bundles(Vec::new());
        let assets = catalog.assets().await.unwrap();

        assert_eq!(
            targets(&assets),
            vec![
                "/etc/kubernetes/manifests/a.yaml",
                "/etc/kubernetes/manifests/extra/b.yaml",
            ]
        );
        assert!(assets.iter().all(|a| a.permissions() == "0640"));
    }

    #[smol_potat::test]
    async fn test_missing_files_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let catalog = LocalAddons::new(dir.path().join("absent"), BTreeMap::new());
        let assets = catalog.assets().await.unwrap();
        assert_eq!(targets(&assets), vec!["/etc/kubernetes/addons/storageclass.yaml"]);
    }

    #[smol_potat::test]
    async fn test_bundle_flags() {
        let dir = TempDir::new().unwrap();
        let flags = |value: &str| {
            BTreeMap::from([("default-storageclass".to_string(), value.to_string())])
        };

        let disabled = LocalAddons::new(dir.path(), flags("false"));
        assert!(disabled.assets().await.unwrap().is_empty());

        let garbled = LocalAddons::new(dir.path(), flags("maybe"));
        assert!(garbled.assets().await.unwrap().is_empty());

        let enabled = LocalAddons::new(dir.path(), flags("true"));
        assert_eq!(enabled.assets().await.unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[smol_potat::test]
    async fn test_unreadable_files_dir_is_hard_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores directory permissions
        if fs::read_dir(&locked).is_ok() {
            return;
        }

        let catalog = LocalAddons::new(dir.path(), BTreeMap::new());
        let err = catalog.assets().await.unwrap_err();
        assert!(matches!(err, Error::Addons(_)));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
