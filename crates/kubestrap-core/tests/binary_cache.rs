//! Binary cache behaviour against an in-memory release bucket

mod common;

use common::{MemoryDownloader, release_url};
use kubestrap_core::{BinaryCache, Error, ResolvedVersion};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_second_fetch_is_a_cache_hit() {
    smol::block_on(async {
        let dir = TempDir::new().unwrap();
        let downloader = Arc::new(MemoryDownloader::new().serve(&release_url("v1.13.0", "kubeadm"), b"kubeadm"));
        let cache = BinaryCache::new(dir.path(), downloader.clone());
        let version = ResolvedVersion::parse("v1.13.0").unwrap();

        let first = cache.fetch("kubeadm", &version).await.unwrap();
        let second = cache.fetch("kubeadm", &version).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("v1.13.0").join("kubeadm"));
        assert_eq!(std::fs::read(&first).unwrap(), b"kubeadm");
        assert_eq!(downloader.transfers().len(), 1);
    });
}

#[test]
fn test_existing_entry_is_trusted() {
    smol::block_on(async {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("v1.12.1").join("kubelet");
        std::fs::create_dir_all(staged.parent().unwrap()).unwrap();
        std::fs::write(&staged, b"copied in by hand").unwrap();

        let downloader = Arc::new(MemoryDownloader::new());
        let cache = BinaryCache::new(dir.path(), downloader.clone());
        let version = ResolvedVersion::parse("1.12.1").unwrap();

        assert_eq!(cache.fetch("kubelet", &version).await.unwrap(), staged);
        assert!(downloader.transfers().is_empty());
    });
}

#[test]
fn test_checksum_mismatch_leaves_no_entry() {
    smol::block_on(async {
        let dir = TempDir::new().unwrap();
        let downloader = Arc::new(
            MemoryDownloader::new().serve_corrupted(&release_url("v1.13.0", "kubelet"), b"tampered"),
        );
        let cache = BinaryCache::new(dir.path(), downloader);
        let version = ResolvedVersion::parse("v1.13.0").unwrap();

        let err = cache.fetch("kubelet", &version).await.unwrap_err();
        match &err {
            Error::Download { binary, version, .. } => {
                assert_eq!(binary, "kubelet");
                assert_eq!(version, "v1.13.0");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("checksum mismatch"));

        let target = cache.path_for("kubelet", &ResolvedVersion::parse("v1.13.0").unwrap());
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(target.parent().unwrap()).unwrap().count(), 0);
    });
}

#[test]
fn test_concurrent_fetch_with_one_corrupted_binary() {
    smol::block_on(async {
        let dir = TempDir::new().unwrap();
        let downloader = Arc::new(
            MemoryDownloader::new()
                .serve(&release_url("v1.14.0", "kubelet"), b"kubelet")
                .serve_corrupted(&release_url("v1.14.0", "kubeadm"), b"kubeadm"),
        );
        let cache = BinaryCache::new(dir.path(), downloader.clone());
        let version = ResolvedVersion::parse("1.14.0").unwrap();

        let err = cache.fetch_all(&["kubelet", "kubeadm"], &version).await.unwrap_err();

        assert!(matches!(&err, Error::Download { binary, .. } if binary == "kubeadm"));
        assert!(cache.path_for("kubelet", &version).exists());
        assert!(!cache.path_for("kubeadm", &version).exists());
        assert_eq!(downloader.transfers().len(), 2);
    });
}

#[test]
fn test_missing_release_is_download_error() {
    smol::block_on(async {
        let dir = TempDir::new().unwrap();
        let cache = BinaryCache::new(dir.path(), Arc::new(MemoryDownloader::new()));
        let version = ResolvedVersion::parse("v1.13.0").unwrap();

        let err = cache.fetch_all(&["kubelet", "kubeadm"], &version).await.unwrap_err();
        assert!(matches!(&err, Error::Download { binary, .. } if binary == "kubelet"));
    });
}
