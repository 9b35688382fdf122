//! Runtime-agnostic command execution library
//!
//! This crate provides one contract, [`CommandRunner`], for running shell
//! command lines and staging files on a host, whether that host is the local
//! machine or a remote machine reached over SSH.

#![warn(missing_docs)]

pub mod asset;
pub mod backends;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
pub mod runner;

pub use asset::{AssetSource, CopyableFile};
pub use backends::{ExecRunner, SshConfig, SshRunner};
pub use error::{Error, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use fake::{CopiedFile, FakeRunner};
pub use runner::CommandRunner;
