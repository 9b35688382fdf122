//! Built-in runners for the execution contexts a node can be reached through
//!
//! - [`ExecRunner`] runs commands on this machine
//! - [`SshRunner`] runs commands on a remote machine over SSH
//!
//! Callers that need another transport implement
//! [`CommandRunner`](crate::CommandRunner) directly.

mod process;

pub mod local;
pub use local::ExecRunner;

pub mod ssh;
pub use ssh::{SshConfig, SshRunner};
