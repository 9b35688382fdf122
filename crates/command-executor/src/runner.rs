//! The command runner contract shared by every execution context

use crate::asset::CopyableFile;
use crate::error::Result;
use async_trait::async_trait;
use futures::io::AsyncWrite;
use std::sync::Arc;

/// Runs shell command lines and stages files on a host
///
/// Implementations exist for the local machine ([`ExecRunner`](crate::ExecRunner))
/// and for a remote machine reached over SSH ([`SshRunner`](crate::SshRunner)).
/// Command lines are handed to a POSIX shell verbatim.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command, discarding its output
    async fn run(&self, cmd: &str) -> Result<()> {
        self.combined_output(cmd).await.map(drop)
    }

    /// Run a command and capture stdout and stderr interleaved
    ///
    /// A non-zero exit is an [`Error::NonZeroExit`](crate::Error::NonZeroExit)
    /// carrying whatever output was captured.
    async fn combined_output(&self, cmd: &str) -> Result<String>;

    /// Run a command, writing each output line to `sink` as it arrives
    async fn combined_output_to(
        &self,
        cmd: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()>;

    /// Stage a file at its target path, creating parent directories
    async fn copy(&self, file: &CopyableFile) -> Result<()>;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    async fn run(&self, cmd: &str) -> Result<()> {
        (**self).run(cmd).await
    }

    async fn combined_output(&self, cmd: &str) -> Result<String> {
        (**self).combined_output(cmd).await
    }

    async fn combined_output_to(
        &self,
        cmd: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        (**self).combined_output_to(cmd, sink).await
    }

    async fn copy(&self, file: &CopyableFile) -> Result<()> {
        (**self).copy(file).await
    }
}
