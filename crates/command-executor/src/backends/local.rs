//! Local execution: commands run through `sh -c` on this machine

use async_process::Command;
use async_trait::async_trait;
use futures::io::AsyncWrite;
use tracing::debug;

use super::process::capture;
use crate::asset::CopyableFile;
use crate::error::Result;
use crate::runner::CommandRunner;

/// Runner for the machine this process lives on
///
/// Files are written straight into the local filesystem, so staging into system
/// directories requires running as root.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecRunner;

impl ExecRunner {
    fn shell(cmd: &str) -> Command {
        let mut shell = Command::new("sh");
        shell.arg("-c").arg(cmd);
        shell
    }
}

#[async_trait]
impl CommandRunner for ExecRunner {
    async fn combined_output(&self, cmd: &str) -> Result<String> {
        capture(Self::shell(cmd), cmd, None, None).await
    }

    async fn combined_output_to(
        &self,
        cmd: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        capture(Self::shell(cmd), cmd, None, Some(sink)).await.map(drop)
    }

    async fn copy(&self, file: &CopyableFile) -> Result<()> {
        let target = file.target_path();
        let mode = file.mode()?;
        let contents = file.read().await?;

        debug!(target = %target, bytes = contents.len(), "copying file locally");
        async_fs::create_dir_all(file.target_dir()).await?;
        async_fs::write(&target, &contents).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            async_fs::set_permissions(&target, std::fs::Permissions::from_mode(mode)).await?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(())
    }
}
