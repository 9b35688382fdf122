//! SSH remote execution using the system `ssh` client

use async_process::Command;
use async_trait::async_trait;
use futures::io::AsyncWrite;
use std::path::PathBuf;
use tracing::debug;

use super::process::capture;
use crate::asset::CopyableFile;
use crate::error::{Error, Result};
use crate::runner::CommandRunner;

/// Exit status `ssh` reports when the connection itself failed
const SSH_CONNECTION_FAILURE: i32 = 255;

/// SSH connection configuration
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP)
    host: String,
    /// SSH user (optional, uses system default if not specified)
    user: Option<String>,
    /// SSH port (optional, defaults to 22)
    port: Option<u16>,
    /// Path to identity file (private key)
    identity_file: Option<PathBuf>,
    /// Additional SSH arguments
    extra_args: Vec<String>,
}

impl SshConfig {
    /// Create a new SSH configuration for the given host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: None,
            identity_file: None,
            extra_args: Vec::new(),
        }
    }

    /// Set the SSH user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the SSH port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the identity file (private key)
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Add extra SSH arguments
    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// The bare host name or address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the host string (user@host if user is specified)
    fn host_string(&self) -> String {
        if let Some(user) = &self.user {
            format!("{}@{}", user, self.host)
        } else {
            self.host.clone()
        }
    }

    /// Arguments passed to `ssh` ahead of the remote command
    fn ssh_args(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(self.host_string());
        args
    }
}

/// Runner for a remote host reached through an SSH session per command
#[derive(Debug, Clone)]
pub struct SshRunner {
    config: SshConfig,
}

impl SshRunner {
    /// Create a runner for the configured host
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Convenience constructor using default SSH settings
    pub fn to_host(host: impl Into<String>) -> Self {
        Self::new(SshConfig::new(host))
    }

    /// The connection settings
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    fn ssh(&self, remote_command: &str) -> Command {
        let mut ssh = Command::new("ssh");
        ssh.args(self.config.ssh_args());
        ssh.arg(remote_command);
        ssh
    }

    async fn exec(
        &self,
        remote_command: &str,
        stdin: Option<Vec<u8>>,
        sink: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
    ) -> Result<String> {
        capture(self.ssh(remote_command), remote_command, stdin, sink)
            .await
            .map_err(|err| self.classify(err))
    }

    /// Turn ssh's own connection failures into [`Error::SshConnectionFailed`]
    fn classify(&self, err: Error) -> Error {
        match err {
            Error::NonZeroExit {
                code: Some(SSH_CONNECTION_FAILURE),
                output,
                ..
            } => Error::SshConnectionFailed {
                host: self.config.host.clone(),
                reason: output.trim().to_string(),
            },
            other => other,
        }
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn combined_output(&self, cmd: &str) -> Result<String> {
        self.exec(cmd, None, None).await
    }

    async fn combined_output_to(
        &self,
        cmd: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        self.exec(cmd, None, Some(sink)).await.map(drop)
    }

    async fn copy(&self, file: &CopyableFile) -> Result<()> {
        // Validate the mode locally before anything reaches the remote shell
        file.mode()?;
        let contents = file.read().await?;
        let target = shell_escape(file.target_path());
        let remote = format!(
            "sudo mkdir -p {dir} && sudo tee {target} > /dev/null && sudo chmod {mode} {target}",
            dir = shell_escape(file.target_dir().to_string()),
            target = target,
            mode = shell_escape(file.permissions().to_string()),
        );

        debug!(host = %self.config.host, target = %file.target_path(), bytes = contents.len(), "copying file over ssh");
        self.exec(&remote, Some(contents), None).await.map(drop)
    }
}

/// Escape a string for safe inclusion in a shell command
pub fn shell_escape(s: String) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.contains(|c: char| c.is_whitespace() || "\"'\\$`!*?<>|&;()[]{}#~".contains(c)) {
        // Use single quotes and escape any single quotes in the string
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    } else {
        s
    }
}
