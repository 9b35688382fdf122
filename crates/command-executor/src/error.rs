//! Error types for command execution

use thiserror::Error;

/// Unified error type for command execution
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn a process
    #[error("failed to spawn process: {reason}")]
    SpawnFailed {
        /// The reason for the spawn failure
        reason: String,
    },

    /// The command ran but exited unsuccessfully
    #[error("command `{command}` exited with {}: {output}", describe_code(*.code))]
    NonZeroExit {
        /// The command line as it was handed to the shell
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Combined stdout and stderr captured before exit
        output: String,
    },

    /// SSH connection failed
    #[error("SSH connection failed to {host}: {reason}")]
    SshConnectionFailed {
        /// The hostname or IP address that failed to connect
        host: String,
        /// The detailed reason for the connection failure
        reason: String,
    },

    /// A copyable file carried a permission string that is not an octal mode
    #[error("invalid permission mode {mode:?} for {path}")]
    InvalidPermissions {
        /// Target path of the file
        path: String,
        /// The offending mode string
        mode: String,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Create a non-zero exit error
    pub fn non_zero_exit(command: impl Into<String>, code: Option<i32>, output: impl Into<String>) -> Self {
        Self::NonZeroExit {
            command: command.into(),
            code,
            output: output.into(),
        }
    }

    /// Output captured from the process, when the command got far enough to produce any
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::NonZeroExit { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Whether the failure happened before the command could run at all
    ///
    /// Spawn failures and broken SSH sessions are transport problems; a non-zero
    /// exit means the command itself ran and answered.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Error::NonZeroExit { .. } | Error::InvalidPermissions { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_display() {
        let err = Error::non_zero_exit("sudo systemctl is-active kubelet", Some(3), "inactive");
        assert_eq!(
            err.to_string(),
            "command `sudo systemctl is-active kubelet` exited with status 3: inactive"
        );
        assert_eq!(err.output(), Some("inactive"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_spawn_failure_is_transport() {
        let err = Error::spawn_failed("no such file");
        assert!(err.is_transport());
        assert_eq!(err.output(), None);
    }
}
