//! Scripted in-memory runner for tests
//!
//! Every command is recorded. Responses are chosen by the first rule whose
//! pattern occurs in the command line; commands matching no rule succeed with
//! empty output.

use async_trait::async_trait;
use futures::io::{AsyncWrite, AsyncWriteExt};
use std::sync::Mutex;

use crate::asset::CopyableFile;
use crate::error::{Error, Result};
use crate::runner::CommandRunner;

#[derive(Debug, Clone)]
enum Response {
    Output(String),
    Exit { code: i32, output: String },
    Transport(String),
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    response: Response,
    /// How many more times the rule applies; `None` means forever
    remaining: Option<usize>,
}

/// A file captured by [`FakeRunner::copy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    /// Full target path
    pub path: String,
    /// Bytes that would have been written
    pub contents: Vec<u8>,
    /// Permission string
    pub permissions: String,
}

#[derive(Debug, Default)]
struct State {
    rules: Vec<Rule>,
    commands: Vec<String>,
    copies: Vec<CopiedFile>,
    failing_copies: Vec<String>,
}

/// A [`CommandRunner`] that never touches a real host
#[derive(Debug, Default)]
pub struct FakeRunner {
    state: Mutex<State>,
}

impl FakeRunner {
    /// Create a runner where every command succeeds silently
    pub fn new() -> Self {
        Self::default()
    }

    fn push_rule(self, pattern: &str, response: Response, remaining: Option<usize>) -> Self {
        self.lock().rules.push(Rule {
            pattern: pattern.to_string(),
            response,
            remaining,
        });
        self
    }

    /// Commands containing `pattern` succeed with `output`
    pub fn respond(self, pattern: &str, output: &str) -> Self {
        self.push_rule(pattern, Response::Output(output.to_string()), None)
    }

    /// Commands containing `pattern` always exit with `code`
    pub fn fail(self, pattern: &str, code: i32, output: &str) -> Self {
        let response = Response::Exit {
            code,
            output: output.to_string(),
        };
        self.push_rule(pattern, response, None)
    }

    /// The first `times` commands containing `pattern` exit with status 1
    pub fn fail_times(self, pattern: &str, times: usize, output: &str) -> Self {
        let response = Response::Exit {
            code: 1,
            output: output.to_string(),
        };
        self.push_rule(pattern, response, Some(times))
    }

    /// Commands containing `pattern` fail before they can run
    pub fn unreachable(self, pattern: &str, reason: &str) -> Self {
        self.push_rule(pattern, Response::Transport(reason.to_string()), None)
    }

    /// Copies to `target_path` fail
    pub fn fail_copy(self, target_path: &str) -> Self {
        self.lock().failing_copies.push(target_path.to_string());
        self
    }

    /// Every command line received, in order
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// How many recorded commands contain `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|cmd| cmd.contains(pattern))
            .count()
    }

    /// Every file staged, in order
    pub fn copies(&self) -> Vec<CopiedFile> {
        self.lock().copies.clone()
    }

    /// The last file staged at `path`
    pub fn copied(&self, path: &str) -> Option<CopiedFile> {
        self.lock()
            .copies
            .iter()
            .rev()
            .find(|file| file.path == path)
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the recorded history
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond_to(&self, cmd: &str) -> Result<String> {
        let mut state = self.lock();
        state.commands.push(cmd.to_string());

        let rule = state
            .rules
            .iter_mut()
            .find(|rule| cmd.contains(&rule.pattern) && rule.remaining != Some(0));
        let Some(rule) = rule else {
            return Ok(String::new());
        };
        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
        }

        match rule.response.clone() {
            Response::Output(output) => Ok(output),
            Response::Exit { code, output } => Err(Error::non_zero_exit(cmd, Some(code), output)),
            Response::Transport(reason) => Err(Error::spawn_failed(reason)),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn combined_output(&self, cmd: &str) -> Result<String> {
        self.respond_to(cmd)
    }

    async fn combined_output_to(
        &self,
        cmd: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        let output = self.respond_to(cmd)?;
        sink.write_all(output.as_bytes()).await?;
        sink.flush().await?;
        Ok(())
    }

    async fn copy(&self, file: &CopyableFile) -> Result<()> {
        let path = file.target_path();
        file.mode()?;
        let contents = file.read().await?;

        let mut state = self.lock();
        if state.failing_copies.contains(&path) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("copy to {} refused", path),
            )));
        }
        state.copies.push(CopiedFile {
            path,
            contents,
            permissions: file.permissions().to_string(),
        });
        Ok(())
    }
}
