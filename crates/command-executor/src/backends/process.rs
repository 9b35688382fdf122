//! Shared child-process plumbing for the built-in runners

use async_process::{Command, Stdio};
use futures::io::{AsyncWrite, AsyncWriteExt};
use futures::stream::{BoxStream, StreamExt};
use futures_lite::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use std::io;
use tracing::debug;

use crate::error::{Error, Result};

/// Spawn `command`, feed it `stdin`, and collect stdout and stderr line by line
///
/// Lines from both pipes are interleaved in arrival order. When a sink is given
/// every line is forwarded to it, byte for byte, as soon as it is read. Output
/// that is not UTF-8 is captured lossily. `display` is the command line
/// reported in errors.
pub(crate) async fn capture(
    mut command: Command,
    display: &str,
    stdin: Option<Vec<u8>>,
    mut sink: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
) -> Result<String> {
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let command_line = display;
    debug!(command = %command_line, "spawning");
    let mut child = command
        .spawn()
        .map_err(|e| Error::spawn_failed(format!("Failed to spawn `{}`: {}", display, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::spawn_failed("stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::spawn_failed("stderr was not captured"))?;
    let input = child.stdin.take();

    let mut lines = futures::stream::select(
        raw_lines(BufReader::new(stdout)),
        raw_lines(BufReader::new(stderr)),
    );

    let write_input = async move {
        if let (Some(bytes), Some(mut input)) = (stdin, input) {
            input.write_all(&bytes).await?;
            input.close().await?;
        }
        Ok::<_, Error>(())
    };

    let read_output = async {
        let mut output = String::new();
        while let Some(line) = lines.next().await {
            let mut line = line?;
            if !line.ends_with(b"\n") {
                line.push(b'\n');
            }
            if let Some(sink) = sink.as_deref_mut() {
                sink.write_all(&line).await?;
            }
            output.push_str(&String::from_utf8_lossy(&line));
        }
        if let Some(sink) = sink.as_deref_mut() {
            sink.flush().await?;
        }
        Ok::<_, Error>(output)
    };

    let (written, output) = futures::join!(write_input, read_output);
    written?;
    let output = output?;

    let status = child
        .status()
        .await
        .map_err(|e| Error::spawn_failed(format!("Failed to wait for `{}`: {}", display, e)))?;

    if status.success() {
        Ok(output)
    } else {
        Err(Error::non_zero_exit(display, status.code(), output))
    }
}

/// Newline-terminated chunks of `reader`, without any encoding check
fn raw_lines<R>(reader: R) -> BoxStream<'static, io::Result<Vec<u8>>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    futures::stream::unfold(reader, |mut reader| async move {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => None,
            Ok(_) => Some((Ok(line), reader)),
            Err(e) => Some((Err(e), reader)),
        }
    })
    .boxed()
}
