//! External-process generator execution.
//!
//! Spawns the entry point as a subprocess with both output streams piped and
//! drained concurrently, so a chatty generator can never fill a pipe and
//! stall. The captured output is buffered for failure diagnostics rather
//! than streamed to the user.

use crate::harness::error::{Error, Result};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// Exit status plus buffered diagnostic output of a finished subprocess.
pub(crate) struct CapturedExit {
    pub status: ExitStatus,
    /// Captured stdout lines followed by stderr lines
    pub output: String,
}

/// Runs `program` with `args`, capturing merged output.
///
/// A nonzero exit is not an error here - the caller turns it into the same
/// failure shape an in-process run produces. Spawn failures and expired
/// timeouts are errors.
pub(crate) async fn run(
    program: &Path,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CapturedExit> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            Error::GenericError(format!("failed to spawn {}: {e}", program.display()))
        })?;

    match timeout {
        Some(limit) => match tokio::time::timeout(limit, drain_and_wait(&mut child)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                log::warn!(
                    "{} did not finish within {}s, terminating",
                    program.display(),
                    limit.as_secs()
                );
                if let Err(e) = child.kill().await {
                    log::warn!("failed to kill {}: {e}", program.display());
                }
                let _ = tokio::time::timeout(Duration::from_secs(10), child.wait()).await;
                Err(Error::GenericError(format!(
                    "{} timed out after {}s",
                    program.display(),
                    limit.as_secs()
                )))
            }
        },
        None => drain_and_wait(&mut child).await,
    }
}

/// Drains stdout and stderr concurrently, then waits for the exit status.
async fn drain_and_wait(child: &mut Child) -> Result<CapturedExit> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, stdout_lines, stderr_lines) =
        tokio::join!(child.wait(), drain(stdout), drain(stderr));
    let status = status?;

    let mut lines = stdout_lines;
    lines.extend(stderr_lines);

    Ok(CapturedExit {
        status,
        output: lines.join("\n"),
    })
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> Vec<String> {
    let mut collected = Vec::new();
    if let Some(stream) = stream {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            collected.push(line);
        }
    }
    collected
}
