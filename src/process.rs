//! Scoped launching of the external tool.
//!
//! Every run owns its child process for its whole lifetime: output is
//! drained while waiting, the wait races the caller's cancellation token,
//! and the process tree is killed on every early exit. `kill_on_drop`
//! covers the paths where the future itself is dropped.

use crate::args::ToolArgs;
use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Program plus argument list for one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: ToolArgs,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, args: ToolArgs) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn spawn(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.tokens())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // own process group so the converter children die with the tool
        #[cfg(unix)]
        cmd.process_group(0);

        debug!(program = %self.program.display(), args = %self.args, "Spawning tool");

        cmd.spawn().map_err(|source| AppError::ProbeLaunch {
            program: self.program.clone(),
            source,
        })
    }
}

/// Full output of a process that ran to completion.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// How a streamed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exited(ExitStatus),
    Cancelled,
}

/// Runs `cmd` to completion and collects both output streams.
///
/// # Returns
/// * `Ok(Some(output))` - the process exited on its own
/// * `Ok(None)` - `cancel` fired first; the process tree was killed
///
/// # Errors
/// * `AppError::ProbeLaunch` if the program cannot be started
pub async fn run_captured(
    cmd: &ToolCommand,
    cancel: &CancellationToken,
) -> Result<Option<CapturedOutput>> {
    let mut stdout = String::new();
    let mut stderr = String::new();

    let outcome = run_streaming(
        cmd,
        cancel,
        |line| {
            stdout.push_str(&line);
            stdout.push('\n');
        },
        |line| {
            stderr.push_str(&line);
            stderr.push('\n');
        },
    )
    .await?;

    Ok(match outcome {
        RunOutcome::Exited(status) => Some(CapturedOutput {
            status,
            stdout,
            stderr,
        }),
        RunOutcome::Cancelled => None,
    })
}

/// Runs `cmd`, handing every output line to the matching callback as it
/// arrives.
///
/// Cancellation is observed immediately, including while the process is
/// still producing output.
pub async fn run_streaming<O, E>(
    cmd: &ToolCommand,
    cancel: &CancellationToken,
    mut on_stdout: O,
    mut on_stderr: E,
) -> Result<RunOutcome>
where
    O: FnMut(String),
    E: FnMut(String),
{
    let mut child = cmd.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::ProcessIo("stdout was not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::ProcessIo("stderr was not captured".into()))?;

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut out_open = true;
    let mut err_open = true;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                kill_tree(&mut child).await;
                return Ok(RunOutcome::Cancelled);
            }

            line = out_lines.next_line(), if out_open => match line {
                Ok(Some(line)) => on_stdout(line),
                Ok(None) => out_open = false,
                Err(e) => {
                    kill_tree(&mut child).await;
                    return Err(AppError::ProcessIo(format!("reading stdout: {}", e)));
                }
            },

            line = err_lines.next_line(), if err_open => match line {
                Ok(Some(line)) => on_stderr(line),
                Ok(None) => err_open = false,
                Err(e) => {
                    kill_tree(&mut child).await;
                    return Err(AppError::ProcessIo(format!("reading stderr: {}", e)));
                }
            },

            status = child.wait(), if !out_open && !err_open => {
                let status = status?;
                debug!(%status, "Tool exited");
                return Ok(RunOutcome::Exited(status));
            }
        }
    }
}

/// Kills `child` and everything it spawned, then reaps it.
pub async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        if let Err(e) = signal::killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            if e != nix::errno::Errno::ESRCH {
                warn!(pid, error = %e, "Failed to signal process group");
            }
        }
    }

    if let Err(e) = child.kill().await {
        debug!(error = %e, "Child already gone");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("/bin/sh", ToolArgs::new().option("-c", script))
    }

    #[tokio::test]
    async fn captures_both_streams() {
        let cmd = sh("echo out1; echo err1 >&2; echo out2");
        let output = run_captured(&cmd, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "out1\nout2\n");
        assert_eq!(output.stderr, "err1\n");
    }

    #[tokio::test]
    async fn missing_program_is_launch_error() {
        let cmd = ToolCommand::new("/no/such/tool", ToolArgs::new());
        let err = run_captured(&cmd, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AppError::ProbeLaunch { .. }));
    }

    #[tokio::test]
    async fn cancellation_kills_promptly() {
        let cmd = sh("sleep 30");
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = run_captured(&cmd, &token).await.unwrap();
        assert!(result.is_none());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn streams_lines_in_order() {
        let cmd = sh("for i in 1 2 3; do echo line$i; done; exit 3");
        let mut lines = Vec::new();
        let outcome = run_streaming(&cmd, &CancellationToken::new(), |l| lines.push(l), |_| {})
            .await
            .unwrap();
        assert_eq!(lines, vec!["line1", "line2", "line3"]);
        match outcome {
            RunOutcome::Exited(status) => assert_eq!(status.code(), Some(3)),
            RunOutcome::Cancelled => panic!("not cancelled"),
        }
    }
}
