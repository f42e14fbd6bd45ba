//! External process execution using [`tokio::process::Command`].
//!
//! Two shapes are needed: long-running tools whose output is streamed into
//! the [`Log`] while they run ([`run_streaming`]), and short probes whose
//! output is captured under a bounded wait ([`capture`]).

use crate::error::{Error, Result};
use crate::log::Log;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

/// One external command invocation: program name resolved on PATH plus
/// its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub program: String,
    pub args: Vec<String>,
}

impl Step {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", args)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a streamed step ended once it was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Success,
    Exit { code: i32, stderr: String },
    /// Terminated without an exit code (killed by a signal).
    Abnormal { stderr: String },
}

impl Completion {
    fn from_status(status: ExitStatus, stderr: Vec<u8>) -> Self {
        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        match status.code() {
            Some(0) => Completion::Success,
            Some(code) => Completion::Exit { code, stderr },
            None => Completion::Abnormal { stderr },
        }
    }
}

/// Captured result of a short probe command.
#[derive(Debug, Clone)]
pub struct Captured {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

fn spawn_error(program: &str, source: std::io::Error) -> Error {
    if source.kind() == ErrorKind::NotFound {
        Error::ToolNotFound {
            program: program.to_string(),
        }
    } else {
        Error::Spawn {
            program: program.to_string(),
            source,
        }
    }
}

/// Run `step` in `workdir`, forwarding stdout and stderr to `log` chunk by
/// chunk as the tool flushes them. Stderr is also captured for the result.
///
/// Returns `Err` only when the tool could not be started at all.
pub async fn run_streaming(workdir: &Path, step: &Step, log: &Log) -> Result<Completion> {
    debug!(command = %step, workdir = %workdir.display(), "spawning");

    // A missing cwd also fails the spawn with NotFound.
    if !workdir.is_dir() {
        return Err(Error::WorkdirMissing {
            path: workdir.to_path_buf(),
        });
    }

    let mut child = Command::new(&step.program)
        .args(&step.args)
        .current_dir(workdir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(&step.program, e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (out_res, err_res) = tokio::join!(
        forward(stdout, |chunk| log.output(chunk)),
        forward(stderr, |chunk| log.stderr(chunk)),
    );
    let status = child.wait().await?;
    out_res?;
    let captured = err_res?;

    debug!(command = %step, status = %status, "finished");
    Ok(Completion::from_status(status, captured))
}

/// Drain `reader`, handing every chunk to `emit`, and return everything read.
async fn forward<R, F>(reader: Option<R>, emit: F) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    F: Fn(&[u8]),
{
    let mut all = Vec::new();
    let Some(mut reader) = reader else {
        return Ok(all);
    };

    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        emit(&buf[..n]);
        all.extend_from_slice(&buf[..n]);
    }
    Ok(all)
}

/// Run a short command to completion and capture its output, waiting at
/// most `timeout`. The child is killed if the wait expires.
pub async fn capture(program: &str, args: &[&str], timeout: Duration) -> Result<Captured> {
    debug!(program, ?args, "capturing");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout {
            program: program.to_string(),
            timeout,
        })??;

    Ok(Captured {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
