#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Child-process plumbing used by the detection adapter.

use std::{
    ffi::{OsStr, OsString},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, BufReader},
    process::{Child, Command},
    time::timeout,
};

/// Failures while running an external program.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that was being started.
        program: String,
        /// Underlying OS error.
        #[source]
        source:  std::io::Error,
    },
    /// Waiting on the child or draining one of its pipes failed.
    #[error("i/o error while {action}: {source}")]
    Io {
        /// What we were doing when the error happened.
        action: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The child did not finish before its deadline and was killed.
    #[error("process timed out after {0:?}")]
    TimedOut(Duration),
}

/// Kills the wrapped child when dropped unless it was disarmed first.
///
/// A timed-out wait future is dropped by `tokio::time::timeout`, which in
/// turn drops this guard, so the detector never outlives its deadline.
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Wraps the provided child process.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Returns the guarded child.
    fn child_mut(&mut self) -> Result<&mut Child, ProcessError> {
        self.0.as_mut().ok_or(ProcessError::Io {
            action: "accessing child process",
            source: std::io::Error::other("child process already released"),
        })
    }

    /// Releases the child without killing it.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Lossy UTF-8 rendering of stderr, trimmed.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Reads a pipe to the end on a separate task.
fn drain<R>(pipe: R, action: &'static str) -> tokio::task::JoinHandle<Result<Vec<u8>, ProcessError>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|source| ProcessError::Io { action, source })?;
        Ok(buf)
    })
}

/// Spawns `program` with `args`, stdin closed, and collects stdout/stderr.
///
/// When `deadline` is set and elapses first, the child is killed and
/// [`ProcessError::TimedOut`] is returned.
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    deadline: Option<Duration>,
) -> Result<Collected, ProcessError> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    let mut guard = ChildDropGuard::new(child);

    let missing_pipe = |action| ProcessError::Io {
        action,
        source: std::io::Error::other("pipe was not captured"),
    };
    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .ok_or_else(|| missing_pipe("reading stdout"))?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .ok_or_else(|| missing_pipe("reading stderr"))?;

    let out_task = drain(stdout, "reading stdout");
    let err_task = drain(stderr, "reading stderr");

    let join_failed = |action, e: tokio::task::JoinError| ProcessError::Io {
        action,
        source: std::io::Error::other(e),
    };

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .map_err(|source| ProcessError::Io {
                action: "waiting on process",
                source,
            })?;
        let stdout = out_task
            .await
            .map_err(|e| join_failed("joining stdout reader", e))??;
        let stderr = err_task
            .await
            .map_err(|e| join_failed("joining stderr reader", e))??;
        guard.disarm();
        Ok(Collected {
            status,
            stdout,
            stderr,
        })
    };

    match deadline {
        Some(limit) => timeout(limit, wait_future)
            .await
            .map_err(|_| ProcessError::TimedOut(limit))?,
        None => wait_future.await,
    }
}
