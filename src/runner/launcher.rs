use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::invocation::Invocation;
use super::sink::OutputSink;
use crate::error::{CiLocalError, Result};
use crate::status::StatusTracker;

/// How a run of the external runner ended.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub invocation: Invocation,
    /// `None` when the process was killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// Launches `gitlab-ci-local` and streams its output to a sink.
///
/// Single-job runs are reported to the shared [`StatusTracker`]: the job is
/// marked running before the process is spawned and gets exactly one result
/// when it ends, whether it exited, was signalled, timed out or never started.
pub struct JobLauncher {
    executable: PathBuf,
    tracker: Arc<StatusTracker>,
    timeout: Option<Duration>,
}

impl JobLauncher {
    pub fn new(executable: PathBuf, tracker: Arc<StatusTracker>) -> Self {
        Self {
            executable,
            tracker,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs `invocation` from `cwd`, writing output to `sink`.
    ///
    /// A non-zero exit is not an error: it is reported through
    /// [`RunOutcome::success`].
    ///
    /// # Errors
    ///
    /// Returns `CiLocalError::Spawn` if the executable cannot be started, or
    /// an I/O error if waiting on the child fails.
    pub async fn launch(
        &self,
        invocation: &Invocation,
        cwd: &Path,
        sink: &dyn OutputSink,
    ) -> Result<RunOutcome> {
        emit(sink, &format!("Running command: {invocation}\n\n"));

        if let Some(name) = invocation.job_name() {
            self.tracker.set_running(name);
        }

        let result = self.run_child(invocation, cwd, sink).await;

        if let Some(name) = invocation.job_name() {
            let success = result.as_ref().is_ok_and(|outcome| outcome.success);
            if let Err(e) = self.tracker.set_result(name, success) {
                warn!("Could not record result for {name}: {e}");
            }
        }

        result
    }

    async fn run_child(
        &self,
        invocation: &Invocation,
        cwd: &Path,
        sink: &dyn OutputSink,
    ) -> Result<RunOutcome> {
        let started = Instant::now();
        let args = invocation.args();
        debug!("Spawning {} {:?} in {}", self.executable.display(), args, cwd.display());

        let spawned = Command::new(&self.executable)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                let error = CiLocalError::Spawn {
                    executable: self.executable.display().to_string(),
                    source,
                };
                emit(sink, &format!("{error}\n"));
                return Err(error);
            }
        };

        info!("Launched {invocation} (pid {:?})", child.id());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let streaming = async {
            let (out, err) = tokio::join!(pump(stdout, sink), pump(stderr, sink));
            for result in [out, err] {
                if let Err(e) = result {
                    warn!("Error reading runner output: {e}");
                }
            }
            child.wait().await
        };

        let waited: Option<std::io::Result<ExitStatus>> = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, streaming).await.ok(),
            None => Some(streaming.await),
        };

        let (exit_code, timed_out, trailer) = match waited {
            Some(status) => {
                let status = status?;
                match status.code() {
                    Some(code) => (
                        Some(code),
                        false,
                        format!("\nCommand finished with exit code {code}.\n"),
                    ),
                    None => (None, false, "\nCommand terminated by signal.\n".to_string()),
                }
            }
            None => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out runner: {e}");
                }
                let secs = self.timeout.map_or(0, |limit| limit.as_secs());
                (None, true, format!("\n{}.\n", CiLocalError::Timeout(secs)))
            }
        };

        emit(sink, &trailer);

        let success = exit_code == Some(0);
        info!("{invocation} finished: exit code {exit_code:?}, success {success}");

        Ok(RunOutcome {
            invocation: invocation.clone(),
            exit_code,
            success,
            timed_out,
            elapsed: started.elapsed(),
        })
    }
}

fn emit(sink: &dyn OutputSink, text: &str) {
    sink.write(&sink.line_ending().translate(text));
}

// Forwards a child stream to the sink one line at a time. Bytes that are not
// valid UTF-8 are replaced rather than ending the stream.
async fn pump<R>(reader: Option<R>, sink: &dyn OutputSink) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(());
    };

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        emit(sink, &String::from_utf8_lossy(&line));
    }
}
