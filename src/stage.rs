//! Running one external stage executable to completion.

use std::fmt;
use std::future::Future;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// A command line for one stage run. Built right before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    program: String,
    args: Vec<String>,
}

impl StageInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for StageInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Exit code plus everything the stage wrote to stdout and stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub exit_code: i32,
    pub captured_text: String,
}

impl StageOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The stage never produced an outcome.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Executes stage invocations. The pipeline only sees this trait, so tests
/// can script outcomes without spawning processes.
pub trait StageRunner: Send + Sync {
    /// Run the invocation to completion. A non-zero exit is an `Ok` outcome;
    /// only a stage that could not be run at all is an `Err`.
    fn run(
        &self,
        invocation: &StageInvocation,
    ) -> impl Future<Output = Result<StageOutcome, StageError>> + Send;
}

/// Runs stages as child processes.
///
/// Children are spawned with `kill_on_drop`, so abandoning a run (for
/// example on Ctrl-C) never leaves an orphan behind.
#[derive(Debug, Clone, Default)]
pub struct ProcessStageRunner;

impl StageRunner for ProcessStageRunner {
    async fn run(&self, invocation: &StageInvocation) -> Result<StageOutcome, StageError> {
        debug!(command = %invocation, "spawning stage");

        let mut child = Command::new(invocation.program())
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| StageError::Launch {
                program: invocation.program().to_string(),
                source,
            })?;

        let mut captured = String::new();
        if let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) {
            captured = capture_merged(stdout, stderr).await;
        }

        let status = child.wait().await.map_err(|source| StageError::Wait {
            program: invocation.program().to_string(),
            source,
        })?;

        // Killed by a signal: no code, report as failure.
        let exit_code = status.code().unwrap_or(-1);
        debug!(command = %invocation, exit_code, bytes = captured.len(), "stage exited");

        Ok(StageOutcome {
            exit_code,
            captured_text: captured,
        })
    }
}

/// Read both streams until they close, interleaving whole lines in the order
/// they arrive.
async fn capture_merged<O, E>(stdout: O, stderr: E) -> String
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = BufReader::new(stdout);
    let mut err = BufReader::new(stderr);
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut out_open = true;
    let mut err_open = true;
    let mut captured = String::new();

    while out_open || err_open {
        tokio::select! {
            read = out.read_until(b'\n', &mut out_buf), if out_open => {
                out_open = take_line(read, &mut out_buf, &mut captured);
            }
            read = err.read_until(b'\n', &mut err_buf), if err_open => {
                err_open = take_line(read, &mut err_buf, &mut captured);
            }
        }
    }

    captured
}

// Returns whether the stream is still open.
fn take_line(read: std::io::Result<usize>, buf: &mut Vec<u8>, captured: &mut String) -> bool {
    match read {
        Ok(0) => false,
        Ok(_) => {
            captured.push_str(&String::from_utf8_lossy(buf));
            buf.clear();
            true
        }
        Err(e) => {
            debug!(error = %e, "stage output stream closed with error");
            false
        }
    }
}
