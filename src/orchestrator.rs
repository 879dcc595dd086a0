use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::error::PipelineError;
use crate::job::JobConfig;
use crate::lock::InstanceLock;
use crate::pipeline::{JobPipeline, RunRecord, remove_if_present};
use crate::progress::ProgressReporter;
use crate::stage::StageRunner;

/// How a job ended, from the process's point of view.
#[derive(Debug)]
pub enum JobExit {
    /// The pipeline reached `Done`.
    Done(RunRecord),
    /// The pipeline failed; its error log has been written.
    Failed(PipelineError),
    /// A shutdown request arrived while the job was running.
    Interrupted,
}

impl JobExit {
    pub fn exit_code(&self) -> u8 {
        match self {
            JobExit::Done(_) => 0,
            JobExit::Failed(_) => 1,
            JobExit::Interrupted => 130,
        }
    }
}

/// Gates a job behind the instance lock and runs it on a dedicated worker
/// task, so blocking on stages never stalls the caller.
pub struct JobOrchestrator {
    config: AnalyzerConfig,
}

impl JobOrchestrator {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn lock_file(&self) -> &Path {
        &self.config.artifacts.lock_file
    }

    /// Take the instance lock, or `None` if another instance holds it.
    /// Nothing else is touched when it is refused.
    pub fn try_lock(&self) -> Option<InstanceLock> {
        let mut lock = InstanceLock::new(&self.config.artifacts.lock_file);
        lock.acquire().then_some(lock)
    }

    /// Run one job to completion, failure or shutdown under a held lock.
    ///
    /// Every exit path releases the lock. On shutdown the worker is aborted
    /// (killing any running stage) and the cleaned-data artifact is removed
    /// after the lock is released.
    pub async fn run_job<R, P, S>(
        &self,
        mut lock: InstanceLock,
        job: JobConfig,
        runner: R,
        reporter: P,
        shutdown: S,
    ) -> Result<JobExit>
    where
        R: StageRunner + 'static,
        P: ProgressReporter + 'static,
        S: Future<Output = ()>,
    {
        let layout = &self.config.artifacts;
        let pipeline = JobPipeline::new(&self.config, runner, reporter);
        let mut worker = tokio::spawn(async move { pipeline.run(&job).await });

        let exit = tokio::select! {
            joined = &mut worker => {
                let result = joined.context("analysis worker panicked");
                match result {
                    Ok(Ok(record)) => JobExit::Done(record),
                    Ok(Err(err)) => JobExit::Failed(err),
                    Err(err) => {
                        lock.release();
                        remove_cleaned_data(&layout.cleaned_data);
                        return Err(err);
                    }
                }
            }
            () = shutdown => {
                warn!("shutdown requested, stopping analysis job");
                worker.abort();
                let _ = worker.await;
                JobExit::Interrupted
            }
        };

        lock.release();
        if matches!(exit, JobExit::Interrupted) {
            remove_cleaned_data(&layout.cleaned_data);
        }

        info!(exit_code = exit.exit_code(), "analysis job finished");
        Ok(exit)
    }
}

fn remove_cleaned_data(path: &Path) {
    if let Err(e) = remove_if_present(path) {
        warn!(path = %path.display(), error = %e, "failed to remove cleaned data");
    }
}

/// Resolves when the process is asked to stop: Ctrl-C, and on unix also
/// SIGTERM or SIGHUP.
///
/// On unix the handlers are installed when this is called, so a signal that
/// arrives before the future is first polled is not lost. A handler that
/// cannot be installed is logged and skipped.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    let mut signals = StopSignals::install();
    async move { signals.recv().await }
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
struct StopSignals {
    interrupt: Option<tokio::signal::unix::Signal>,
    terminate: Option<tokio::signal::unix::Signal>,
    hangup: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl StopSignals {
    fn install() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let install = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(signal = name, error = %e, "cannot listen for signal");
                None
            }
        };
        Self {
            interrupt: install(SignalKind::interrupt(), "SIGINT"),
            terminate: install(SignalKind::terminate(), "SIGTERM"),
            hangup: install(SignalKind::hangup(), "SIGHUP"),
        }
    }

    async fn recv(&mut self) {
        tokio::select! {
            () = next_signal(&mut self.interrupt) => info!("received SIGINT"),
            () = next_signal(&mut self.terminate) => info!("received SIGTERM"),
            () = next_signal(&mut self.hangup) => info!("received SIGHUP"),
        }
    }
}

// Never resolves for a missing or closed stream.
#[cfg(unix)]
async fn next_signal(stream: &mut Option<tokio::signal::unix::Signal>) {
    if let Some(stream) = stream {
        if stream.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await
}
