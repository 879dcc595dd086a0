//! The analysis job pipeline.
//!
//! [`JobPipeline::run`] drives one job through
//! cleaning → analysis grid → aggregation → plotting → export, one stage at a
//! time. Any failure removes the cleaned-data artifact, overwrites the error
//! log with the failing stage's output and ends the run in `Failed`. Whether
//! that ends the process is the caller's decision.

mod run_state;
mod state;

pub use run_state::{JobRunState, RunRecord};
pub use state::{Phase, PhaseOutcome, StateMachine, Transition};

use std::io;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::{AnalyzerConfig, ArtifactLayout, StageScripts};
use crate::error::PipelineError;
use crate::job::JobConfig;
use crate::progress::ProgressReporter;
use crate::results::write_results;
use crate::stage::{StageInvocation, StageOutcome, StageRunner};

/// Runs analysis jobs with an injected stage runner and progress sink.
pub struct JobPipeline<R, P> {
    interpreter: String,
    scripts: StageScripts,
    layout: ArtifactLayout,
    runner: R,
    reporter: P,
}

impl<R: StageRunner, P: ProgressReporter> JobPipeline<R, P> {
    pub fn new(config: &AnalyzerConfig, runner: R, reporter: P) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            scripts: config.scripts.clone(),
            layout: config.artifacts.clone(),
            runner,
            reporter,
        }
    }

    /// Run the whole job. Returns the run record on `Done`.
    pub async fn run(&self, job: &JobConfig) -> Result<RunRecord, PipelineError> {
        let mut run = JobRunState::new(job.total_units());
        info!(
            run_id = %run.id,
            input = %job.input_file().display(),
            total_units = run.total_units,
            "starting analysis job"
        );

        match self.drive(job, &mut run).await {
            Ok(()) => {
                let record = RunRecord::from_run(&run, &self.layout);
                info!(
                    run_id = %record.run_id,
                    rows = record.result_rows,
                    duration_ms = record.duration_ms,
                    "analysis job done"
                );
                Ok(record)
            }
            Err(err) => {
                self.fail(&mut run, &err);
                Err(err)
            }
        }
    }

    async fn drive(&self, job: &JobConfig, run: &mut JobRunState) -> Result<(), PipelineError> {
        self.advance(run);

        // CLEANING
        let cleaning = self
            .stage(&self.scripts.cleaning)
            .arg(job.input_file().to_string_lossy())
            .arg(job.joined_cleaning());
        self.run_stage(run, cleaning).await?;
        self.advance(run);

        // RUNNING_GRID
        let header = job.csv_header();
        self.run_grid(job, run).await?;
        remove_if_present(&self.layout.cleaned_data).map_err(|source| {
            PipelineError::ArtifactIo {
                phase: run.phase,
                path: self.layout.cleaned_data.clone(),
                source,
            }
        })?;
        self.advance(run);

        // AGGREGATING
        let mut csv = String::with_capacity(header.len() + 1 + run.output.len());
        csv.push_str(&header);
        csv.push('\n');
        csv.push_str(&run.output);
        write_results(&csv, &self.layout.results_csv).map_err(|source| {
            PipelineError::ArtifactIo {
                phase: run.phase,
                path: self.layout.results_csv.clone(),
                source,
            }
        })?;
        info!(
            path = %self.layout.results_csv.display(),
            rows = run.output_rows(),
            "results written"
        );
        self.advance(run);

        // PLOTTING
        let plot = self.stage(&self.scripts.plot);
        self.run_stage(run, plot).await?;
        self.advance(run);

        // EXPORTING
        let export = self.stage(&self.scripts.export);
        self.run_stage(run, export).await?;
        self.advance(run);

        Ok(())
    }

    async fn run_grid(&self, job: &JobConfig, run: &mut JobRunState) -> Result<(), PipelineError> {
        let metrics = job.joined_metrics();
        for unit in job.grid() {
            // Reported before the unit runs: `completed` counts finished units.
            self.reporter.report(run.completed_units, run.total_units);

            let invocation = self
                .stage(&self.scripts.analysis)
                .args([
                    unit.technique.as_str(),
                    unit.model.as_str(),
                    job.optimization().as_str(),
                    job.cross_validation().as_str(),
                    metrics.as_str(),
                ]);
            debug!(
                technique = %unit.technique,
                model = %unit.model,
                iteration = unit.iteration,
                "running grid unit"
            );

            let outcome = self.run_stage(run, invocation).await?;
            run.append_output(&outcome.captured_text);
            run.complete_unit();
        }
        Ok(())
    }

    /// Run one stage in the current phase. A non-zero exit records the
    /// captured text as the error log and becomes `StageExit`.
    async fn run_stage(
        &self,
        run: &mut JobRunState,
        invocation: StageInvocation,
    ) -> Result<StageOutcome, PipelineError> {
        let phase = run.phase;
        let outcome = match self.runner.run(&invocation).await {
            Ok(outcome) => outcome,
            Err(source) => {
                run.append_error(&format!("{source}\n"));
                return Err(PipelineError::StageRun { phase, source });
            }
        };

        if !outcome.success() {
            run.append_error(&outcome.captured_text);
            return Err(PipelineError::StageExit {
                phase,
                exit_code: outcome.exit_code,
                error_log: self.layout.error_log.clone(),
            });
        }
        Ok(outcome)
    }

    fn stage(&self, script: &Path) -> StageInvocation {
        StageInvocation::new(&self.interpreter).arg(script.to_string_lossy())
    }

    fn advance(&self, run: &mut JobRunState) {
        let from = run.phase;
        let transition = StateMachine::next(run, PhaseOutcome::Success);
        info!(from = %from, to = %run.phase, "phase transition");
        debug_assert!(!matches!(transition, Transition::Complete(Phase::Failed)));
    }

    /// The failure unwind: drop the cleaned data, persist the error log,
    /// then mark the run failed.
    fn fail(&self, run: &mut JobRunState, err: &PipelineError) {
        if let Err(e) = remove_if_present(&self.layout.cleaned_data) {
            warn!(
                path = %self.layout.cleaned_data.display(),
                error = %e,
                "failed to remove cleaned data"
            );
        }

        if run.error_log.is_empty() {
            run.append_error(&format!("{err}\n"));
        }
        if let Err(e) = write_results(&run.error_log, &self.layout.error_log) {
            warn!(path = %self.layout.error_log.display(), error = %e, "failed to write error log");
        }

        let from = run.phase;
        StateMachine::next(run, PhaseOutcome::Failure(err.kind()));
        error!(
            run_id = %run.id,
            phase = %from,
            kind = %err.kind(),
            error = %err,
            "analysis job failed"
        );
    }
}

/// Remove the cleaned-data artifact. Missing is fine; callers may run this
/// more than once for the same run.
pub fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed artifact");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
