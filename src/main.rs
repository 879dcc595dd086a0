mod cli;
mod config;
mod error;
mod job;
mod lock;
mod logging;
mod orchestrator;
mod pipeline;
mod progress;
mod results;
mod stage;
mod ui;
mod vocabulary;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::{Style, Term};

use cli::{Cli, Command, RunArgs};
use config::AnalyzerConfig;
use job::JobSpec;
use logging::Verbosity;
use orchestrator::{JobExit, JobOrchestrator};
use progress::{ChannelReporter, LogReporter, NoopReporter, ProgressReporter};
use stage::ProcessStageRunner;
use ui::JobProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let interactive = Term::stderr().is_term();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet, interactive);
    logging::init(verbosity);

    match dispatch(cli, verbosity).await {
        Ok(code) => code,
        Err(e) => {
            let red = Style::new().red().bold();
            eprintln!("  {} {e:#}", red.apply_to("✗"));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli, verbosity: Verbosity) -> Result<ExitCode> {
    let config = AnalyzerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => run(args, config, verbosity).await,
        Command::Status => {
            let running = lock::is_locked_elsewhere(&config.artifacts.lock_file);
            ui::print_status(running, &config.artifacts);
            Ok(ExitCode::SUCCESS)
        }
        Command::Vocab => {
            ui::print_vocabulary();
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(args: RunArgs, config: AnalyzerConfig, verbosity: Verbosity) -> Result<ExitCode> {
    let from_file = match &args.file {
        Some(path) => JobSpec::from_file(path)
            .with_context(|| format!("reading job file {}", path.display()))?,
        None => JobSpec::default(),
    };
    let job = from_file.merge(args.to_spec()).build()?;
    let error_log = config.artifacts.error_log.clone();

    // Installed before the lock is taken so a stop request never skips the unwind.
    let shutdown = orchestrator::shutdown_signal();
    let jobs = JobOrchestrator::new(config);
    let Some(lock) = jobs.try_lock() else {
        ui::print_already_running(jobs.lock_file());
        return Ok(ExitCode::FAILURE);
    };

    let bar = match verbosity {
        Verbosity::Normal => Some(Arc::new(JobProgress::start(job.input_file()))),
        _ => None,
    };
    let mut drain = None;
    let reporter: Arc<dyn ProgressReporter> = match &bar {
        Some(bar) => {
            let (reporter, mut updates) = ChannelReporter::new();
            let bar = bar.clone();
            drain = Some(tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    bar.report(update.completed, update.total);
                }
            }));
            Arc::new(reporter)
        }
        None if verbosity == Verbosity::Quiet => Arc::new(NoopReporter),
        None => Arc::new(LogReporter),
    };

    let exit = jobs
        .run_job(lock, job, ProcessStageRunner, reporter, shutdown)
        .await;

    // The pipeline owned the sender, so the drain ends once it is gone.
    if let Some(drain) = drain {
        let _ = drain.await;
    }
    if let Some(bar) = &bar {
        bar.finish();
    }
    let exit = exit?;

    match &exit {
        JobExit::Done(record) => {
            if verbosity != Verbosity::Quiet {
                ui::print_completed(record);
            }
            if args.json {
                ui::print_record(record);
            }
        }
        JobExit::Failed(err) => ui::print_failed(err, &error_log),
        JobExit::Interrupted => ui::print_interrupted(),
    }

    Ok(ExitCode::from(exit.exit_code()))
}
