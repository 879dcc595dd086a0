use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Phase;
use crate::stage::StageError;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A fatal condition that ended a pipeline run.
///
/// Every variant carries the phase it happened in so the caller can report
/// where the job stopped. None of them are retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The stage executable could not be started or waited on.
    #[error("{phase}: {source}")]
    StageRun {
        phase: Phase,
        #[source]
        source: StageError,
    },

    /// The stage ran and exited non-zero. Its output is in `error_log`.
    #[error("{phase}: stage exited with code {exit_code}, details in {}", error_log.display())]
    StageExit {
        phase: Phase,
        exit_code: i32,
        error_log: PathBuf,
    },

    /// A fixed-path artifact could not be read, written or removed.
    #[error("{phase}: artifact {}: {source}", path.display())]
    ArtifactIo {
        phase: Phase,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn phase(&self) -> Phase {
        match self {
            PipelineError::StageRun { phase, .. }
            | PipelineError::StageExit { phase, .. }
            | PipelineError::ArtifactIo { phase, .. } => *phase,
        }
    }

    /// Classifies the failure for logs.
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::StageRun {
                source: StageError::Launch { .. },
                ..
            } => FailureKind::Launch,
            PipelineError::StageRun {
                source: StageError::Wait { .. },
                ..
            } => FailureKind::Wait,
            PipelineError::StageExit { .. } => FailureKind::Exit,
            PipelineError::ArtifactIo { .. } => FailureKind::Artifact,
        }
    }
}

/// Coarse failure category, used to keep launch failures apart from
/// non-zero exits in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    Launch,
    Wait,
    Exit,
    Artifact,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Launch => write!(f, "StageLaunchFailure"),
            FailureKind::Wait => write!(f, "StageWaitFailure"),
            FailureKind::Exit => write!(f, "StageExitFailure"),
            FailureKind::Artifact => write!(f, "ArtifactIOFailure"),
        }
    }
}
