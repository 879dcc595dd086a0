use std::fmt;

use serde::{Deserialize, Serialize};

use super::run_state::JobRunState;
use crate::error::FailureKind;

/// The phases of an analysis job.
///
/// A job flows strictly forward:
/// NOT_STARTED → CLEANING → RUNNING_GRID → AGGREGATING → PLOTTING → EXPORTING → DONE,
/// and may drop into FAILED from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NotStarted,
    Cleaning,
    RunningGrid,
    Aggregating,
    Plotting,
    Exporting,
    Done,
    Failed,
}

impl Phase {
    /// The phase entered when this one succeeds. `None` for terminal phases.
    pub fn successor(self) -> Option<Phase> {
        match self {
            Phase::NotStarted => Some(Phase::Cleaning),
            Phase::Cleaning => Some(Phase::RunningGrid),
            Phase::RunningGrid => Some(Phase::Aggregating),
            Phase::Aggregating => Some(Phase::Plotting),
            Phase::Plotting => Some(Phase::Exporting),
            Phase::Exporting => Some(Phase::Done),
            Phase::Done | Phase::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::NotStarted => write!(f, "NOT_STARTED"),
            Phase::Cleaning => write!(f, "CLEANING"),
            Phase::RunningGrid => write!(f, "RUNNING_GRID"),
            Phase::Aggregating => write!(f, "AGGREGATING"),
            Phase::Plotting => write!(f, "PLOTTING"),
            Phase::Exporting => write!(f, "EXPORTING"),
            Phase::Done => write!(f, "DONE"),
            Phase::Failed => write!(f, "FAILED"),
        }
    }
}

/// What happened in the phase being left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Success,
    Failure(FailureKind),
}

/// The result of evaluating a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Advance to the next phase.
    Next(Phase),
    /// The job reached a terminal phase (`Done` or `Failed`).
    Complete(Phase),
}

/// Drives a [`JobRunState`] through the phases.
pub struct StateMachine;

impl StateMachine {
    /// Compute and apply the next transition for the run.
    ///
    /// - Success in a non-terminal phase advances to its successor; reaching
    ///   `Done` completes the job.
    /// - Failure in a non-terminal phase completes the job as `Failed`.
    /// - Terminal phases never move again and always return `Complete`.
    pub fn next(run: &mut JobRunState, outcome: PhaseOutcome) -> Transition {
        let current = run.phase;
        if current.is_terminal() {
            return Transition::Complete(current);
        }

        let target = match outcome {
            PhaseOutcome::Success => current.successor().unwrap_or(Phase::Done),
            PhaseOutcome::Failure(_) => Phase::Failed,
        };

        run.phase_history.push(current);
        run.phase = target;

        if target.is_terminal() {
            Transition::Complete(target)
        } else {
            Transition::Next(target)
        }
    }
}
