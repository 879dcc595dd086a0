use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::Phase;
use crate::config::ArtifactLayout;

/// Mutable state of one pipeline run. Owned by the pipeline alone and
/// discarded once the run ends.
#[derive(Debug, Clone)]
pub struct JobRunState {
    pub id: String,
    pub phase: Phase,
    pub phase_history: Vec<Phase>,
    /// Captured analysis output, appended in grid order.
    pub output: String,
    /// Captured text of the failing stage, if any.
    pub error_log: String,
    pub completed_units: u64,
    /// Fixed when the run is created.
    pub total_units: u64,
    pub started_at: DateTime<Utc>,
}

impl JobRunState {
    pub fn new(total_units: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase: Phase::NotStarted,
            phase_history: Vec::new(),
            output: String::new(),
            error_log: String::new(),
            completed_units: 0,
            total_units,
            started_at: Utc::now(),
        }
    }

    /// Append one invocation's captured text verbatim.
    ///
    /// A trailing newline is added only when the text lacks one, so the
    /// next invocation's first line never joins this one's last line.
    pub fn append_output(&mut self, text: &str) {
        self.output.push_str(text);
        if !text.is_empty() && !text.ends_with('\n') {
            self.output.push('\n');
        }
    }

    pub fn append_error(&mut self, text: &str) {
        self.error_log.push_str(text);
    }

    pub fn complete_unit(&mut self) {
        self.completed_units += 1;
    }

    /// Number of result lines captured so far.
    pub fn output_rows(&self) -> usize {
        self.output.lines().count()
    }
}

/// Summary produced when a run reaches `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub phase_transitions: Vec<Phase>,
    pub total_units: u64,
    pub completed_units: u64,
    pub result_rows: usize,
    pub results_csv: PathBuf,
    pub image: PathBuf,
    pub spreadsheet: PathBuf,
    pub document: PathBuf,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunRecord {
    pub fn from_run(run: &JobRunState, layout: &ArtifactLayout) -> Self {
        let now = Utc::now();
        let duration = now - run.started_at;
        let mut transitions = run.phase_history.clone();
        transitions.push(run.phase);

        Self {
            run_id: run.id.clone(),
            phase_transitions: transitions,
            total_units: run.total_units,
            completed_units: run.completed_units,
            result_rows: run.output_rows(),
            results_csv: layout.results_csv.clone(),
            image: layout.image.clone(),
            spreadsheet: layout.spreadsheet.clone(),
            document: layout.document.clone(),
            started_at: run.started_at,
            completed_at: now,
            duration_ms: duration.num_milliseconds(),
        }
    }
}
