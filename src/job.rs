//! Job configuration: what to clean, which grid to run and how.
//!
//! [`JobSpec`] holds raw selections as they arrive from a job file or the
//! command line. [`JobSpec::build`] validates them and applies the sentinel
//! defaults, producing an immutable [`JobConfig`].

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::vocabulary::{
    CleaningOperation, CrossValidationMode, Metric, Model, OptimizationMode, Technique,
};

pub const DEFAULT_ITERATIONS: u32 = 10;
pub const MAX_ITERATIONS: u32 = 999;

/// Unvalidated job selections. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSpec {
    pub input: Option<PathBuf>,
    pub cleaning: Vec<CleaningOperation>,
    pub techniques: Vec<Technique>,
    pub models: Vec<Model>,
    pub metrics: Vec<Metric>,
    pub optimization: Option<OptimizationMode>,
    pub cross_validation: Option<CrossValidationMode>,
    pub iterations: Option<u32>,
}

impl JobSpec {
    /// Read a job file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, AnalyzerError> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(toml::from_str(&contents)?)
        }
    }

    /// Overlay `other` on top of `self`. Non-empty selections and set
    /// values in `other` win.
    pub fn merge(mut self, other: JobSpec) -> JobSpec {
        if other.input.is_some() {
            self.input = other.input;
        }
        if !other.cleaning.is_empty() {
            self.cleaning = other.cleaning;
        }
        if !other.techniques.is_empty() {
            self.techniques = other.techniques;
        }
        if !other.models.is_empty() {
            self.models = other.models;
        }
        if !other.metrics.is_empty() {
            self.metrics = other.metrics;
        }
        if other.optimization.is_some() {
            self.optimization = other.optimization;
        }
        if other.cross_validation.is_some() {
            self.cross_validation = other.cross_validation;
        }
        if other.iterations.is_some() {
            self.iterations = other.iterations;
        }
        self
    }

    /// Validate and freeze the selections.
    ///
    /// Empty technique/model/metric lists fall back to their sentinel. The
    /// input file must exist and be readable.
    pub fn build(self) -> Result<JobConfig, AnalyzerError> {
        let iterations = self.iterations.unwrap_or(DEFAULT_ITERATIONS);
        if iterations > MAX_ITERATIONS {
            return Err(AnalyzerError::InvalidJob(format!(
                "iterations must be between 0 and {MAX_ITERATIONS}, got {iterations}"
            )));
        }

        let input = self
            .input
            .ok_or_else(|| AnalyzerError::InvalidJob("no input file given".into()))?;
        let input_file = readable_file(&input)?;

        Ok(JobConfig {
            cleaning: dedup(self.cleaning),
            techniques: or_sentinel(dedup(self.techniques), Technique::SENTINEL),
            models: or_sentinel(dedup(self.models), Model::SENTINEL),
            metrics: or_sentinel(dedup(self.metrics), Metric::SENTINEL),
            optimization: self.optimization.unwrap_or_default(),
            cross_validation: self.cross_validation.unwrap_or_default(),
            iterations,
            input_file,
        })
    }
}

fn readable_file(path: &Path) -> Result<PathBuf, AnalyzerError> {
    if !path.is_file() {
        return Err(AnalyzerError::InvalidJob(format!(
            "input file {} does not exist",
            path.display()
        )));
    }
    File::open(path).map_err(|e| {
        AnalyzerError::InvalidJob(format!("input file {} is not readable: {e}", path.display()))
    })?;
    Ok(std::path::absolute(path)?)
}

// Keeps first occurrence; selection order is significant.
fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn or_sentinel<T>(items: Vec<T>, sentinel: T) -> Vec<T> {
    if items.is_empty() { vec![sentinel] } else { items }
}

/// A validated, immutable job. Selection lists are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobConfig {
    cleaning: Vec<CleaningOperation>,
    techniques: Vec<Technique>,
    models: Vec<Model>,
    metrics: Vec<Metric>,
    optimization: OptimizationMode,
    cross_validation: CrossValidationMode,
    iterations: u32,
    input_file: PathBuf,
}

/// One cell of the analysis grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridUnit {
    pub technique: Technique,
    pub model: Model,
    pub iteration: u32,
}

impl JobConfig {
    pub fn cleaning(&self) -> &[CleaningOperation] {
        &self.cleaning
    }

    pub fn techniques(&self) -> &[Technique] {
        &self.techniques
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn optimization(&self) -> OptimizationMode {
        self.optimization
    }

    pub fn cross_validation(&self) -> CrossValidationMode {
        self.cross_validation
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn input_file(&self) -> &Path {
        &self.input_file
    }

    /// `techniques × models × iterations`.
    pub fn total_units(&self) -> u64 {
        self.techniques.len() as u64 * self.models.len() as u64 * u64::from(self.iterations)
    }

    /// Cleaning operations as the cleaning stage expects them: `", "`-joined.
    pub fn joined_cleaning(&self) -> String {
        self.cleaning
            .iter()
            .map(CleaningOperation::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Metric names joined with `","`.
    pub fn joined_metrics(&self) -> String {
        self.metrics
            .iter()
            .map(Metric::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Header row of the results CSV.
    pub fn csv_header(&self) -> String {
        format!("technique,model,{}", self.joined_metrics())
    }

    /// Grid cells in execution order: technique, then model, then iteration.
    pub fn grid(&self) -> impl Iterator<Item = GridUnit> + '_ {
        self.techniques.iter().flat_map(move |&technique| {
            self.models.iter().flat_map(move |&model| {
                (0..self.iterations).map(move |iteration| GridUnit {
                    technique,
                    model,
                    iteration,
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn input_file(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        path
    }

    fn spec(tmp: &TempDir) -> JobSpec {
        JobSpec {
            input: Some(input_file(tmp)),
            ..Default::default()
        }
    }

    #[test]
    fn empty_selections_use_sentinels() {
        let tmp = TempDir::new().unwrap();
        let job = spec(&tmp).build().unwrap();

        assert_eq!(job.techniques(), &[Technique::NoTechnique]);
        assert_eq!(job.models(), &[Model::NaiveBayes]);
        assert_eq!(job.metrics(), &[Metric::F1Score]);
        assert_eq!(job.iterations(), DEFAULT_ITERATIONS);
        assert_eq!(job.optimization(), OptimizationMode::None);
        assert_eq!(job.cross_validation(), CrossValidationMode::HoldOut);
        assert_eq!(job.csv_header(), "technique,model,F1-Score");
        assert_eq!(job.total_units(), u64::from(DEFAULT_ITERATIONS));
        assert!(job.cleaning().is_empty());
        assert_eq!(job.joined_cleaning(), "");
    }

    #[test]
    fn total_units_is_product_of_grid_axes() {
        let tmp = TempDir::new().unwrap();
        let job = JobSpec {
            techniques: vec![Technique::Pca, Technique::Ica, Technique::Lda],
            models: vec![Model::Svm, Model::Knn],
            iterations: Some(7),
            ..spec(&tmp)
        }
        .build()
        .unwrap();

        assert_eq!(job.total_units(), 42);
        assert_eq!(job.grid().count(), 42);
    }

    #[test]
    fn grid_order_is_technique_then_model_then_iteration() {
        let tmp = TempDir::new().unwrap();
        let job = JobSpec {
            techniques: vec![Technique::Pca, Technique::Ica],
            models: vec![Model::Svm, Model::Knn],
            iterations: Some(2),
            ..spec(&tmp)
        }
        .build()
        .unwrap();

        let order: Vec<_> = job
            .grid()
            .map(|u| (u.technique, u.model, u.iteration))
            .collect();
        assert_eq!(
            order,
            vec![
                (Technique::Pca, Model::Svm, 0),
                (Technique::Pca, Model::Svm, 1),
                (Technique::Pca, Model::Knn, 0),
                (Technique::Pca, Model::Knn, 1),
                (Technique::Ica, Model::Svm, 0),
                (Technique::Ica, Model::Svm, 1),
                (Technique::Ica, Model::Knn, 0),
                (Technique::Ica, Model::Knn, 1),
            ]
        );
    }

    #[test]
    fn zero_iterations_is_valid_and_empty() {
        let tmp = TempDir::new().unwrap();
        let job = JobSpec {
            iterations: Some(0),
            ..spec(&tmp)
        }
        .build()
        .unwrap();
        assert_eq!(job.total_units(), 0);
        assert_eq!(job.grid().count(), 0);
    }

    #[test]
    fn iterations_above_limit_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let result = JobSpec {
            iterations: Some(MAX_ITERATIONS + 1),
            ..spec(&tmp)
        }
        .build();
        assert!(matches!(result, Err(AnalyzerError::InvalidJob(_))));

        let job = JobSpec {
            iterations: Some(MAX_ITERATIONS),
            ..spec(&tmp)
        }
        .build()
        .unwrap();
        assert_eq!(job.iterations(), MAX_ITERATIONS);
    }

    #[test]
    fn missing_input_is_rejected() {
        let result = JobSpec::default().build();
        assert!(matches!(result, Err(AnalyzerError::InvalidJob(_))));

        let result = JobSpec {
            input: Some(PathBuf::from("/definitely/not/here.csv")),
            ..Default::default()
        }
        .build();
        assert!(matches!(result, Err(AnalyzerError::InvalidJob(_))));
    }

    #[test]
    fn input_path_is_made_absolute() {
        let tmp = TempDir::new().unwrap();
        let job = spec(&tmp).build().unwrap();
        assert!(job.input_file().is_absolute());
    }

    #[test]
    fn joins_preserve_selection_order_and_drop_duplicates() {
        let tmp = TempDir::new().unwrap();
        let job = JobSpec {
            cleaning: vec![
                CleaningOperation::RemoveDuplicates,
                CleaningOperation::Normalize,
                CleaningOperation::RemoveDuplicates,
            ],
            metrics: vec![Metric::Recall, Metric::Accuracy, Metric::Recall],
            ..spec(&tmp)
        }
        .build()
        .unwrap();

        assert_eq!(job.joined_cleaning(), "Remove Duplicate Data, Normalize");
        assert_eq!(job.joined_metrics(), "Recall,Accuracy");
        assert_eq!(job.csv_header(), "technique,model,Recall,Accuracy");
    }

    #[test]
    fn merge_prefers_overrides() {
        let base = JobSpec {
            models: vec![Model::Svm],
            iterations: Some(3),
            optimization: Some(OptimizationMode::GridSearch),
            ..Default::default()
        };
        let overrides = JobSpec {
            models: vec![Model::Mlp, Model::Knn],
            ..Default::default()
        };
        let merged = base.merge(overrides);
        assert_eq!(merged.models, vec![Model::Mlp, Model::Knn]);
        assert_eq!(merged.iterations, Some(3));
        assert_eq!(merged.optimization, Some(OptimizationMode::GridSearch));
    }

    #[test]
    fn job_file_toml_and_json() {
        let tmp = TempDir::new().unwrap();
        let toml_path = tmp.path().join("job.toml");
        std::fs::write(
            &toml_path,
            r#"
                techniques = ["PCA", "No Technique"]
                models = ["Naive Bayes"]
                metrics = ["Accuracy"]
                optimization = "Random Search"
                cross_validation = "K-Fold"
                iterations = 4
            "#,
        )
        .unwrap();
        let spec = JobSpec::from_file(&toml_path).unwrap();
        assert_eq!(spec.techniques, vec![Technique::Pca, Technique::NoTechnique]);
        assert_eq!(spec.optimization, Some(OptimizationMode::RandomSearch));
        assert_eq!(spec.cross_validation, Some(CrossValidationMode::KFold));
        assert_eq!(spec.iterations, Some(4));

        let json_path = tmp.path().join("job.json");
        std::fs::write(&json_path, r#"{"models": ["XGBoost", "Custom AI Model"]}"#).unwrap();
        let spec = JobSpec::from_file(&json_path).unwrap();
        assert_eq!(spec.models, vec![Model::XgBoost, Model::Custom]);
        assert!(spec.techniques.is_empty());
    }

    #[test]
    fn job_file_with_unknown_label_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("job.toml");
        std::fs::write(&path, "models = [\"Perceptron\"]\n").unwrap();
        assert!(matches!(
            JobSpec::from_file(&path),
            Err(AnalyzerError::Toml(_))
        ));
    }
}
