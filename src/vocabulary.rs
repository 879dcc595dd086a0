//! Fixed vocabularies a job can select from.
//!
//! Every enum renders to the exact label the external stages expect on their
//! command line (`as_str`). CLI values are the kebab-case variant names, job
//! files use the labels.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Data cleaning operations understood by the cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum CleaningOperation {
    #[serde(rename = "Normalize")]
    Normalize,
    #[serde(rename = "Mean Imputation for Missing Values")]
    MeanImputation,
    #[serde(rename = "Remove Duplicate Data")]
    RemoveDuplicates,
    #[serde(rename = "Collinearity Removal")]
    CollinearityRemoval,
}

impl CleaningOperation {
    pub const ALL: [CleaningOperation; 4] = [
        CleaningOperation::Normalize,
        CleaningOperation::MeanImputation,
        CleaningOperation::RemoveDuplicates,
        CleaningOperation::CollinearityRemoval,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningOperation::Normalize => "Normalize",
            CleaningOperation::MeanImputation => "Mean Imputation for Missing Values",
            CleaningOperation::RemoveDuplicates => "Remove Duplicate Data",
            CleaningOperation::CollinearityRemoval => "Collinearity Removal",
        }
    }
}

/// Dimensionality reduction techniques applied before training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Technique {
    #[serde(rename = "No Technique")]
    NoTechnique,
    #[serde(rename = "PCA")]
    Pca,
    #[serde(rename = "IncPCA")]
    IncPca,
    #[serde(rename = "ICA")]
    Ica,
    #[serde(rename = "LDA")]
    Lda,
}

impl Technique {
    pub const ALL: [Technique; 5] = [
        Technique::NoTechnique,
        Technique::Pca,
        Technique::IncPca,
        Technique::Ica,
        Technique::Lda,
    ];

    /// Used when no technique is selected.
    pub const SENTINEL: Technique = Technique::NoTechnique;

    pub fn as_str(&self) -> &'static str {
        match self {
            Technique::NoTechnique => "No Technique",
            Technique::Pca => "PCA",
            Technique::IncPca => "IncPCA",
            Technique::Ica => "ICA",
            Technique::Lda => "LDA",
        }
    }
}

/// Classifiers the analysis stage can train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Model {
    #[serde(rename = "Naive Bayes")]
    NaiveBayes,
    #[serde(rename = "SVM")]
    Svm,
    #[serde(rename = "MLP")]
    Mlp,
    #[serde(rename = "DecisionTree")]
    DecisionTree,
    #[serde(rename = "RandomForest")]
    RandomForest,
    #[serde(rename = "KNN")]
    Knn,
    #[serde(rename = "LogReg")]
    LogReg,
    #[serde(rename = "GradientBoost")]
    GradientBoost,
    #[serde(rename = "XGBoost")]
    XgBoost,
    #[serde(rename = "Custom AI Model")]
    Custom,
}

impl Model {
    pub const ALL: [Model; 10] = [
        Model::NaiveBayes,
        Model::Svm,
        Model::Mlp,
        Model::DecisionTree,
        Model::RandomForest,
        Model::Knn,
        Model::LogReg,
        Model::GradientBoost,
        Model::XgBoost,
        Model::Custom,
    ];

    /// Used when no model is selected.
    pub const SENTINEL: Model = Model::NaiveBayes;

    pub fn as_str(&self) -> &'static str {
        match self {
            Model::NaiveBayes => "Naive Bayes",
            Model::Svm => "SVM",
            Model::Mlp => "MLP",
            Model::DecisionTree => "DecisionTree",
            Model::RandomForest => "RandomForest",
            Model::Knn => "KNN",
            Model::LogReg => "LogReg",
            Model::GradientBoost => "GradientBoost",
            Model::XgBoost => "XGBoost",
            Model::Custom => "Custom AI Model",
        }
    }
}

/// Metrics reported per run; they also name the result columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Metric {
    #[serde(rename = "F1-Score")]
    #[value(name = "f1-score")]
    F1Score,
    #[serde(rename = "Processing Time")]
    ProcessingTime,
    #[serde(rename = "ROC AUC")]
    RocAuc,
    #[serde(rename = "Memory Usage")]
    MemoryUsage,
    #[serde(rename = "Precision")]
    Precision,
    #[serde(rename = "Accuracy")]
    Accuracy,
    #[serde(rename = "Recall")]
    Recall,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::F1Score,
        Metric::ProcessingTime,
        Metric::RocAuc,
        Metric::MemoryUsage,
        Metric::Precision,
        Metric::Accuracy,
        Metric::Recall,
    ];

    /// Used when no metric is selected.
    pub const SENTINEL: Metric = Metric::F1Score;

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::F1Score => "F1-Score",
            Metric::ProcessingTime => "Processing Time",
            Metric::RocAuc => "ROC AUC",
            Metric::MemoryUsage => "Memory Usage",
            Metric::Precision => "Precision",
            Metric::Accuracy => "Accuracy",
            Metric::Recall => "Recall",
        }
    }
}

/// Hyperparameter search strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum OptimizationMode {
    #[serde(rename = "Grid Search")]
    GridSearch,
    #[serde(rename = "Random Search")]
    RandomSearch,
    #[default]
    #[serde(rename = "None")]
    None,
}

impl OptimizationMode {
    pub const ALL: [OptimizationMode; 3] = [
        OptimizationMode::GridSearch,
        OptimizationMode::RandomSearch,
        OptimizationMode::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationMode::GridSearch => "Grid Search",
            OptimizationMode::RandomSearch => "Random Search",
            OptimizationMode::None => "None",
        }
    }
}

/// Model validation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum CrossValidationMode {
    #[serde(rename = "K-Fold")]
    KFold,
    #[default]
    #[serde(rename = "Hold-Out")]
    HoldOut,
}

impl CrossValidationMode {
    pub const ALL: [CrossValidationMode; 2] =
        [CrossValidationMode::KFold, CrossValidationMode::HoldOut];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrossValidationMode::KFold => "K-Fold",
            CrossValidationMode::HoldOut => "Hold-Out",
        }
    }
}

macro_rules! display_as_label {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_label!(
    CleaningOperation,
    Technique,
    Model,
    Metric,
    OptimizationMode,
    CrossValidationMode,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_match_stage_defaults() {
        assert_eq!(Technique::SENTINEL.as_str(), "No Technique");
        assert_eq!(Model::SENTINEL.as_str(), "Naive Bayes");
        assert_eq!(Metric::SENTINEL.as_str(), "F1-Score");
        assert_eq!(OptimizationMode::default(), OptimizationMode::None);
        assert_eq!(CrossValidationMode::default(), CrossValidationMode::HoldOut);
    }

    #[test]
    fn display_uses_stage_label() {
        assert_eq!(Model::Custom.to_string(), "Custom AI Model");
        assert_eq!(Metric::RocAuc.to_string(), "ROC AUC");
        assert_eq!(
            CleaningOperation::MeanImputation.to_string(),
            "Mean Imputation for Missing Values"
        );
    }

    #[test]
    fn serde_uses_stage_label() {
        let json = serde_json::to_string(&Model::XgBoost).unwrap();
        assert_eq!(json, "\"XGBoost\"");
        let metric: Metric = serde_json::from_str("\"Processing Time\"").unwrap();
        assert_eq!(metric, Metric::ProcessingTime);
    }

    #[test]
    fn labels_agree_with_serde_for_every_value() {
        for model in Model::ALL {
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.as_str()));
        }
        for technique in Technique::ALL {
            let json = serde_json::to_string(&technique).unwrap();
            assert_eq!(json, format!("\"{}\"", technique.as_str()));
        }
        for metric in Metric::ALL {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.as_str()));
        }
    }

    #[test]
    fn cli_value_names_are_kebab_case() {
        let value = <Model as ValueEnum>::from_str("naive-bayes", false).unwrap();
        assert_eq!(value, Model::NaiveBayes);
        let value = <Technique as ValueEnum>::from_str("inc-pca", false).unwrap();
        assert_eq!(value, Technique::IncPca);
    }
}
