//! Interface de linha de comando do MLAnalyzer baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, status, vocab)
//! e flags globais (--config, --verbose, --quiet).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::job::JobSpec;
use crate::vocabulary::{
    CleaningOperation, CrossValidationMode, Metric, Model, OptimizationMode, Technique,
};

/// MLAnalyzer: executa jobs de análise de ML em múltiplos estágios, uma instância por vez.
#[derive(Debug, Parser)]
#[command(name = "mlanalyzer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./mlanalyzer.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose) com uma linha de log por iteração.
    #[arg(long, short, global = true, default_value_t = false, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Oculta a barra de progresso e mostra apenas erros.
    #[arg(long, short, global = true, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa um job de análise sobre um arquivo CSV.
    Run(RunArgs),

    /// Mostra se um job está em execução e quais artefatos existem.
    Status,

    /// Lista os valores aceitos para cada seleção.
    Vocab,
}

/// Seleções do job. Flags da CLI têm precedência sobre o arquivo `--file`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Arquivo CSV de entrada.
    pub input: Option<PathBuf>,

    /// Caminho para um arquivo TOML ou JSON com as seleções do job.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Operação de limpeza de dados (repetível, na ordem de seleção).
    #[arg(long = "clean", value_enum, value_delimiter = ',')]
    pub cleaning: Vec<CleaningOperation>,

    /// Técnica de redução de dimensionalidade (repetível).
    #[arg(long = "technique", short = 't', value_enum, value_delimiter = ',')]
    pub techniques: Vec<Technique>,

    /// Modelo a treinar (repetível).
    #[arg(long = "model", short = 'm', value_enum, value_delimiter = ',')]
    pub models: Vec<Model>,

    /// Métrica a reportar (repetível).
    #[arg(long = "metric", value_enum, value_delimiter = ',')]
    pub metrics: Vec<Metric>,

    /// Estratégia de otimização de hiperparâmetros.
    #[arg(long, value_enum)]
    pub optimization: Option<OptimizationMode>,

    /// Estratégia de validação cruzada.
    #[arg(long, value_enum)]
    pub cross_validation: Option<CrossValidationMode>,

    /// Número de iterações por combinação técnica × modelo (0 a 999).
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u32).range(0..=999))]
    pub iterations: Option<u32>,

    /// Imprime o registro da execução em JSON ao final.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl RunArgs {
    /// Seleções vindas da CLI, para sobrepor às do arquivo de job.
    pub fn to_spec(&self) -> JobSpec {
        JobSpec {
            input: self.input.clone(),
            cleaning: self.cleaning.clone(),
            techniques: self.techniques.clone(),
            models: self.models.clone(),
            metrics: self.metrics.clone(),
            optimization: self.optimization,
            cross_validation: self.cross_validation,
            iterations: self.iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from([
            "mlanalyzer",
            "run",
            "data.csv",
            "--model",
            "svm",
            "--model",
            "naive-bayes",
            "--technique",
            "pca,lda",
            "--metric",
            "accuracy",
            "-n",
            "3",
        ]);
        match cli.command {
            Command::Run(args) => {
                let spec = args.to_spec();
                assert_eq!(spec.input, Some(PathBuf::from("data.csv")));
                assert_eq!(spec.models, vec![Model::Svm, Model::NaiveBayes]);
                assert_eq!(spec.techniques, vec![Technique::Pca, Technique::Lda]);
                assert_eq!(spec.metrics, vec![Metric::Accuracy]);
                assert_eq!(spec.iterations, Some(3));
                assert!(spec.cleaning.is_empty());
                assert!(spec.optimization.is_none());
                assert!(!args.json);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_modes_and_cleaning() {
        let cli = Cli::parse_from([
            "mlanalyzer",
            "run",
            "in.csv",
            "--clean",
            "normalize",
            "--clean",
            "mean-imputation",
            "--optimization",
            "random-search",
            "--cross-validation",
            "k-fold",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(
            args.cleaning,
            vec![CleaningOperation::Normalize, CleaningOperation::MeanImputation]
        );
        assert_eq!(args.optimization, Some(OptimizationMode::RandomSearch));
        assert_eq!(args.cross_validation, Some(CrossValidationMode::KFold));
    }

    #[test]
    fn cli_rejects_iterations_out_of_range() {
        let result = Cli::try_parse_from(["mlanalyzer", "run", "in.csv", "--iterations", "1000"]);
        assert!(result.is_err());
        let cli = Cli::try_parse_from(["mlanalyzer", "run", "in.csv", "--iterations", "0"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(args.iterations, Some(0));
    }

    #[test]
    fn cli_rejects_unknown_model() {
        let result = Cli::try_parse_from(["mlanalyzer", "run", "in.csv", "--model", "perceptron"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from(["mlanalyzer", "--config", "alt.toml", "--verbose", "status"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn cli_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(["mlanalyzer", "-v", "-q", "vocab"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
