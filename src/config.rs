//! Configuração do MLAnalyzer carregada a partir de `mlanalyzer.toml`.
//!
//! A struct [`AnalyzerConfig`] descreve como cada estágio externo é invocado
//! e onde ficam os artefatos de caminho fixo. Valores não presentes no arquivo
//! usam o layout padrão. A variável de ambiente
//! `MLANALYZER_PYTHON` tem precedência sobre o interpretador do arquivo.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "mlanalyzer.toml";

/// Configuração de nível superior carregada de `mlanalyzer.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Interpretador usado para executar os scripts dos estágios.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Scripts de cada estágio.
    #[serde(default)]
    pub scripts: StageScripts,

    /// Caminhos fixos dos artefatos compartilhados com os estágios.
    #[serde(default)]
    pub artifacts: ArtifactLayout,
}

/// Script executado por cada estágio, passado ao interpretador como primeiro argumento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageScripts {
    pub cleaning: PathBuf,
    pub analysis: PathBuf,
    pub plot: PathBuf,
    pub export: PathBuf,
}

impl Default for StageScripts {
    fn default() -> Self {
        Self {
            cleaning: PathBuf::from("code/program_data_cleaning.py"),
            analysis: PathBuf::from("code/program_analysis.py"),
            plot: PathBuf::from("code/program_plot.py"),
            export: PathBuf::from("code/program_xlsx_and_pdf.py"),
        }
    }
}

/// Caminhos dos artefatos lidos e escritos por convenção pelos estágios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    /// Arquivo de trava de instância única.
    pub lock_file: PathBuf,
    /// Dados limpos, criados pelo estágio de limpeza e removidos após o grid.
    pub cleaned_data: PathBuf,
    /// CSV agregado com o resultado de todas as execuções.
    pub results_csv: PathBuf,
    /// Imagem gerada pelo estágio de plotagem.
    pub image: PathBuf,
    /// Planilha gerada pelo estágio de exportação.
    pub spreadsheet: PathBuf,
    /// Documento gerado pelo estágio de exportação.
    pub document: PathBuf,
    /// Log de erro, sobrescrito a cada falha.
    pub error_log: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            lock_file: PathBuf::from("program.lock"),
            cleaned_data: PathBuf::from("resources/cleaned_data.csv"),
            results_csv: PathBuf::from("results table/results.csv"),
            image: PathBuf::from("results image/graphs.png"),
            spreadsheet: PathBuf::from("results table/results.xlsx"),
            document: PathBuf::from("results image/graphs.pdf"),
            error_log: PathBuf::from("error_log.txt"),
        }
    }
}

impl ArtifactLayout {
    /// Todos os artefatos com um rótulo legível, na ordem em que são produzidos.
    pub fn entries(&self) -> [(&'static str, &Path); 7] {
        [
            ("lock file", &self.lock_file),
            ("cleaned data", &self.cleaned_data),
            ("results csv", &self.results_csv),
            ("image", &self.image),
            ("spreadsheet", &self.spreadsheet),
            ("document", &self.document),
            ("error log", &self.error_log),
        ]
    }
}

// Valor padrão para o interpretador: "python".
fn default_interpreter() -> String {
    "python".to_string()
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            scripts: StageScripts::default(),
            artifacts: ArtifactLayout::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Carrega a configuração do caminho fornecido, ou de `mlanalyzer.toml`
    /// no diretório atual. Usa valores padrão se o arquivo não existir.
    ///
    /// Um caminho explícito que não existe é erro.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        // Variável de ambiente tem precedência sobre o arquivo para o interpretador.
        if let Ok(interpreter) = std::env::var("MLANALYZER_PYTHON") {
            if !interpreter.trim().is_empty() {
                config.interpreter = interpreter;
            }
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str::<AnalyzerConfig>(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}
