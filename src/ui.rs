//! Interface de terminal do MLAnalyzer: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de progresso do grid de análise e
//! `console` para estilização com cores. O [`JobProgress`] acompanha
//! visualmente a execução de um job no terminal; as funções `print_*`
//! exibem o resultado final.

use std::path::Path;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ArtifactLayout;
use crate::error::PipelineError;
use crate::pipeline::RunRecord;
use crate::progress::ProgressReporter;
use crate::vocabulary::{
    CleaningOperation, CrossValidationMode, Metric, Model, OptimizationMode, Technique,
};

/// Indicador visual de progresso para a execução de um job no terminal.
///
/// Exibe uma barra com as iterações concluídas do grid de análise.
pub struct JobProgress {
    // Barra de progresso do indicatif.
    pb: ProgressBar,
}

impl JobProgress {
    /// Inicia a barra com o arquivo de entrada e retorna a instância de progresso.
    pub fn start(input: &Path) -> Self {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        pb.set_style(style);
        pb.set_message(format!("Cleaning {}", input.display()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { pb }
    }

    /// Remove a barra do terminal antes de imprimir o resultado final.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl ProgressReporter for JobProgress {
    fn report(&self, completed: u64, total: u64) {
        self.pb.set_length(total);
        self.pb.set_position(completed);
        self.pb
            .set_message(format!("Iterations done: {completed} of {total}"));
    }
}

/// Exibe o resultado de um job concluído com os artefatos gerados.
///
/// Sucesso é mostrado em verde com checkmark.
pub fn print_completed(record: &RunRecord) {
    let green = Style::new().green().bold();
    println!(
        "  {} Analysis completed: {} runs, {} result rows",
        green.apply_to("✓"),
        record.completed_units,
        record.result_rows
    );
    for (label, path) in [
        ("results", &record.results_csv),
        ("graphs", &record.image),
        ("spreadsheet", &record.spreadsheet),
        ("document", &record.document),
    ] {
        println!("    {label:<12} {}", path.display());
    }
}

/// Exibe a falha em vermelho, indicando onde está o log de erro.
pub fn print_failed(err: &PipelineError, error_log: &Path) {
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow();
    eprintln!("  {} Job failed: {err}", red.apply_to("✗"));
    eprintln!(
        "    Details are in the file '{}'",
        yellow.apply_to(error_log.display())
    );
}

/// Exibe o aviso de encerramento solicitado pelo usuário.
pub fn print_interrupted() {
    let yellow = Style::new().yellow();
    eprintln!("  {} Job interrupted, cleaned up and exiting", yellow.apply_to("↯"));
}

/// Imprime o registro da execução formatado em JSON.
pub fn print_record(record: &RunRecord) {
    let green = Style::new().green().bold();
    println!();
    println!("{}", green.apply_to("─── Run Record ───"));
    println!(
        "{}",
        serde_json::to_string_pretty(record).unwrap_or_default()
    );
}

/// Mensagem exibida quando outra instância já detém a trava.
pub fn print_already_running(lock_file: &Path) {
    let red = Style::new().red().bold();
    eprintln!(
        "  {} The application is already running (lock file: {})",
        red.apply_to("✗"),
        lock_file.display()
    );
}

/// Imprime o estado da trava e a presença de cada artefato.
pub fn print_status(running: bool, layout: &ArtifactLayout) {
    let green = Style::new().green();
    let dim = Style::new().dim();
    if running {
        println!("  {} An analysis job is running", Style::new().yellow().apply_to("●"));
    } else {
        println!("  {} No analysis job is running", dim.apply_to("○"));
    }
    for (label, path) in layout.entries() {
        let mark = if path.exists() {
            green.apply_to(format!("{:<8}", "present"))
        } else {
            dim.apply_to(format!("{:<8}", "absent"))
        };
        println!("    {label:<13} {mark} {}", path.display());
    }
}

/// Lista todos os vocabulários com seus valores de CLI e rótulos.
pub fn print_vocabulary() {
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    print_section(&bold, "Cleaning (--clean)", CleaningOperation::ALL.iter().map(|v| {
        (cli_name(*v), v.as_str(), false)
    }));
    print_section(&bold, "Techniques (--technique)", Technique::ALL.iter().map(|v| {
        (cli_name(*v), v.as_str(), *v == Technique::SENTINEL)
    }));
    print_section(&bold, "Models (--model)", Model::ALL.iter().map(|v| {
        (cli_name(*v), v.as_str(), *v == Model::SENTINEL)
    }));
    print_section(&bold, "Metrics (--metric)", Metric::ALL.iter().map(|v| {
        (cli_name(*v), v.as_str(), *v == Metric::SENTINEL)
    }));
    print_section(&bold, "Optimization (--optimization)", OptimizationMode::ALL.iter().map(|v| {
        (cli_name(*v), v.as_str(), *v == OptimizationMode::default())
    }));
    print_section(
        &bold,
        "Cross validation (--cross-validation)",
        CrossValidationMode::ALL
            .iter()
            .map(|v| (cli_name(*v), v.as_str(), *v == CrossValidationMode::default())),
    );
    println!();
    println!("{}", dim.apply_to("* used when nothing is selected"));
}

fn print_section<'a>(
    bold: &Style,
    title: &str,
    values: impl Iterator<Item = (String, &'a str, bool)>,
) {
    println!("{}", bold.apply_to(title));
    for (name, label, is_default) in values {
        let marker = if is_default { "*" } else { " " };
        println!("  {marker} {name:<24} {label}");
    }
}

// Nome do valor aceito pela CLI (kebab-case derivado pelo clap).
fn cli_name<T: clap::ValueEnum>(value: T) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default()
}
