//! Evaluation reporter: turns the prediction CSV into a text summary and three charts.

pub mod plots;
pub mod summary;
pub mod table;

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::ReportSettings;
pub use plots::{
    CONFUSION_MATRIX_FILE, PROBABILITY_DISTRIBUTIONS_FILE, ROC_CURVES_FILE, plot_confusion_matrix,
    plot_probability_distributions, plot_roc_curves,
};
pub use summary::summary_report;
pub use table::{EvaluationRow, EvaluationTable, load_evaluation_table};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("The file '{}' was not found.", path.display())]
    MissingCsv { path: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid evaluation CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Evaluation CSV has no {column} column")]
    MissingColumn { column: &'static str },
    #[error("Evaluation CSV has no Prob_ columns")]
    NoProbabilityColumns,
    #[error("Row {row}: {column} value {value:?} is not a number")]
    InvalidProbability {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Row {row} has no probabilities")]
    NoProbabilities { row: usize },
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to draw {path}: {message}")]
    Plot { path: PathBuf, message: String },
}

/// Files produced by one report run.
#[derive(Debug, Clone)]
pub struct ReportOutputs {
    pub summary: PathBuf,
    pub confusion_matrix: PathBuf,
    pub roc_curves: PathBuf,
    pub probability_distributions: PathBuf,
    pub rows: usize,
    pub dropped_rows: usize,
}

/// Write the summary and every chart into `settings.output_dir`, stopping at the first
/// failure.
pub fn generate_report(settings: &ReportSettings) -> Result<ReportOutputs, ReportError> {
    let output_dir = &settings.output_dir;
    if !output_dir.is_dir() {
        std::fs::create_dir_all(output_dir).map_err(|source| ReportError::CreateDir {
            path: output_dir.clone(),
            source,
        })?;
        info!("Created directory: {}", output_dir.display());
    }
    let table = load_evaluation_table(&settings.csv_path)?;
    info!("Data loaded and prepared successfully.");

    let summary = output_dir.join(&settings.report_file_name);
    write_summary_report(&table, settings.top_misclassifications, &summary)?;
    info!("Summary report saved to '{}'", summary.display());

    let confusion_matrix = output_dir.join(CONFUSION_MATRIX_FILE);
    plot_confusion_matrix(&table, &confusion_matrix)?;
    info!("Confusion matrix saved to '{}'", confusion_matrix.display());

    let roc_curves = output_dir.join(ROC_CURVES_FILE);
    plot_roc_curves(&table, &roc_curves)?;
    info!("ROC curves saved to '{}'", roc_curves.display());

    let probability_distributions = output_dir.join(PROBABILITY_DISTRIBUTIONS_FILE);
    plot_probability_distributions(&table, &probability_distributions)?;
    info!(
        "Probability distributions saved to '{}'",
        probability_distributions.display()
    );

    Ok(ReportOutputs {
        summary,
        confusion_matrix,
        roc_curves,
        probability_distributions,
        rows: table.rows.len(),
        dropped_rows: table.dropped_rows,
    })
}

pub fn write_summary_report(
    table: &EvaluationTable,
    top_n: usize,
    path: &std::path::Path,
) -> Result<(), ReportError> {
    std::fs::write(path, summary_report(table, top_n)).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
