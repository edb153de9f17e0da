use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::info;

use super::ReportError;
use crate::prediction::{PROBABILITY_PREFIX, TRUE_LABEL_COLUMN};

/// Cell values read as missing, matching the usual CSV tooling defaults.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(value: &str) -> bool {
    NA_TOKENS.contains(&value)
}

/// One evaluated sample.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRow {
    pub true_label: String,
    pub predicted_label: String,
    /// Probability per class in [`EvaluationTable::labels`] order; `NaN` marks an empty cell.
    pub probabilities: Vec<f64>,
}

/// Evaluation records with the derived predicted label.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationTable {
    /// Class names from the `Prob_` columns, sorted.
    pub labels: Vec<String>,
    pub rows: Vec<EvaluationRow>,
    /// Rows removed because their true label was missing.
    pub dropped_rows: usize,
}

impl EvaluationTable {
    pub fn true_labels(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.true_label.as_str()).collect()
    }

    pub fn predicted_labels(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.predicted_label.as_str())
            .collect()
    }
}

/// Read the prediction CSV at `path`.
pub fn load_evaluation_table(path: &Path) -> Result<EvaluationTable, ReportError> {
    info!("Loading data from '{}'...", path.display());
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ReportError::MissingCsv {
                path: path.to_path_buf(),
            }
        } else {
            ReportError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let table = read_evaluation_table(file)?;
    if table.dropped_rows > 0 {
        info!("Dropped {} rows with missing TrueLabel.", table.dropped_rows);
    }
    Ok(table)
}

/// Parse evaluation records from any CSV source.
pub fn read_evaluation_table<R: Read>(reader: R) -> Result<EvaluationTable, ReportError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let true_idx = headers
        .iter()
        .position(|header| header == TRUE_LABEL_COLUMN)
        .ok_or(ReportError::MissingColumn {
            column: TRUE_LABEL_COLUMN,
        })?;
    let mut prob_columns: Vec<(String, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            header
                .strip_prefix(PROBABILITY_PREFIX)
                .map(|label| (label.to_string(), idx))
        })
        .collect();
    if prob_columns.is_empty() {
        return Err(ReportError::NoProbabilityColumns);
    }
    prob_columns.sort_by(|a, b| a.0.cmp(&b.0));

    let mut rows = Vec::new();
    let mut dropped_rows = 0usize;
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = row_idx + 1;
        let mut probabilities = Vec::with_capacity(prob_columns.len());
        for (label, idx) in &prob_columns {
            let cell = record.get(*idx).unwrap_or("").trim();
            let value = if is_missing(cell) {
                f64::NAN
            } else {
                cell.parse::<f64>()
                    .map_err(|_| ReportError::InvalidProbability {
                        row,
                        column: format!("{PROBABILITY_PREFIX}{label}"),
                        value: cell.to_string(),
                    })?
            };
            probabilities.push(value);
        }
        let true_label = record.get(true_idx).unwrap_or("");
        if is_missing(true_label) {
            dropped_rows += 1;
            continue;
        }
        let predicted_label = best_label(&prob_columns, &probabilities)
            .ok_or(ReportError::NoProbabilities { row })?
            .to_string();
        rows.push(EvaluationRow {
            true_label: true_label.to_string(),
            predicted_label,
            probabilities,
        });
    }

    Ok(EvaluationTable {
        labels: prob_columns.into_iter().map(|(label, _)| label).collect(),
        rows,
        dropped_rows,
    })
}

/// Label with the highest probability; equal maxima go to the first label in sorted order.
fn best_label<'a>(columns: &'a [(String, usize)], probabilities: &[f64]) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for ((label, _), &p) in columns.iter().zip(probabilities) {
        if p.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, best_p)| p > best_p) {
            best = Some((label.as_str(), p));
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> EvaluationTable {
        read_evaluation_table(csv.as_bytes()).unwrap()
    }

    #[test]
    fn predicted_label_is_the_most_probable_class() {
        let t = table("TrueLabel,Prob_A,Prob_B\nA,0.9,0.1\nA,0.2,0.8\n");
        assert_eq!(t.labels, ["A", "B"]);
        assert_eq!(t.predicted_labels(), ["A", "B"]);
        assert_eq!(t.rows[0].probabilities, vec![0.9, 0.1]);
    }

    #[test]
    fn columns_are_sorted_by_label() {
        let t = table("Prob_palm,TrueLabel,Prob_fist\n0.3,fist,0.7\n");
        assert_eq!(t.labels, ["fist", "palm"]);
        assert_eq!(t.rows[0].probabilities, vec![0.7, 0.3]);
        assert_eq!(t.rows[0].predicted_label, "fist");
    }

    #[test]
    fn ties_go_to_the_smallest_label() {
        let t = table("TrueLabel,Prob_palm,Prob_fist,Prob_ok\nok,0.4,0.2,0.4\n");
        assert_eq!(t.rows[0].predicted_label, "ok");
        let t = table("TrueLabel,Prob_b,Prob_a\nb,0.5,0.5\n");
        assert_eq!(t.rows[0].predicted_label, "a");
    }

    #[test]
    fn missing_true_labels_are_dropped_and_counted() {
        let t = table("TrueLabel,Prob_A,Prob_B\nA,0.9,0.1\n,0.9,0.1\nNA,0.1,0.9\nB,0.1,0.9\n");
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.dropped_rows, 2);
        assert_eq!(t.true_labels(), ["A", "B"]);
    }

    #[test]
    fn empty_probability_cells_are_ignored() {
        let t = table("TrueLabel,Prob_A,Prob_B\nB,,0.3\n");
        assert_eq!(t.rows[0].predicted_label, "B");
        assert!(t.rows[0].probabilities[0].is_nan());
        assert!(matches!(
            read_evaluation_table("TrueLabel,Prob_A\nA,\n".as_bytes()),
            Err(ReportError::NoProbabilities { row: 1 })
        ));
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert!(matches!(
            read_evaluation_table("Label,Prob_A\nA,1\n".as_bytes()),
            Err(ReportError::MissingColumn { column: "TrueLabel" })
        ));
        assert!(matches!(
            read_evaluation_table("TrueLabel,Score\nA,1\n".as_bytes()),
            Err(ReportError::NoProbabilityColumns)
        ));
        assert!(matches!(
            read_evaluation_table("TrueLabel,Prob_A\nA,high\n".as_bytes()),
            Err(ReportError::InvalidProbability { row: 1, .. })
        ));
    }

    #[test]
    fn missing_file_is_reported_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evaluation_results.csv");
        assert!(matches!(
            load_evaluation_table(&path),
            Err(ReportError::MissingCsv { .. })
        ));
    }
}
