use std::fmt::Write as _;

use super::table::EvaluationTable;
use crate::ml::metrics::{ClassificationReport, PerClassStats, top_confusions};

const RULE: &str = "========================================";
const DIGITS: usize = 3;
const LAST_ROW_HEADING: &str = "weighted avg";

/// Render per-class and averaged scores as an aligned text table.
pub fn format_classification_report(report: &ClassificationReport) -> String {
    let width = report
        .labels
        .iter()
        .map(|label| label.chars().count())
        .chain([LAST_ROW_HEADING.len(), DIGITS])
        .max()
        .unwrap_or(LAST_ROW_HEADING.len());

    let mut out = String::new();
    let _ = write!(out, "{:>width$} ", "");
    for header in ["precision", "recall", "f1-score", "support"] {
        let _ = write!(out, " {header:>9}");
    }
    out.push_str("\n\n");
    for (label, stats) in report.labels.iter().zip(&report.per_class) {
        push_row(&mut out, label, stats, width);
    }
    out.push('\n');
    if report.micro_is_accuracy {
        let _ = writeln!(
            out,
            "{:>width$}  {:>9} {:>9} {:>9.DIGITS$} {:>9}",
            "accuracy", "", "", report.micro_avg.f1, report.micro_avg.support
        );
    } else {
        push_row(&mut out, "micro avg", &report.micro_avg, width);
    }
    push_row(&mut out, "macro avg", &report.macro_avg, width);
    push_row(&mut out, LAST_ROW_HEADING, &report.weighted_avg, width);
    out
}

fn push_row(out: &mut String, heading: &str, stats: &PerClassStats, width: usize) {
    let _ = writeln!(
        out,
        "{heading:>width$}  {:>9.DIGITS$} {:>9.DIGITS$} {:>9.DIGITS$} {:>9}",
        stats.precision, stats.recall, stats.f1, stats.support
    );
}

/// Full text of `summary_report.txt`.
pub fn summary_report(table: &EvaluationTable, top_n: usize) -> String {
    let truths = table.true_labels();
    let predictions = table.predicted_labels();
    let report = ClassificationReport::from_labels(&table.labels, &truths, &predictions);

    let mut misclassified = String::from("Top Misclassifications (True -> Predicted):\n");
    let pairs = top_confusions(&truths, &predictions, top_n);
    if pairs.is_empty() {
        misclassified.push_str("No misclassifications found!\n");
    }
    for (truth, predicted, count) in pairs {
        let _ = writeln!(misclassified, "- {truth} -> {predicted}: {count} times");
    }

    let classification = format_classification_report(&report);
    format!(
        "{RULE}\n      Classification Report\n{RULE}\n{classification}\n\n\
         {RULE}\n      Top Misclassifications\n{RULE}\n{misclassified}"
    )
}
