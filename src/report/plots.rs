//! PNG charts for the evaluation report, drawn with `plotters` on a bitmap backend.

use std::error::Error;
use std::path::Path;
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, FontTransform, register_font};
use tracing::warn;

use super::ReportError;
use super::table::EvaluationTable;
use crate::ml::metrics::ConfusionMatrix;
use crate::ml::roc::{RocCurve, roc_curve};

pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.png";
pub const ROC_CURVES_FILE: &str = "roc_curves.png";
pub const PROBABILITY_DISTRIBUTIONS_FILE: &str = "probability_distributions.png";

const FONT: &str = "sans-serif";
const CONFUSION_SIZE: (u32, u32) = (1200, 1000);
const ROC_SIZE: (u32, u32) = (1000, 800);
const DISTRIBUTION_SIZE: (u32, u32) = (1400, 700);

/// Matplotlib "Blues" stops, light to dark.
const BLUES: [(u8, u8, u8); 9] = [
    (247, 251, 255),
    (222, 235, 247),
    (198, 219, 239),
    (158, 202, 225),
    (107, 174, 214),
    (66, 146, 198),
    (33, 113, 181),
    (8, 81, 156),
    (8, 48, 107),
];

type DrawResult = Result<(), Box<dyn Error>>;

/// Bitmap text needs a registered face; the bundled UI font keeps rendering independent of
/// system fonts.
fn ensure_font() {
    static REGISTERED: OnceLock<()> = OnceLock::new();
    REGISTERED.get_or_init(|| {
        if register_font(FONT, FontStyle::Normal, epaint_default_fonts::UBUNTU_LIGHT).is_err() {
            warn!("Failed to register the bundled plot font");
        }
    });
}

fn plot_error(path: &Path, err: Box<dyn Error>) -> ReportError {
    ReportError::Plot {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Colour at `t` in `[0, 1]` along the Blues ramp.
fn blues(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (BLUES.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(BLUES.len() - 2);
    let frac = scaled - lower as f64;
    let (a, b) = (BLUES[lower], BLUES[lower + 1]);
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Annotated heatmap of true (rows) against predicted (columns) labels.
pub fn plot_confusion_matrix(table: &EvaluationTable, path: &Path) -> Result<(), ReportError> {
    ensure_font();
    let cm = ConfusionMatrix::from_labels(
        &table.labels,
        &table.true_labels(),
        &table.predicted_labels(),
    );
    draw_confusion_matrix(path, &table.labels, &cm).map_err(|err| plot_error(path, err))
}

fn draw_confusion_matrix(path: &Path, labels: &[String], cm: &ConfusionMatrix) -> DrawResult {
    let root = BitMapBackend::new(path, CONFUSION_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (width, height) = (CONFUSION_SIZE.0 as i32, CONFUSION_SIZE.1 as i32);
    let (left, top, right, bottom) = (220, 90, 200, 170);
    let k = labels.len().max(1) as i32;
    let cell_w = (width - left - right) / k;
    let cell_h = (height - top - bottom) / k;
    let grid_right = left + cell_w * k;
    let grid_bottom = top + cell_h * k;
    let max = cm.max_count().max(1);

    let centered = Pos::new(HPos::Center, VPos::Center);
    let title = (FONT, 36).into_font().color(&BLACK).pos(centered);
    let axis_title = (FONT, 30).into_font().color(&BLACK).pos(centered);
    let tick = (FONT, 26).into_font().color(&BLACK);

    root.draw(&Text::new("Confusion Matrix", (width / 2, top / 2), title))?;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let count = cm.get(truth, predicted);
            let shade = f64::from(count) / f64::from(max);
            let x0 = left + predicted as i32 * cell_w;
            let y0 = top + truth as i32 * cell_h;
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell_w, y0 + cell_h)],
                blues(shade).filled(),
            ))?;
            let ink = if shade > 0.5 { &WHITE } else { &BLACK };
            root.draw(&Text::new(
                count.to_string(),
                (x0 + cell_w / 2, y0 + cell_h / 2),
                (FONT, 28).into_font().color(ink).pos(centered),
            ))?;
        }
    }
    root.draw(&Rectangle::new(
        [(left, top), (grid_right, grid_bottom)],
        BLACK.stroke_width(1),
    ))?;

    for (idx, label) in labels.iter().enumerate() {
        let offset = idx as i32;
        root.draw(&Text::new(
            label.as_str(),
            (left + offset * cell_w + cell_w / 2, grid_bottom + 12),
            tick.clone().pos(Pos::new(HPos::Center, VPos::Top)),
        ))?;
        root.draw(&Text::new(
            label.as_str(),
            (left - 12, top + offset * cell_h + cell_h / 2),
            tick.clone().pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;
    }
    root.draw(&Text::new(
        "Predicted Label",
        ((left + grid_right) / 2, grid_bottom + 100),
        axis_title.clone(),
    ))?;
    root.draw(&Text::new(
        "True Label",
        (40, (top + grid_bottom) / 2),
        axis_title.transform(FontTransform::Rotate270),
    ))?;

    // Colour bar with its min and max counts.
    let bar_left = grid_right + 50;
    let bar_right = bar_left + 30;
    let bar_height = grid_bottom - top;
    let steps = 100;
    for step in 0..steps {
        let y1 = grid_bottom - bar_height * step / steps;
        let y0 = grid_bottom - bar_height * (step + 1) / steps;
        root.draw(&Rectangle::new(
            [(bar_left, y0), (bar_right, y1)],
            blues(f64::from(step) / f64::from(steps - 1)).filled(),
        ))?;
    }
    root.draw(&Rectangle::new(
        [(bar_left, top), (bar_right, grid_bottom)],
        BLACK.stroke_width(1),
    ))?;
    let bar_tick = tick.pos(Pos::new(HPos::Left, VPos::Center));
    root.draw(&Text::new(max.to_string(), (bar_right + 10, top), bar_tick.clone()))?;
    root.draw(&Text::new("0", (bar_right + 10, grid_bottom), bar_tick))?;

    root.present()?;
    Ok(())
}

/// One-vs-rest ROC curve per class, in label order.
pub fn roc_curves(table: &EvaluationTable) -> Vec<RocCurve> {
    table
        .labels
        .iter()
        .enumerate()
        .map(|(class_idx, label)| {
            let positives: Vec<bool> = table
                .rows
                .iter()
                .map(|row| row.true_label == *label)
                .collect();
            let scores: Vec<f64> = table
                .rows
                .iter()
                .map(|row| row.probabilities[class_idx])
                .collect();
            roc_curve(&positives, &scores)
        })
        .collect()
}

fn legend_label(label: &str, curve: &RocCurve) -> String {
    match curve.auc {
        Some(auc) => format!("ROC curve for {label} (AUC = {auc:.3})"),
        None => format!("ROC curve for {label} (AUC = n/a)"),
    }
}

pub fn plot_roc_curves(table: &EvaluationTable, path: &Path) -> Result<(), ReportError> {
    ensure_font();
    let curves = roc_curves(table);
    draw_roc_curves(path, &table.labels, &curves).map_err(|err| plot_error(path, err))
}

fn draw_roc_curves(path: &Path, labels: &[String], curves: &[RocCurve]) -> DrawResult {
    let root = BitMapBackend::new(path, ROC_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Receiver Operating Characteristic (ROC) Curves", (FONT, 32))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..1f64, 0f64..1.05f64)?;
    chart
        .configure_mesh()
        .x_desc("False Positive Rate")
        .y_desc("True Positive Rate")
        .draw()?;

    for (idx, (label, curve)) in labels.iter().zip(curves).enumerate() {
        let color = Palette99::pick(idx).mix(1.0);
        let points: Vec<(f64, f64)> = curve
            .fpr
            .iter()
            .copied()
            .zip(curve.tpr.iter().copied())
            .collect();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(legend_label(label, curve))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }
    chart.draw_series(LineSeries::new(
        vec![(0.0, 0.0), (1.0, 1.0)],
        BLACK.mix(0.6).stroke_width(2),
    ))?;
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Probability each class received on rows correctly predicted as that class.
///
/// Classes without correct predictions get an empty series.
pub fn confidence_by_class(table: &EvaluationTable) -> Vec<Vec<f32>> {
    table
        .labels
        .iter()
        .enumerate()
        .map(|(class_idx, label)| {
            table
                .rows
                .iter()
                .filter(|row| row.true_label == *label && row.predicted_label == *label)
                .map(|row| row.probabilities[class_idx] as f32)
                .filter(|p| p.is_finite())
                .collect()
        })
        .collect()
}

pub fn plot_probability_distributions(
    table: &EvaluationTable,
    path: &Path,
) -> Result<(), ReportError> {
    ensure_font();
    let series = confidence_by_class(table);
    draw_probability_distributions(path, &table.labels, &series)
        .map_err(|err| plot_error(path, err))
}

fn draw_probability_distributions(
    path: &Path,
    labels: &[String],
    series: &[Vec<f32>],
) -> DrawResult {
    let root = BitMapBackend::new(path, DISTRIBUTION_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Model Confidence on Correct Predictions", (FONT, 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(labels.into_segmented(), 0f32..1.05f32)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Gesture Class")
        .y_desc("Predicted Probability")
        .x_label_formatter(&|value| match value {
            SegmentValue::Exact(label) | SegmentValue::CenterOf(label) => label.to_string(),
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    let boxes: Vec<_> = labels
        .iter()
        .zip(series)
        .filter(|(_, values)| !values.is_empty())
        .map(|(label, values)| {
            Boxplot::new_vertical(SegmentValue::CenterOf(label), &Quartiles::new(values))
                .width(40)
                .style(&BLUE)
        })
        .collect();
    chart.draw_series(boxes)?;

    root.present()?;
    Ok(())
}
