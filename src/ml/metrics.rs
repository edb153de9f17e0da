//! Evaluation metrics for classification models.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Count label pairs over a fixed label order. Pairs naming unknown labels are ignored.
    pub fn from_labels(labels: &[String], truths: &[&str], predictions: &[&str]) -> Self {
        let index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.as_str(), idx))
            .collect();
        let mut cm = Self::new(labels.len());
        for (truth, predicted) in truths.iter().zip(predictions) {
            if let (Some(&t), Some(&p)) = (index.get(truth), index.get(predicted)) {
                cm.add(t, p);
            }
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    /// Largest single cell, used to scale heatmap colours.
    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

impl PerClassStats {
    fn from_counts(tp: f32, fp: f32, fn_: f32, support: u32) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        Self {
            precision,
            recall,
            f1: f1_score(precision, recall),
            support,
        }
    }
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        stats.push(PerClassStats::from_counts(tp, fp, fn_, support));
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let mut correct = 0u64;
    let mut total = 0u64;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let v = cm.get(truth, predicted) as u64;
            total += v;
            if truth == predicted {
                correct += v;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        (correct as f32) / (total as f32)
    }
}

/// Per-class and averaged scores over a fixed label order.
///
/// Rows whose true label is outside `labels` still count as false positives for the class
/// they were predicted as. Undefined ratios are reported as `0.0`.
#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub labels: Vec<String>,
    pub per_class: Vec<PerClassStats>,
    /// Micro average over `labels`. Equals plain accuracy when every observed label is in
    /// `labels`.
    pub micro_avg: PerClassStats,
    pub macro_avg: PerClassStats,
    pub weighted_avg: PerClassStats,
    /// True when every true and predicted label belongs to `labels`.
    pub micro_is_accuracy: bool,
}

impl ClassificationReport {
    pub fn from_labels(labels: &[String], truths: &[&str], predictions: &[&str]) -> Self {
        let index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.as_str(), idx))
            .collect();
        let k = labels.len();
        let mut tp = vec![0u32; k];
        let mut fp = vec![0u32; k];
        let mut fn_ = vec![0u32; k];
        let mut support = vec![0u32; k];
        let mut micro_is_accuracy = true;

        for (truth, predicted) in truths.iter().zip(predictions) {
            let t = index.get(truth).copied();
            let p = index.get(predicted).copied();
            if t.is_none() || p.is_none() {
                micro_is_accuracy = false;
            }
            if let Some(t) = t {
                support[t] += 1;
            }
            match (t, p) {
                (Some(t), Some(p)) if t == p => tp[t] += 1,
                (t, p) => {
                    if let Some(t) = t {
                        fn_[t] += 1;
                    }
                    if let Some(p) = p {
                        fp[p] += 1;
                    }
                }
            }
        }

        let per_class: Vec<PerClassStats> = (0..k)
            .map(|c| {
                PerClassStats::from_counts(tp[c] as f32, fp[c] as f32, fn_[c] as f32, support[c])
            })
            .collect();
        let total_support: u32 = support.iter().sum();
        let micro_avg = PerClassStats::from_counts(
            tp.iter().sum::<u32>() as f32,
            fp.iter().sum::<u32>() as f32,
            fn_.iter().sum::<u32>() as f32,
            total_support,
        );
        let macro_avg = average(&per_class, |_| 1.0, total_support);
        let weighted_avg = average(&per_class, |stats| stats.support as f32, total_support);

        Self {
            labels: labels.to_vec(),
            per_class,
            micro_avg,
            macro_avg,
            weighted_avg,
            micro_is_accuracy,
        }
    }
}

fn average(
    per_class: &[PerClassStats],
    weight: impl Fn(&PerClassStats) -> f32,
    support: u32,
) -> PerClassStats {
    let total_weight: f32 = per_class.iter().map(&weight).sum();
    let mean = |value: fn(&PerClassStats) -> f32| {
        let sum: f32 = per_class.iter().map(|stats| value(stats) * weight(stats)).sum();
        ratio(sum, total_weight)
    };
    PerClassStats {
        precision: mean(|stats| stats.precision),
        recall: mean(|stats| stats.recall),
        f1: mean(|stats| stats.f1),
        support,
    }
}

/// Most frequent `(true, predicted)` pairs with `true != predicted`.
///
/// Sorted by descending count; equal counts keep `(true, predicted)` order.
pub fn top_confusions(
    truths: &[&str],
    predictions: &[&str],
    limit: usize,
) -> Vec<(String, String, usize)> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for (truth, predicted) in truths.iter().zip(predictions) {
        if truth != predicted {
            *counts.entry((*truth, *predicted)).or_default() += 1;
        }
    }
    let mut pairs: Vec<(String, String, usize)> = counts
        .into_iter()
        .map(|((truth, predicted), count)| (truth.to_string(), predicted.to_string(), count))
        .collect();
    pairs.sort_by(|a, b| b.2.cmp(&a.2));
    pairs.truncate(limit);
    pairs
}

fn ratio(num: f32, denom: f32) -> f32 {
    if denom == 0.0 { 0.0 } else { num / denom }
}

fn f1_score(precision: f32, recall: f32) -> f32 {
    ratio(2.0 * precision * recall, precision + recall)
}
