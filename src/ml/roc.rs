//! Receiver operating characteristic curves for one-vs-rest evaluation.

/// ROC points ordered by increasing threshold strictness.
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Area under the curve; `None` when the positive or negative class is absent.
    pub auc: Option<f64>,
}

/// Build the ROC curve for binary `positives` scored by `scores`.
///
/// Scores are swept from high to low, emitting one point per distinct score, with `(0, 0)`
/// prepended. Non-finite scores are ignored. Without both classes present the rates are
/// undefined, so the curve only holds the diagonal endpoints and `auc` is `None`.
pub fn roc_curve(positives: &[bool], scores: &[f64]) -> RocCurve {
    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .zip(positives)
        .filter(|(score, _)| score.is_finite())
        .map(|(&score, &positive)| (score, positive))
        .collect();
    let total_pos = pairs.iter().filter(|(_, positive)| *positive).count();
    let total_neg = pairs.len() - total_pos;
    if total_pos == 0 || total_neg == 0 {
        return RocCurve {
            fpr: vec![0.0, 1.0],
            tpr: vec![0.0, 1.0],
            auc: None,
        };
    }

    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut tp = 0usize;
    let mut fp = 0usize;
    for (idx, &(score, positive)) in pairs.iter().enumerate() {
        if positive {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_threshold = pairs
            .get(idx + 1)
            .is_none_or(|(next, _)| *next != score);
        if last_of_threshold {
            fpr.push(fp as f64 / total_neg as f64);
            tpr.push(tp as f64 / total_pos as f64);
        }
    }
    let auc = Some(auc(&fpr, &tpr));
    RocCurve { fpr, tpr, auc }
}

/// Trapezoidal area under a curve given by monotone `x`.
pub fn auc(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[1] + ys[0]) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_unit_area() {
        let curve = roc_curve(&[true, true, false, false], &[0.9, 0.8, 0.3, 0.1]);
        assert_eq!(curve.auc, Some(1.0));
        assert_eq!(curve.fpr.first(), Some(&0.0));
        assert_eq!(curve.tpr.last(), Some(&1.0));
        assert_eq!(curve.fpr.last(), Some(&1.0));
    }

    #[test]
    fn inverted_ranking_has_zero_area() {
        let curve = roc_curve(&[false, false, true, true], &[0.9, 0.8, 0.3, 0.1]);
        assert_eq!(curve.auc, Some(0.0));
    }

    #[test]
    fn tied_scores_collapse_into_one_point() {
        let curve = roc_curve(&[true, false, true, false], &[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(curve.fpr, vec![0.0, 1.0]);
        assert_eq!(curve.tpr, vec![0.0, 1.0]);
        assert_eq!(curve.auc, Some(0.5));
    }

    #[test]
    fn mixed_ranking_matches_hand_computed_area() {
        // Positives at 0.8 and 0.4, negatives at 0.6 and 0.2: 3 of 4 pairs ordered.
        let curve = roc_curve(&[true, false, true, false], &[0.8, 0.6, 0.4, 0.2]);
        assert!((curve.auc.unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn single_class_has_no_area() {
        let curve = roc_curve(&[true, true], &[0.2, 0.9]);
        assert_eq!(curve.auc, None);
        let curve = roc_curve(&[false, true], &[0.2, f64::NAN]);
        assert_eq!(curve.auc, None);
    }
}
