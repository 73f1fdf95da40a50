//! Evaluation metrics for binary classifiers: weighted ROC curve and AUC.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("Cannot compute a ROC curve from zero events")]
    Empty,
    #[error("{what} has {actual} entries but there are {expected} labels")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// AUC is undefined when only one class is present.
    #[error("Only one class present in labels; ROC AUC is not defined")]
    SingleClass,
    #[error("Total {class} weight is {total}; it must be positive")]
    NonPositiveClassWeight { class: &'static str, total: f64 },
    /// Negative weights can make the false positive rate go backwards.
    #[error("ROC curve is neither increasing nor decreasing in false positive rate")]
    NonMonotonic,
    #[error("Scores and weights must be finite")]
    NonFinite,
}

/// ROC curve points, from the (0, 0) corner towards (1, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Score threshold of each point; the first is `+inf`.
    pub thresholds: Vec<f64>,
}

/// ROC curve together with its area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocResult {
    pub curve: RocCurve,
    pub auc: f64,
    /// True when the AUC came from plain trapezoidal integration of the curve
    /// because the strict computation failed.
    pub fallback: bool,
}

/// Weighted ROC curve.
///
/// Points are taken at every distinct score, then points lying on a straight
/// segment between their neighbours are dropped. Rates are NaN when a class
/// has zero total weight.
pub fn roc_curve(
    labels: ArrayView1<'_, f64>,
    scores: ArrayView1<'_, f64>,
    weights: Option<ArrayView1<'_, f64>>,
) -> Result<RocCurve, MetricsError> {
    let n = labels.len();
    if n == 0 {
        return Err(MetricsError::Empty);
    }
    check_len("scores", n, scores.len())?;
    let weights = match weights {
        Some(w) => {
            check_len("weights", n, w.len())?;
            w.to_owned()
        }
        None => Array1::ones(n),
    };

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut tps = Vec::new();
    let mut fps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut tp, mut fp) = (0.0, 0.0);
    for (pos, &idx) in order.iter().enumerate() {
        let w = weights[idx];
        if labels[idx] == 1.0 {
            tp += w;
        } else {
            fp += w;
        }
        let last_of_score = order
            .get(pos + 1)
            .is_none_or(|&next| scores[next] != scores[idx]);
        if last_of_score {
            tps.push(tp);
            fps.push(fp);
            thresholds.push(scores[idx]);
        }
    }

    if tps.len() > 2 {
        let keep: Vec<usize> = (0..tps.len())
            .filter(|&i| {
                i == 0
                    || i == tps.len() - 1
                    || second_diff(&fps, i) != 0.0
                    || second_diff(&tps, i) != 0.0
            })
            .collect();
        tps = keep.iter().map(|&i| tps[i]).collect();
        fps = keep.iter().map(|&i| fps[i]).collect();
        thresholds = keep.iter().map(|&i| thresholds[i]).collect();
    }

    tps.insert(0, 0.0);
    fps.insert(0, 0.0);
    thresholds.insert(0, f64::INFINITY);

    Ok(RocCurve {
        fpr: rates(&fps),
        tpr: rates(&tps),
        thresholds,
    })
}

/// Weighted area under the ROC curve.
pub fn roc_auc(
    labels: ArrayView1<'_, f64>,
    scores: ArrayView1<'_, f64>,
    weights: Option<ArrayView1<'_, f64>>,
) -> Result<f64, MetricsError> {
    check_auc_inputs(labels, scores, weights)?;
    let curve = roc_curve(labels, scores, weights)?;
    auc(&curve.fpr, &curve.tpr)
}

/// ROC curve plus AUC, falling back to [`trapezoid`] over the curve whenever
/// [`roc_auc`] would fail. Only malformed inputs (empty, mismatched lengths) error.
pub fn roc_with_auc(
    labels: ArrayView1<'_, f64>,
    scores: ArrayView1<'_, f64>,
    weights: Option<ArrayView1<'_, f64>>,
) -> Result<RocResult, MetricsError> {
    let curve = roc_curve(labels, scores, weights)?;
    let strict =
        check_auc_inputs(labels, scores, weights).and_then(|()| auc(&curve.fpr, &curve.tpr));
    let (auc, fallback) = match strict {
        Ok(auc) => (auc, false),
        Err(err) => {
            tracing::warn!("ROC AUC failed ({err}); integrating the curve directly");
            (trapezoid(&curve.tpr, &curve.fpr), true)
        }
    };
    Ok(RocResult {
        curve,
        auc,
        fallback,
    })
}

/// Both classes present, finite inputs and positive total weight per class.
fn check_auc_inputs(
    labels: ArrayView1<'_, f64>,
    scores: ArrayView1<'_, f64>,
    weights: Option<ArrayView1<'_, f64>>,
) -> Result<(), MetricsError> {
    let has_signal = labels.iter().any(|&l| l == 1.0);
    let has_background = labels.iter().any(|&l| l != 1.0);
    if !(has_signal && has_background) {
        return Err(MetricsError::SingleClass);
    }
    if scores.iter().any(|s| !s.is_finite())
        || weights.is_some_and(|w| w.iter().any(|x| !x.is_finite()))
    {
        return Err(MetricsError::NonFinite);
    }
    if let Some(w) = weights {
        let (mut sig, mut bkg) = (0.0, 0.0);
        for (&l, &x) in labels.iter().zip(w.iter()) {
            if l == 1.0 {
                sig += x;
            } else {
                bkg += x;
            }
        }
        if sig <= 0.0 {
            return Err(MetricsError::NonPositiveClassWeight {
                class: "signal",
                total: sig,
            });
        }
        if bkg <= 0.0 {
            return Err(MetricsError::NonPositiveClassWeight {
                class: "background",
                total: bkg,
            });
        }
    }
    Ok(())
}

/// Trapezoidal integral of `y` over `x`; signed, no monotonicity requirement.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

fn auc(x: &[f64], y: &[f64]) -> Result<f64, MetricsError> {
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(MetricsError::NonFinite);
    }
    let increasing = x.windows(2).all(|w| w[1] >= w[0]);
    let decreasing = x.windows(2).all(|w| w[1] <= w[0]);
    match (increasing, decreasing) {
        (true, _) => Ok(trapezoid(y, x)),
        (false, true) => Ok(-trapezoid(y, x)),
        (false, false) => Err(MetricsError::NonMonotonic),
    }
}

fn second_diff(values: &[f64], i: usize) -> f64 {
    values[i + 1] - 2.0 * values[i] + values[i - 1]
}

fn rates(cumulative: &[f64]) -> Vec<f64> {
    let total = cumulative.last().copied().unwrap_or(0.0);
    if total <= 0.0 {
        return vec![f64::NAN; cumulative.len()];
    }
    cumulative.iter().map(|c| c / total).collect()
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), MetricsError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MetricsError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn curve_matches_reference_example() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        let curve = roc_curve(y.view(), s.view(), None).unwrap();
        assert_eq!(curve.fpr, vec![0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_eq!(curve.tpr, vec![0.0, 0.5, 0.5, 1.0, 1.0]);
        assert_eq!(curve.thresholds[1..], [0.8, 0.4, 0.35, 0.1]);
        assert!(curve.thresholds[0].is_infinite());
        let auc = roc_auc(y.view(), s.view(), None).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn collinear_points_are_dropped() {
        let y = array![1.0, 1.0, 1.0, 0.0];
        let s = array![0.9, 0.8, 0.7, 0.1];
        let curve = roc_curve(y.view(), s.view(), None).unwrap();
        assert_eq!(curve.tpr, vec![0.0, 1.0 / 3.0, 1.0, 1.0]);
        assert_eq!(curve.fpr, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn weights_shift_the_area() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        let w = array![1.0, 3.0, 1.0, 1.0];
        let auc = roc_auc(y.view(), s.view(), Some(w.view())).unwrap();
        // Pairs ranked correctly: (0.8 over both) + (0.35 over 0.1) = (4 + 1) / 8.
        assert!((auc - 0.625).abs() < 1e-12);
    }

    #[test]
    fn combined_result_reuses_one_curve() {
        let y = array![0.0, 1.0, 0.0, 1.0, 1.0];
        let s = array![0.2, 0.9, 0.6, 0.4, 0.7];
        let w = array![2.0, 1.0, 0.5, 1.0, 3.0];
        let result = roc_with_auc(y.view(), s.view(), Some(w.view())).unwrap();
        assert!(!result.fallback);
        assert_eq!(result.curve, roc_curve(y.view(), s.view(), Some(w.view())).unwrap());
        assert_eq!(Ok(result.auc), roc_auc(y.view(), s.view(), Some(w.view())));
    }

    #[test]
    fn tied_scores_collapse_to_one_point() {
        let y = array![0.0, 1.0];
        let s = array![0.5, 0.5];
        let curve = roc_curve(y.view(), s.view(), None).unwrap();
        assert_eq!(curve.fpr, vec![0.0, 1.0]);
        assert_eq!(roc_auc(y.view(), s.view(), None), Ok(0.5));
    }

    #[test]
    fn negative_weights_fall_back_to_trapezoid() {
        let y = array![0.0, 1.0, 0.0, 1.0];
        let s = array![0.9, 0.8, 0.7, 0.6];
        let w = array![-1.0, 1.0, 2.0, 1.0];
        assert_eq!(
            roc_auc(y.view(), s.view(), Some(w.view())),
            Err(MetricsError::NonMonotonic)
        );
        let result = roc_with_auc(y.view(), s.view(), Some(w.view())).unwrap();
        assert!(result.fallback);
        assert!((result.auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_recovered_not_raised() {
        let y = array![1.0, 1.0];
        let s = array![0.2, 0.7];
        assert_eq!(roc_auc(y.view(), s.view(), None), Err(MetricsError::SingleClass));
        let result = roc_with_auc(y.view(), s.view(), None).unwrap();
        assert!(result.fallback);
        assert!(result.auc.is_nan());
    }

    #[test]
    fn mismatched_lengths_are_errors() {
        let y = array![1.0, 0.0];
        let s = array![0.2];
        assert!(matches!(
            roc_with_auc(y.view(), s.view(), None),
            Err(MetricsError::LengthMismatch { what: "scores", .. })
        ));
    }

    #[test]
    fn trapezoid_is_signed() {
        assert_eq!(trapezoid(&[1.0, 1.0], &[0.0, 2.0]), 2.0);
        assert_eq!(trapezoid(&[1.0, 1.0], &[2.0, 0.0]), -2.0);
    }
}
