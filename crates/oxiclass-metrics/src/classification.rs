use std::fmt;

use oxiclass_core::{MlError, MlResult, Tensor};
use serde::Serialize;

fn check_lengths(y_true: &[usize], y_pred: &[usize]) -> MlResult<usize> {
    if y_true.len() != y_pred.len() {
        return Err(MlError::LabelMismatch {
            samples: y_true.len(),
            labels: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MlError::EmptyInput);
    }
    Ok(y_true.len())
}

/// Fraction of predictions equal to the true label.
pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> MlResult<f64> {
    let n = check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / n as f64)
}

/// `matrix[t][p]` counts samples of true class `t` predicted as `p`.
pub fn confusion_matrix(
    y_true: &[usize],
    y_pred: &[usize],
    n_classes: usize,
) -> MlResult<Vec<Vec<usize>>> {
    check_lengths(y_true, y_pred)?;
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        let bad = t.max(p);
        if bad >= n_classes {
            return Err(MlError::IndexOutOfBounds {
                index: bad,
                axis: 0,
                size: n_classes,
            });
        }
        matrix[t][p] += 1;
    }
    Ok(matrix)
}

/// Per-class precision, recall, F1 and support.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScores {
    pub class: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class.
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Precision, recall and F1 for each class; undefined ratios are 0.
pub fn precision_recall_f1(
    y_true: &[usize],
    y_pred: &[usize],
    n_classes: usize,
) -> MlResult<Vec<ClassScores>> {
    let cm = confusion_matrix(y_true, y_pred, n_classes)?;
    Ok((0..n_classes)
        .map(|c| {
            let tp = cm[c][c];
            let predicted: usize = cm.iter().map(|row| row[c]).sum();
            let support: usize = cm[c].iter().sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassScores {
                class: c,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect())
}

/// Unweighted mean of per-class precision, recall and F1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Averages {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn average(scores: &[ClassScores], weighted: bool) -> Averages {
    let weights: Vec<f64> = scores
        .iter()
        .map(|s| if weighted { s.support as f64 } else { 1.0 })
        .collect();
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return Averages {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }
    let mean = |f: fn(&ClassScores) -> f64| {
        scores.iter().zip(&weights).map(|(s, w)| f(s) * w).sum::<f64>() / total
    };
    Averages {
        precision: mean(|s| s.precision),
        recall: mean(|s| s.recall),
        f1: mean(|s| s.f1),
    }
}

pub fn macro_average(scores: &[ClassScores]) -> Averages {
    average(scores, false)
}

/// Averages weighted by class support.
pub fn weighted_average(scores: &[ClassScores]) -> Averages {
    average(scores, true)
}

pub fn f1_macro(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> MlResult<f64> {
    Ok(macro_average(&precision_recall_f1(y_true, y_pred, n_classes)?).f1)
}

/// Mean negative log-probability of the true class, probabilities clipped
/// to `[1e-15, 1 - 1e-15]`.
pub fn log_loss(y_true: &[usize], proba: &Tensor<f64>) -> MlResult<f64> {
    let n = proba.n_rows()?;
    let k = proba.n_cols()?;
    if n != y_true.len() {
        return Err(MlError::LabelMismatch {
            samples: n,
            labels: y_true.len(),
        });
    }
    if n == 0 {
        return Err(MlError::EmptyInput);
    }
    let eps = 1e-15;
    let mut total = 0.0;
    for (row, &c) in proba.rows()?.zip(y_true) {
        if c >= k {
            return Err(MlError::IndexOutOfBounds {
                index: c,
                axis: 1,
                size: k,
            });
        }
        total -= row[c].clamp(eps, 1.0 - eps).ln();
    }
    Ok(total / n as f64)
}

/// Cohen's kappa: agreement corrected for chance.
pub fn cohen_kappa(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> MlResult<f64> {
    let cm = confusion_matrix(y_true, y_pred, n_classes)?;
    let n = y_true.len() as f64;
    let observed = (0..n_classes).map(|c| cm[c][c]).sum::<usize>() as f64 / n;
    let expected: f64 = (0..n_classes)
        .map(|c| {
            let row: usize = cm[c].iter().sum();
            let col: usize = cm.iter().map(|r| r[c]).sum();
            row as f64 * col as f64
        })
        .sum::<f64>()
        / (n * n);
    if (1.0 - expected).abs() < f64::EPSILON {
        return Ok(if (observed - 1.0).abs() < f64::EPSILON {
            1.0
        } else {
            0.0
        });
    }
    Ok((observed - expected) / (1.0 - expected))
}

/// Per-class scores plus overall accuracy and averages.
///
/// `Display` renders the familiar text table.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub class_names: Vec<String>,
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: Averages,
    pub weighted_avg: Averages,
    pub total_support: usize,
}

/// Build a report; `class_names[k]` labels class `k`.
pub fn classification_report(
    y_true: &[usize],
    y_pred: &[usize],
    class_names: &[String],
) -> MlResult<ClassificationReport> {
    let classes = precision_recall_f1(y_true, y_pred, class_names.len())?;
    Ok(ClassificationReport {
        class_names: class_names.to_vec(),
        accuracy: accuracy_score(y_true, y_pred)?,
        macro_avg: macro_average(&classes),
        weighted_avg: weighted_average(&classes),
        total_support: y_true.len(),
        classes,
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .class_names
            .iter()
            .map(String::len)
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, s) in self.class_names.iter().zip(&self.classes) {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, s.precision, s.recall, s.f1, s.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support
        )?;
        for (label, avg) in [("macro avg", self.macro_avg), ("weighted avg", self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, avg.precision, avg.recall, avg.f1, self.total_support
            )?;
        }
        Ok(())
    }
}
