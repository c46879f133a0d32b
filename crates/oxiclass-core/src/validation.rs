//! Input checks shared by the estimators.

use crate::error::{MlError, MlResult};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Validate a training pair and return `(n_samples, n_features)`.
pub fn check_xy(x: &Tensor<f64>, y: &[usize]) -> MlResult<(usize, usize)> {
    let n = x.n_rows()?;
    let p = x.n_cols()?;
    if n == 0 {
        return Err(MlError::EmptyInput);
    }
    if n != y.len() {
        return Err(MlError::LabelMismatch {
            samples: n,
            labels: y.len(),
        });
    }
    Ok((n, p))
}

/// Check that `x` has the feature count the model was fitted with.
pub fn check_n_features(x: &Tensor<f64>, expected: usize) -> MlResult<usize> {
    let p = x.n_cols()?;
    if p != expected {
        return Err(MlError::ShapeMismatch {
            expected: vec![x.n_rows()?, expected],
            got: x.shape_vec(),
        });
    }
    x.n_rows()
}

/// Number of classes implied by a label vector (`max + 1`).
pub fn n_classes_of(y: &[usize]) -> usize {
    y.iter().max().map(|&m| m + 1).unwrap_or(0)
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Normalise each row of a non-negative score matrix to sum to one.
/// All-zero rows become uniform.
pub fn normalize_rows(scores: &mut [f64], n_classes: usize) {
    for row in scores.chunks_mut(n_classes.max(1)) {
        let total: f64 = row.iter().sum();
        if total > 0.0 {
            row.iter_mut().for_each(|v| *v /= total);
        } else {
            let u = 1.0 / row.len() as f64;
            row.iter_mut().for_each(|v| *v = u);
        }
    }
}

/// Numerically stable softmax of one row, in place.
pub fn softmax_in_place(row: &mut [f64]) {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in row.iter_mut() {
        *v /= sum;
    }
}

/// Seeded RNG, or an entropy-seeded one when no seed is given.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// One draw from N(0, 1) via Box-Muller.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
