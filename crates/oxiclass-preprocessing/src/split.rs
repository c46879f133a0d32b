use oxiclass_core::validation::{check_xy, n_classes_of, seeded_rng};
use oxiclass_core::{MlError, MlResult, Tensor};
use rand::seq::SliceRandom;
use tracing::debug;

/// Disjoint train/test partitions of a dataset.
///
/// `train_indices` and `test_indices` refer to rows of the original
/// matrix; together they cover every row exactly once.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Tensor<f64>,
    pub x_test: Tensor<f64>,
    pub y_train: Vec<usize>,
    pub y_test: Vec<usize>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

fn check_ratio(test_ratio: f64) -> MlResult<()> {
    if test_ratio > 0.0 && test_ratio < 1.0 {
        Ok(())
    } else {
        Err(MlError::InvalidParameter {
            name: "test_ratio",
            reason: format!("{} not in (0, 1)", test_ratio),
        })
    }
}

fn assemble(
    x: &Tensor<f64>,
    y: &[usize],
    train_indices: Vec<usize>,
    test_indices: Vec<usize>,
) -> MlResult<Split> {
    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(MlError::InvalidParameter {
            name: "test_ratio",
            reason: format!(
                "split of {} samples leaves {} train / {} test rows",
                y.len(),
                train_indices.len(),
                test_indices.len()
            ),
        });
    }
    debug!(train = train_indices.len(), test = test_indices.len(), "split dataset");
    Ok(Split {
        x_train: x.select_rows(&train_indices)?,
        x_test: x.select_rows(&test_indices)?,
        y_train: train_indices.iter().map(|&i| y[i]).collect(),
        y_test: test_indices.iter().map(|&i| y[i]).collect(),
        train_indices,
        test_indices,
    })
}

/// Shuffle rows and split off `ceil(n * test_ratio)` of them as the test set.
///
/// The same seed always yields the same partition.
pub fn train_test_split(
    x: &Tensor<f64>,
    y: &[usize],
    test_ratio: f64,
    seed: Option<u64>,
) -> MlResult<Split> {
    check_ratio(test_ratio)?;
    let (n, _) = check_xy(x, y)?;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = seeded_rng(seed);
    indices.shuffle(&mut rng);

    let test_size = (n as f64 * test_ratio).ceil() as usize;
    let train_indices = indices.split_off(test_size);
    assemble(x, y, train_indices, indices)
}

/// Like [`train_test_split`], but each class contributes
/// `round(count * test_ratio)` rows to the test set so both partitions keep
/// the class proportions of `y`.
pub fn train_test_split_stratified(
    x: &Tensor<f64>,
    y: &[usize],
    test_ratio: f64,
    seed: Option<u64>,
) -> MlResult<Split> {
    check_ratio(test_ratio)?;
    check_xy(x, y)?;

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes_of(y)];
    for (i, &c) in y.iter().enumerate() {
        by_class[c].push(i);
    }

    let mut rng = seeded_rng(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();
    for mut members in by_class {
        members.shuffle(&mut rng);
        let k = (members.len() as f64 * test_ratio).round() as usize;
        test_indices.extend_from_slice(&members[..k]);
        train_indices.extend_from_slice(&members[k..]);
    }
    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    assemble(x, y, train_indices, test_indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn toy(n: usize) -> (Tensor<f64>, Vec<usize>) {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let y = (0..n).map(|i| i % 2).collect();
        (Tensor::from_vec2d(&rows).unwrap(), y)
    }

    #[test]
    fn test_train_test_split_sizes() {
        let (x, y) = toy(5);
        let split = train_test_split(&x, &y, 0.4, Some(42)).unwrap();
        assert_eq!(split.x_train.shape_vec(), vec![3, 2]);
        assert_eq!(split.x_test.shape_vec(), vec![2, 2]);
        assert_eq!(split.y_train.len(), 3);
        assert_eq!(split.y_test.len(), 2);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let (x, y) = toy(50);
        let split = train_test_split(&x, &y, 0.25, Some(7)).unwrap();
        let train: HashSet<usize> = split.train_indices.iter().copied().collect();
        let test: HashSet<usize> = split.test_indices.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 50);

        // Rows travel with their labels.
        for (k, &i) in split.test_indices.iter().enumerate() {
            assert_eq!(split.x_test.row(k).unwrap()[0], i as f64);
            assert_eq!(split.y_test[k], y[i]);
        }
    }

    #[test]
    fn test_same_seed_same_split() {
        let (x, y) = toy(30);
        let a = train_test_split(&x, &y, 0.3, Some(1)).unwrap();
        let b = train_test_split(&x, &y, 0.3, Some(1)).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
        let c = train_test_split(&x, &y, 0.3, Some(2)).unwrap();
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_invalid_ratio_and_sizes() {
        let (x, y) = toy(4);
        assert!(train_test_split(&x, &y, 0.0, Some(1)).is_err());
        assert!(train_test_split(&x, &y, 1.0, Some(1)).is_err());
        assert!(train_test_split(&x, &y[..3], 0.5, Some(1)).is_err());

        let (one, y1) = toy(1);
        assert!(train_test_split(&one, &y1, 0.5, Some(1)).is_err());
    }

    #[test]
    fn test_stratified_keeps_proportions() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let x = Tensor::from_vec2d(&rows).unwrap();
        // 30 of class 0, 10 of class 1
        let y: Vec<usize> = (0..40).map(|i| usize::from(i >= 30)).collect();
        let split = train_test_split_stratified(&x, &y, 0.2, Some(3)).unwrap();
        let test_ones = split.y_test.iter().filter(|&&c| c == 1).count();
        assert_eq!(split.y_test.len(), 8);
        assert_eq!(test_ones, 2);
        assert_eq!(split.y_train.len(), 32);
    }
}
