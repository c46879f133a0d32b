use oxiclass_core::{MlError, MlResult, Tensor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Encode string labels as class indices `0..n_classes` (sorted order).
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
    class_to_idx: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit<S: AsRef<str>>(&mut self, labels: &[S]) {
        let unique: BTreeSet<&str> = labels.iter().map(|l| l.as_ref()).collect();
        self.classes = unique.into_iter().map(str::to_string).collect();
        self.class_to_idx = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
    }

    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> MlResult<Vec<usize>> {
        labels
            .iter()
            .map(|l| {
                self.class_to_idx
                    .get(l.as_ref())
                    .copied()
                    .ok_or_else(|| MlError::UnknownCategory {
                        column: 0,
                        value: l.as_ref().to_string(),
                    })
            })
            .collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, labels: &[S]) -> MlResult<Vec<usize>> {
        self.fit(labels);
        self.transform(labels)
    }

    pub fn inverse_transform(&self, encoded: &[usize]) -> MlResult<Vec<String>> {
        encoded
            .iter()
            .map(|&i| {
                self.classes.get(i).cloned().ok_or(MlError::IndexOutOfBounds {
                    index: i,
                    axis: 0,
                    size: self.classes.len(),
                })
            })
            .collect()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// What [`OneHotEncoder::transform`] does with a category it never saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Encode as an all-zero block.
    Ignore,
}

/// One-hot encode rows of categorical string values.
///
/// Column `c` with `k` distinct training values becomes `k` indicator
/// columns, ordered by sorted category value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub handle_unknown: HandleUnknown,
    pub categories: Option<Vec<Vec<String>>>,
}

impl OneHotEncoder {
    pub fn new(handle_unknown: HandleUnknown) -> Self {
        OneHotEncoder { handle_unknown, categories: None }
    }

    pub fn fit<S: AsRef<str>>(&mut self, rows: &[Vec<S>]) -> MlResult<()> {
        let n_cols = rows.first().ok_or(MlError::EmptyInput)?.len();
        let mut seen: Vec<BTreeSet<String>> = vec![BTreeSet::new(); n_cols];
        for row in rows {
            if row.len() != n_cols {
                return Err(MlError::ShapeMismatch {
                    expected: vec![n_cols],
                    got: vec![row.len()],
                });
            }
            for (set, value) in seen.iter_mut().zip(row) {
                set.insert(value.as_ref().to_string());
            }
        }
        self.categories = Some(seen.into_iter().map(|s| s.into_iter().collect()).collect());
        Ok(())
    }

    fn fitted(&self) -> MlResult<&[Vec<String>]> {
        self.categories.as_deref().ok_or(MlError::NotFitted("OneHotEncoder"))
    }

    /// Total number of output columns.
    pub fn n_output_features(&self) -> MlResult<usize> {
        Ok(self.fitted()?.iter().map(Vec::len).sum())
    }

    pub fn transform<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> MlResult<Tensor<f64>> {
        let categories = self.fitted()?;
        let width = self.n_output_features()?;
        let mut data = vec![0.0; rows.len() * width];

        for (i, row) in rows.iter().enumerate() {
            if row.len() != categories.len() {
                return Err(MlError::ShapeMismatch {
                    expected: vec![categories.len()],
                    got: vec![row.len()],
                });
            }
            let mut offset = 0;
            for (c, (cats, value)) in categories.iter().zip(row).enumerate() {
                let value = value.as_ref();
                match cats.binary_search_by(|probe| probe.as_str().cmp(value)) {
                    Ok(k) => data[i * width + offset + k] = 1.0,
                    Err(_) if self.handle_unknown == HandleUnknown::Ignore => {}
                    Err(_) => {
                        return Err(MlError::UnknownCategory {
                            column: c,
                            value: value.to_string(),
                        })
                    }
                }
                offset += cats.len();
            }
        }

        Tensor::new(data, vec![rows.len(), width])
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, rows: &[Vec<S>]) -> MlResult<Tensor<f64>> {
        self.fit(rows)?;
        self.transform(rows)
    }

    /// Output column names as `input=category`.
    pub fn feature_names<S: AsRef<str>>(&self, input_names: &[S]) -> MlResult<Vec<String>> {
        let categories = self.fitted()?;
        if input_names.len() != categories.len() {
            return Err(MlError::ShapeMismatch {
                expected: vec![categories.len()],
                got: vec![input_names.len()],
            });
        }
        Ok(categories
            .iter()
            .zip(input_names)
            .flat_map(|(cats, name)| cats.iter().map(move |c| format!("{}={}", name.as_ref(), c)))
            .collect())
    }
}

/// One-hot encode class indices into a `[n, n_classes]` indicator matrix.
pub fn one_hot_encode(labels: &[usize], n_classes: usize) -> MlResult<Tensor<f64>> {
    let mut data = vec![0.0; labels.len() * n_classes];
    for (i, &cls) in labels.iter().enumerate() {
        if cls >= n_classes {
            return Err(MlError::IndexOutOfBounds {
                index: cls,
                axis: 1,
                size: n_classes,
            });
        }
        data[i * n_classes + cls] = 1.0;
    }
    Tensor::new(data, vec![labels.len(), n_classes])
}
