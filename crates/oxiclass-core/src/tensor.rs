use crate::dtype::Float;
use crate::error::{MlError, MlResult};
use crate::shape::Shape;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense row-major tensor: the feature matrix type of oxiclass.
///
/// Stores data in a flat contiguous `Vec<T>`. Feature matrices are rank 2
/// with shape `[n_samples, n_features]`; one sample per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> MlResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(MlError::ShapeMismatch {
                expected: s.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape: s })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ZERO)
    }

    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![value; s.numel()],
            shape: s,
        }
    }

    /// 1-D tensor from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// 2-D tensor from a list of equally long rows.
    pub fn from_vec2d(rows: &[Vec<T>]) -> MlResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(MlError::ShapeMismatch {
                    expected: vec![n_cols],
                    got: vec![row.len()],
                });
            }
            data.extend_from_slice(row);
        }
        Tensor::new(data, vec![n_rows, n_cols])
    }

    /// Concatenate matrices with the same number of rows side by side.
    pub fn hstack(blocks: &[&Tensor<T>]) -> MlResult<Self> {
        let first = blocks.first().ok_or(MlError::EmptyInput)?;
        let n_rows = first.n_rows()?;
        let mut n_cols = 0;
        for b in blocks {
            let rows = b.n_rows()?;
            if rows != n_rows {
                return Err(MlError::ShapeMismatch {
                    expected: vec![n_rows, b.n_cols()?],
                    got: b.shape_vec(),
                });
            }
            n_cols += b.n_cols()?;
        }

        let mut data = Vec::with_capacity(n_rows * n_cols);
        for i in 0..n_rows {
            for b in blocks {
                data.extend_from_slice(b.row(i)?);
            }
        }
        Tensor::new(data, vec![n_rows, n_cols])
    }
}

// ─── Accessors ──────────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    fn require_matrix(&self) -> MlResult<()> {
        if self.shape.is_matrix() {
            Ok(())
        } else {
            Err(MlError::InvalidOperation(format!(
                "expected a 2-D [samples, features] matrix, got shape {}",
                self.shape
            )))
        }
    }

    /// Number of samples (rows) of a matrix.
    pub fn n_rows(&self) -> MlResult<usize> {
        self.require_matrix()?;
        self.shape.dim(0)
    }

    /// Number of features (columns) of a matrix.
    pub fn n_cols(&self) -> MlResult<usize> {
        self.require_matrix()?;
        self.shape.dim(1)
    }

    fn flat_index(&self, indices: &[usize]) -> MlResult<usize> {
        if indices.len() != self.ndim() {
            return Err(MlError::ShapeMismatch {
                expected: self.shape_vec(),
                got: indices.to_vec(),
            });
        }
        let mut idx = 0;
        for (axis, (&i, &size)) in indices.iter().zip(self.shape.dims()).enumerate() {
            if i >= size {
                return Err(MlError::IndexOutOfBounds {
                    index: i,
                    axis,
                    size,
                });
            }
            idx = idx * size + i;
        }
        Ok(idx)
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> MlResult<T> {
        let idx = self.flat_index(indices)?;
        Ok(self.data[idx])
    }

    pub fn set(&mut self, indices: &[usize], value: T) -> MlResult<()> {
        let idx = self.flat_index(indices)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Borrow row `i` of a matrix.
    pub fn row(&self, i: usize) -> MlResult<&[T]> {
        let rows = self.n_rows()?;
        let cols = self.n_cols()?;
        if i >= rows {
            return Err(MlError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: rows,
            });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Iterate over the rows of a matrix.
    ///
    /// A matrix with zero columns yields no rows.
    pub fn rows(&self) -> MlResult<std::slice::ChunksExact<'_, T>> {
        let cols = self.n_cols()?.max(1);
        Ok(self.data.chunks_exact(cols))
    }

    /// Copy out column `j` of a matrix.
    pub fn col(&self, j: usize) -> MlResult<Vec<T>> {
        let cols = self.n_cols()?;
        if j >= cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: cols,
            });
        }
        Ok(self.rows()?.map(|r| r[j]).collect())
    }

    /// Gather the given rows (in order, repeats allowed) into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> MlResult<Tensor<T>> {
        let cols = self.n_cols()?;
        let mut data = Vec::with_capacity(indices.len() * cols);
        for &i in indices {
            data.extend_from_slice(self.row(i)?);
        }
        Tensor::new(data, vec![indices.len(), cols])
    }

    /// Gather the given columns (in order) into a new matrix.
    pub fn select_cols(&self, indices: &[usize]) -> MlResult<Tensor<T>> {
        let rows = self.n_rows()?;
        let cols = self.n_cols()?;
        if let Some(&bad) = indices.iter().find(|&&j| j >= cols) {
            return Err(MlError::IndexOutOfBounds {
                index: bad,
                axis: 1,
                size: cols,
            });
        }
        let mut data = Vec::with_capacity(rows * indices.len());
        for row in self.rows()? {
            data.extend(indices.iter().map(|&j| row[j]));
        }
        Tensor::new(data, vec![rows, indices.len()])
    }
}

// ─── Element-wise ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    /// Apply `f(value, column)` to every element of a matrix.
    pub fn apply_columns<F: Fn(T, usize) -> T>(&self, f: F) -> MlResult<Tensor<T>> {
        let cols = self.n_cols()?;
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(k, &x)| f(x, k % cols.max(1)))
            .collect();
        Ok(Tensor {
            data,
            shape: self.shape.clone(),
        })
    }

    pub fn has_nan(&self) -> bool {
        self.data.iter().any(|x| x.is_nan())
    }
}

// ─── Reductions ─────────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    pub fn mean_all(&self) -> MlResult<T> {
        if self.data.is_empty() {
            return Err(MlError::EmptyInput);
        }
        Ok(self.sum_all() / T::from_usize(self.data.len()))
    }

    /// Column means of a matrix.
    pub fn mean_axis0(&self) -> MlResult<Vec<T>> {
        let rows = self.n_rows()?;
        if rows == 0 {
            return Err(MlError::EmptyInput);
        }
        let mut sums = vec![T::ZERO; self.n_cols()?];
        for row in self.rows()? {
            for (s, &v) in sums.iter_mut().zip(row) {
                *s += v;
            }
        }
        let n = T::from_usize(rows);
        Ok(sums.into_iter().map(|s| s / n).collect())
    }

    /// Population variance (ddof = 0) of each column.
    pub fn var_axis0(&self) -> MlResult<Vec<T>> {
        let mean = self.mean_axis0()?;
        let mut acc = vec![T::ZERO; mean.len()];
        for row in self.rows()? {
            for ((a, &v), &m) in acc.iter_mut().zip(row).zip(&mean) {
                let d = v - m;
                *a += d * d;
            }
        }
        let n = T::from_usize(self.n_rows()?);
        Ok(acc.into_iter().map(|a| a / n).collect())
    }

    pub fn std_axis0(&self) -> MlResult<Vec<T>> {
        Ok(self.var_axis0()?.into_iter().map(|v| v.sqrt()).collect())
    }

    pub fn min_axis0(&self) -> MlResult<Vec<T>> {
        self.fold_axis0(T::INFINITY, |acc, v| acc.min(v))
    }

    pub fn max_axis0(&self) -> MlResult<Vec<T>> {
        self.fold_axis0(T::NEG_INFINITY, |acc, v| acc.max(v))
    }

    fn fold_axis0<F: Fn(T, T) -> T>(&self, init: T, f: F) -> MlResult<Vec<T>> {
        if self.n_rows()? == 0 {
            return Err(MlError::EmptyInput);
        }
        let mut acc = vec![init; self.n_cols()?];
        for row in self.rows()? {
            for (a, &v) in acc.iter_mut().zip(row) {
                *a = f(*a, v);
            }
        }
        Ok(acc)
    }
}

// ─── Display ────────────────────────────────────────────────────────────────

impl<T: Float> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.shape.is_matrix() {
            let items: Vec<String> = self.data.iter().map(|v| format!("{:.4}", v)).collect();
            return write!(f, "Tensor{}[{}]", self.shape, items.join(", "));
        }
        writeln!(f, "Tensor{} [", self.shape)?;
        let cols = self.shape.dims()[1].max(1);
        for row in self.data.chunks(cols) {
            let items: Vec<String> = row.iter().map(|v| format!("{:>9.4}", v)).collect();
            writeln!(f, "  [{}]", items.join(", "))?;
        }
        write!(f, "]")
    }
}
