//! Dense row-major matrices and rank-3 tensors.
//!
//! Storage is a flat `Vec<T>` with an explicit shape. Only the handful of
//! operations the generator needs are provided.

/// Row-major `rows x cols` matrix.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Matrix<T> {
    /// A matrix filled with `T::default()`.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }
}

impl<T> Matrix<T> {
    /// Wrap a flat buffer. Returns `None` if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// Build from a generator function `f(row, col)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Row `i` as a slice.
    ///
    /// Panics if `i >= rows`.
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        let c = self.cols;
        &mut self.data[i * c..(i + 1) * c]
    }

    pub fn row_iter(&self) -> impl Iterator<Item = &[T]> {
        // `chunks(0)` panics; a zero-column matrix yields `rows` empty rows.
        let cols = self.cols;
        (0..self.rows).map(move |i| &self.data[i * cols..(i + 1) * cols])
    }
}

impl<T: Copy> Matrix<T> {
    /// Element `(i, j)`. Panics when out of bounds.
    pub fn get(&self, i: usize, j: usize) -> T {
        assert!(j < self.cols, "column {j} out of bounds ({})", self.cols);
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, v: T) {
        assert!(j < self.cols, "column {j} out of bounds ({})", self.cols);
        self.data[i * self.cols + j] = v;
    }

    /// Keep columns `start..` (used to strip reserved / unobserved dimensions).
    pub fn columns_from(&self, start: usize) -> Self {
        let start = start.min(self.cols);
        let cols = self.cols - start;
        Self::from_fn(self.rows, cols, |i, j| self.get(i, start + j))
    }

    /// Column `j` as an owned vector.
    pub fn column(&self, j: usize) -> Vec<T> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }
}

impl Matrix<f64> {
    /// Identity matrix (one-hot rows).
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 })
    }

    /// `self @ other^T`: `(r x k) @ (c x k)^T -> (r x c)`.
    ///
    /// Returns `None` on an inner-dimension mismatch.
    pub fn matmul_transposed(&self, other: &Matrix<f64>) -> Option<Matrix<f64>> {
        if self.cols != other.cols {
            return None;
        }
        Some(Matrix::from_fn(self.rows, other.rows, |i, j| {
            dot(self.row(i), other.row(j))
        }))
    }

    /// Mean of all entries (0.0 for an empty matrix).
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    let mut s = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        s += x * y;
    }
    s
}

/// Row-major rank-3 tensor with shape `(d0, d1, d2)`.
///
/// Element `(i, j, k)` lives at `(i * d1 + j) * d2 + k`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tensor3<T> {
    shape: (usize, usize, usize),
    data: Vec<T>,
}

impl<T: Clone + Default> Tensor3<T> {
    pub fn zeros(d0: usize, d1: usize, d2: usize) -> Self {
        Self {
            shape: (d0, d1, d2),
            data: vec![T::default(); d0 * d1 * d2],
        }
    }
}

impl<T> Tensor3<T> {
    pub fn from_fn(
        d0: usize,
        d1: usize,
        d2: usize,
        mut f: impl FnMut(usize, usize, usize) -> T,
    ) -> Self {
        let mut data = Vec::with_capacity(d0 * d1 * d2);
        for i in 0..d0 {
            for j in 0..d1 {
                for k in 0..d2 {
                    data.push(f(i, j, k));
                }
            }
        }
        Self {
            shape: (d0, d1, d2),
            data,
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        let (d0, d1, d2) = self.shape;
        assert!(
            i < d0 && j < d1 && k < d2,
            "index ({i}, {j}, {k}) out of bounds for shape {:?}",
            self.shape
        );
        (i * d1 + j) * d2 + k
    }
}

impl<T: Copy> Tensor3<T> {
    pub fn get(&self, i: usize, j: usize, k: usize) -> T {
        self.data[self.offset(i, j, k)]
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, v: T) {
        let o = self.offset(i, j, k);
        self.data[o] = v;
    }

    /// The `(d0 x d1)` slab at fixed last index `k`, i.e. `t[:, :, k]`.
    pub fn slab_last(&self, k: usize) -> Matrix<T> {
        let (d0, d1, _) = self.shape;
        Matrix::from_fn(d0, d1, |i, j| self.get(i, j, k))
    }

    /// The `(d1 x d2)` slab at fixed first index `i`, i.e. `t[i]`.
    pub fn slab_first(&self, i: usize) -> Matrix<T> {
        let (_, d1, d2) = self.shape;
        Matrix::from_fn(d1, d2, |j, k| self.get(i, j, k))
    }

    /// The fibre `t[i, :, k]`.
    pub fn fibre(&self, i: usize, k: usize) -> Vec<T> {
        (0..self.shape.1).map(|j| self.get(i, j, k)).collect()
    }

    /// Keep last-axis indices `start..`.
    pub fn last_from(&self, start: usize) -> Self {
        let (d0, d1, d2) = self.shape;
        let start = start.min(d2);
        Self::from_fn(d0, d1, d2 - start, |i, j, k| self.get(i, j, start + k))
    }
}
