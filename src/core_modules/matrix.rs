// THEORY:
// `SymmetricMatrix` is the dense n x n container behind both the spatial affinity
// matrix and every pairwise difference matrix. Both are symmetric by definition,
// so construction evaluates only the upper triangle (diagonal included), one row
// per parallel task, and mirrors it into the lower triangle. Once built the matrix
// is read-only.

use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricMatrix {
    size: usize,
    data: Vec<f64>,
}

impl SymmetricMatrix {
    /// Builds the matrix from `cell(i, j)`, which is only called for `i <= j`.
    pub fn from_upper<F>(size: usize, cell: F) -> Self
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let upper: Vec<Vec<f64>> = (0..size)
            .into_par_iter()
            .map(|i| (i..size).map(|j| cell(i, j)).collect())
            .collect();

        let mut data = vec![0.0; size * size];
        for (i, row) in upper.iter().enumerate() {
            for (offset, &value) in row.iter().enumerate() {
                let j = i + offset;
                data[i * size + j] = value;
                data[j * size + i] = value;
            }
        }
        Self { size, data }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// Row-major copy as nested vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.size.max(1)).map(<[f64]>::to_vec).collect()
    }

    /// `sum_j self[i][j] * other[i][j]` for row `i`.
    pub fn weighted_row_sum(&self, other: &SymmetricMatrix, i: usize) -> f64 {
        self.row(i).iter().zip(other.row(i)).map(|(a, b)| a * b).sum()
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| (i + 1..self.size).all(|j| self.get(i, j) == self.get(j, i)))
    }
}
