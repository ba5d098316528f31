// THEORY:
// The `affinity` module expresses spatial proximity between regions. It builds
// two independent products that deliberately use different coordinate scales:
//
// 1.  **Affinity matrix**: a Gaussian kernel over the raw pixel-space centroids,
//     `W[i][j] = exp(-|c_i - c_j|^2 / bandwidth)` with `bandwidth = 2`. The diagonal
//     is exactly 1 and the matrix is symmetric by construction. With pixel units the
//     kernel is very narrow: only regions whose centroids are a few pixels apart
//     get a weight noticeably above zero.
// 2.  **Neighbour density**: per region, `sum_j exp(-|c_i - c_j|^2 / sigma)` over
//     the normalized centroids with `sigma = 0.4`, then divided by `H * W`. The sum
//     includes the region itself.

use crate::core_modules::matrix::SymmetricMatrix;
use rayon::prelude::*;

/// Kernel widths of the two spatial products.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffinityParams {
    /// Divisor of the squared pixel distance in the affinity kernel.
    pub bandwidth: f64,
    /// Divisor of the squared normalized distance in the density kernel.
    pub neighbor_sigma: f64,
}

impl Default for AffinityParams {
    fn default() -> Self {
        Self {
            bandwidth: 2.0,
            neighbor_sigma: 0.4,
        }
    }
}

fn squared_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

/// Gaussian affinity over raw `(row, col)` centroids in pixel units.
pub fn affinity_matrix(raw_centroids: &[(f64, f64)], params: &AffinityParams) -> SymmetricMatrix {
    SymmetricMatrix::from_upper(raw_centroids.len(), |i, j| {
        if i == j {
            1.0
        } else {
            (-squared_distance(raw_centroids[i], raw_centroids[j]) / params.bandwidth).exp()
        }
    })
}

/// Gaussian neighbour density over normalized centroids, divided by `pixel_count`.
pub fn neighbor_density(
    normalized_centroids: &[(f64, f64)],
    params: &AffinityParams,
    pixel_count: usize,
) -> Vec<f64> {
    let area = pixel_count as f64;
    normalized_centroids
        .par_iter()
        .map(|&ci| {
            normalized_centroids
                .iter()
                .map(|&cj| (-squared_distance(ci, cj) / params.neighbor_sigma).exp())
                .sum::<f64>()
                / area
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_is_one_and_matrix_symmetric() {
        let centroids = [(0.0, 0.0), (1.0, 1.0), (10.0, 3.0)];
        let w = affinity_matrix(&centroids, &AffinityParams::default());
        for i in 0..3 {
            assert_eq!(w.get(i, i), 1.0);
        }
        assert!(w.is_symmetric());
        // Distance^2 = 2 -> exp(-1).
        assert!((w.get(0, 1) - (-1.0f64).exp()).abs() < 1e-12);
        assert!(w.get(0, 2) < 1e-20);
    }

    #[test]
    fn density_counts_self_and_neighbours() {
        let centroids = [(0.5, 0.5), (0.5, 0.5)];
        let density = neighbor_density(&centroids, &AffinityParams::default(), 4);
        assert_eq!(density, vec![0.5, 0.5]);
    }

    #[test]
    fn density_decays_with_distance() {
        let centroids = [(0.0, 0.0), (0.0, 0.2), (1.0, 1.0)];
        let density = neighbor_density(&centroids, &AffinityParams::default(), 1);
        assert!(density[0] > density[2]);
        assert!(density[1] > density[2]);
    }
}
