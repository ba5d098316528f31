// THEORY:
// The `contrast` module is the sink of the feature engine. It turns any completed
// per-region feature into one saliency-proxy score per region.
//
// Key architectural principles:
// 1.  **Difference First**: A `DiffMatrix` holds the symmetric pairwise distance of
//     one feature between every two entries of a `RegionSet`. Three forms exist:
//     absolute difference of scalars, Euclidean distance of vectors, and a
//     chi-square-like distance of per-region histograms of a quantized map. The
//     diagonal is always zero.
// 2.  **Smoothed Histograms**: Histograms start with one count in every bin, and the
//     distance `sum 2 (h_i - h_j)^2 / (h_i + h_j + 1)` carries an extra `+1` in the
//     denominator. Neither guard ever lets a bin divide by zero.
// 3.  **Weighted Reduction**: `contrast_i = a_i * sum_j W_ij * Diff_ij`. The affinity
//     `W` and the area `a` must describe exactly the same entries as the
//     difference matrix, background included when present.
// 4.  **Background Row**: In `ContrastScope::BackgroundOnly` the set must end with
//     the background pseudo-region and only its row is reduced, giving one score:
//     how much the border band differs from everything else.

use crate::core_modules::error::{FeatureError, Result};
use crate::core_modules::matrix::SymmetricMatrix;
use crate::core_modules::region::{Region, RegionSet};
use image::GrayImage;
use rayon::prelude::*;

/// Which rows of the weighted difference matrix are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContrastScope {
    /// One score per real region.
    #[default]
    AllRegions,
    /// One score, for the background pseudo-region appended last.
    BackgroundOnly,
}

/// Symmetric pairwise feature differences with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffMatrix {
    matrix: SymmetricMatrix,
}

impl DiffMatrix {
    /// `Diff[i][j] = |v_i - v_j|`.
    pub fn scalar(values: &[f64]) -> Self {
        Self {
            matrix: SymmetricMatrix::from_upper(values.len(), |i, j| (values[i] - values[j]).abs()),
        }
    }

    /// `Diff[i][j] = ||v_i - v_j||_2`. All vectors must have the same length.
    pub fn euclidean(vectors: &[Vec<f64>]) -> Result<Self> {
        if let Some(first) = vectors.first() {
            if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
                return Err(FeatureError::DimensionMismatch {
                    what: "feature vector length",
                    expected: first.len(),
                    actual: bad.len(),
                });
            }
        }
        Ok(Self {
            matrix: SymmetricMatrix::from_upper(vectors.len(), |i, j| {
                vectors[i]
                    .iter()
                    .zip(&vectors[j])
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt()
            }),
        })
    }

    /// Chi-square-like distance between the smoothed histograms of `map` over
    /// every entry of `regions`.
    pub fn histogram(regions: &RegionSet<'_>, map: &GrayImage, bins: usize) -> Self {
        let histograms: Vec<Vec<f64>> = regions
            .to_vec()
            .par_iter()
            .map(|region| region_histogram(region, map, bins))
            .collect();
        Self::from_histograms(&histograms)
    }

    /// Distance between precomputed histograms of equal length.
    pub fn from_histograms(histograms: &[Vec<f64>]) -> Self {
        Self {
            matrix: SymmetricMatrix::from_upper(histograms.len(), |i, j| {
                if i == j {
                    0.0
                } else {
                    chi_square(&histograms[i], &histograms[j])
                }
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix.get(i, j)
    }

    pub fn matrix(&self) -> &SymmetricMatrix {
        &self.matrix
    }
}

/// Histogram of `map` over `region`, every bin starting at one.
///
/// Values at or above `bins` land in the last bin.
pub fn region_histogram(region: &Region, map: &GrayImage, bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let mut histogram = vec![1.0; bins];
    for (row, col) in region.pixels() {
        let value = map.get_pixel(col, row).0[0] as usize;
        histogram[value.min(bins - 1)] += 1.0;
    }
    histogram
}

fn chi_square(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| 2.0 * (x - y).powi(2) / (x + y + 1.0))
        .sum()
}

/// Reduces `diff` to contrast scores: `a_i * sum_j W_ij * Diff_ij`.
pub fn aggregate(
    diff: &DiffMatrix,
    affinity: &SymmetricMatrix,
    area: &[f64],
    scope: ContrastScope,
) -> Result<Vec<f64>> {
    let size = diff.size();
    if affinity.size() != size {
        return Err(FeatureError::DimensionMismatch {
            what: "affinity matrix size",
            expected: size,
            actual: affinity.size(),
        });
    }
    if area.len() != size {
        return Err(FeatureError::DimensionMismatch {
            what: "area vector length",
            expected: size,
            actual: area.len(),
        });
    }

    let score = |i: usize| area[i] * diff.matrix.weighted_row_sum(affinity, i);
    match scope {
        ContrastScope::AllRegions => Ok((0..size).into_par_iter().map(score).collect()),
        ContrastScope::BackgroundOnly => match size.checked_sub(1) {
            Some(last) => Ok(vec![score(last)]),
            None => Err(FeatureError::DimensionMismatch {
                what: "entries including background",
                expected: 1,
                actual: 0,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ones(size: usize) -> SymmetricMatrix {
        SymmetricMatrix::from_upper(size, |_, _| 1.0)
    }

    #[test]
    fn scalar_difference_is_symmetric_with_zero_diagonal() {
        let diff = DiffMatrix::scalar(&[1.0, 4.0, -2.0]);
        for i in 0..3 {
            assert_eq!(diff.get(i, i), 0.0);
            for j in 0..3 {
                assert_eq!(diff.get(i, j), diff.get(j, i));
            }
        }
        assert_eq!(diff.get(1, 2), 6.0);
    }

    #[test]
    fn euclidean_difference_of_vectors() {
        let diff = DiffMatrix::euclidean(&[vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(diff.get(0, 1), 5.0);
        assert!(DiffMatrix::euclidean(&[vec![0.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn identical_values_give_zero_contrast() {
        let diff = DiffMatrix::scalar(&[0.7; 4]);
        let contrast = aggregate(&diff, &ones(4), &[0.25; 4], ContrastScope::AllRegions).unwrap();
        assert_eq!(contrast, vec![0.0; 4]);
    }

    #[test]
    fn contrast_weights_by_affinity_and_area() {
        let diff = DiffMatrix::scalar(&[0.0, 2.0]);
        let affinity = SymmetricMatrix::from_upper(2, |i, j| if i == j { 1.0 } else { 0.5 });
        let contrast = aggregate(&diff, &affinity, &[0.25, 0.75], ContrastScope::AllRegions).unwrap();
        assert_eq!(contrast, vec![0.25, 0.75]);
    }

    #[test]
    fn background_scope_reduces_last_row_only() {
        let diff = DiffMatrix::scalar(&[1.0, 1.0, 3.0]);
        let contrast = aggregate(&diff, &ones(3), &[0.5, 0.5, 0.5], ContrastScope::BackgroundOnly).unwrap();
        assert_eq!(contrast, vec![2.0]);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let diff = DiffMatrix::scalar(&[1.0, 2.0]);
        assert!(aggregate(&diff, &ones(3), &[0.5, 0.5], ContrastScope::AllRegions).is_err());
        assert!(aggregate(&diff, &ones(2), &[0.5], ContrastScope::AllRegions).is_err());
        let empty = DiffMatrix::scalar(&[]);
        assert!(aggregate(&empty, &ones(0), &[], ContrastScope::BackgroundOnly).is_err());
    }

    #[test]
    fn identical_histograms_have_zero_distance() {
        // Two regions that see the same values, in different places.
        let map = GrayImage::from_fn(4, 1, |x, _| Luma([[7, 9, 9, 7][x as usize]]));
        let left = Region::from_pixels(&[(0, 0), (0, 1)]).unwrap();
        let right = Region::from_pixels(&[(0, 2), (0, 3)]).unwrap();
        let regions = [left, right];
        let diff = DiffMatrix::histogram(&RegionSet::real(&regions), &map, 256);
        assert_eq!(diff.get(0, 1), 0.0);

        let contrast = aggregate(&diff, &ones(2), &[0.5, 0.5], ContrastScope::AllRegions).unwrap();
        assert_eq!(contrast, vec![0.0, 0.0]);
    }

    #[test]
    fn histogram_distance_is_positive_for_different_content() {
        let map = GrayImage::from_fn(2, 1, |x, _| Luma([x as u8]));
        let regions = [
            Region::from_pixels(&[(0, 0)]).unwrap(),
            Region::from_pixels(&[(0, 1)]).unwrap(),
        ];
        let diff = DiffMatrix::histogram(&RegionSet::real(&regions), &map, 256);
        // Bins 0 and 1 hold (2, 1) and (1, 2): 2 * 2 * 1 / 4.
        assert_eq!(diff.get(0, 1), 1.0);
    }

    #[test]
    fn histograms_start_at_one() {
        let map = GrayImage::from_pixel(2, 1, Luma([3]));
        let region = Region::from_pixels(&[(0, 0), (0, 1)]).unwrap();
        let histogram = region_histogram(&region, &map, 10);
        assert_eq!(histogram.len(), 10);
        assert_eq!(histogram[3], 3.0);
        assert_eq!(histogram.iter().sum::<f64>(), 12.0);
    }
}
