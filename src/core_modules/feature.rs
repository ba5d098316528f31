// THEORY:
// `FeatureVector` is the fixed 34-field descriptor of one region, assembled from
// the outputs of the individual extractors. The field order is part of the
// contract with the downstream classifier and never changes:
//
//   0..2    centroid (row, col), normalized
//   2..6    low row, low col, high row, high col percentiles, normalized
//   6       aspect ratio
//   7       perimeter proxy
//   8       area
//   9..18   color variances, R G B L a b H S V
//   18..33  texture filter response variances, filters 0..15
//   33      local pattern code variance

use crate::core_modules::channel::Channel;
use crate::core_modules::filter_bank::TEXTURE_FILTER_COUNT;
use crate::core_modules::shape::ShapeDescriptor;

/// Width of one row of the feature matrix.
pub const FEATURE_WIDTH: usize = 7 + 2 + Channel::COUNT + TEXTURE_FILTER_COUNT + 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub shape: ShapeDescriptor,
    pub perimeter: f64,
    pub area: f64,
    pub color_variance: [f64; Channel::COUNT],
    pub texture_variance: [f64; TEXTURE_FILTER_COUNT],
    pub uniformity_variance: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_WIDTH] {
        let mut out = [0.0; FEATURE_WIDTH];
        out[..7].copy_from_slice(&self.shape.fields());
        out[7] = self.perimeter;
        out[8] = self.area;
        let color_end = 9 + Channel::COUNT;
        out[9..color_end].copy_from_slice(&self.color_variance);
        let texture_end = color_end + TEXTURE_FILTER_COUNT;
        out[color_end..texture_end].copy_from_slice(&self.texture_variance);
        out[texture_end] = self.uniformity_variance;
        out
    }
}

/// The n x 34 region-by-feature matrix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    rows: Vec<[f64; FEATURE_WIDTH]>,
}

impl FeatureMatrix {
    pub fn from_vectors(vectors: &[FeatureVector]) -> Self {
        Self {
            rows: vectors.iter().map(FeatureVector::to_array).collect(),
        }
    }

    pub fn region_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, region: usize) -> Option<&[f64; FEATURE_WIDTH]> {
        self.rows.get(region)
    }

    pub fn rows(&self) -> &[[f64; FEATURE_WIDTH]] {
        &self.rows
    }

    /// One feature across all regions.
    pub fn column(&self, field: usize) -> Vec<f64> {
        self.rows.iter().filter_map(|row| row.get(field).copied()).collect()
    }
}
