// THEORY:
// The `shape` module describes where a region sits in the frame and how it is
// spread out, using only its pixel coordinates.
//
// Per region it produces seven numbers:
// - the centroid (mean row, mean col), integer-divided by the pixel count and then
//   normalized by the image height and width;
// - the 10th and 90th percentile of the rows and of the cols, each axis sorted on
//   its own (rows and cols are not kept paired), normalized the same way;
// - the aspect ratio `(max_row - min_row) / (max_col - min_col + eps)`, where the
//   additive `eps` keeps single-column regions finite.
//
// The unnormalized float centroid is kept as well: the spatial affinity kernel is
// defined in pixel units, not in normalized coordinates.

use crate::core_modules::region::Region;

/// Percentile positions and guards for the shape descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeParams {
    pub low_percentile: f64,
    pub high_percentile: f64,
    /// Added to the column extent before dividing; 1.0 by default.
    pub ratio_epsilon: f64,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            low_percentile: 0.1,
            high_percentile: 0.9,
            ratio_epsilon: 1.0,
        }
    }
}

/// Position and extent of one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeDescriptor {
    /// Normalized `(row, col)` centroid.
    pub centroid: (f64, f64),
    /// Normalized row at the low percentile.
    pub low_row: f64,
    /// Normalized col at the low percentile.
    pub low_col: f64,
    /// Normalized row at the high percentile.
    pub high_row: f64,
    /// Normalized col at the high percentile.
    pub high_col: f64,
    pub aspect_ratio: f64,
    /// `(row, col)` centroid in pixel units, not rounded.
    pub raw_centroid: (f64, f64),
}

impl ShapeDescriptor {
    pub fn compute(region: &Region, height: u32, width: u32, params: &ShapeParams) -> Self {
        let count = region.len();
        let height = height as f64;
        let width = width as f64;

        let row_sum: u64 = region.rows().iter().map(|&r| r as u64).sum();
        let col_sum: u64 = region.cols().iter().map(|&c| c as u64).sum();
        let count_u64 = count.max(1) as u64;

        let mut rows = region.rows().to_vec();
        let mut cols = region.cols().to_vec();
        rows.sort_unstable();
        cols.sort_unstable();

        let low = percentile_index(count, params.low_percentile);
        let high = percentile_index(count, params.high_percentile);

        let (min_row, max_row) = (rows.first().copied(), rows.last().copied());
        let (min_col, max_col) = (cols.first().copied(), cols.last().copied());
        let row_extent = max_row.zip(min_row).map_or(0, |(hi, lo)| hi - lo) as f64;
        let col_extent = max_col.zip(min_col).map_or(0, |(hi, lo)| hi - lo) as f64;

        Self {
            centroid: (
                (row_sum / count_u64) as f64 / height,
                (col_sum / count_u64) as f64 / width,
            ),
            low_row: rows.get(low).copied().unwrap_or(0) as f64 / height,
            low_col: cols.get(low).copied().unwrap_or(0) as f64 / width,
            high_row: rows.get(high).copied().unwrap_or(0) as f64 / height,
            high_col: cols.get(high).copied().unwrap_or(0) as f64 / width,
            aspect_ratio: row_extent / (col_extent + params.ratio_epsilon),
            raw_centroid: (
                row_sum as f64 / count_u64 as f64,
                col_sum as f64 / count_u64 as f64,
            ),
        }
    }

    /// The seven descriptor fields in feature order.
    pub fn fields(&self) -> [f64; 7] {
        [
            self.centroid.0,
            self.centroid.1,
            self.low_row,
            self.low_col,
            self.high_row,
            self.high_col,
            self.aspect_ratio,
        ]
    }
}

/// `floor(fraction * count)`, clamped into the sorted sequence.
fn percentile_index(count: usize, fraction: f64) -> usize {
    ((count as f64 * fraction).floor() as usize).min(count.saturating_sub(1))
}
