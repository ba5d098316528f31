// THEORY:
// The `background` module defines the border prior: a band of fixed width around
// the image edge that is assumed to be background. The band is listed as
//
// 1.  the top rows `[0, band)` and the bottom rows `[H - band, H)`, all columns;
// 2.  the left columns `[0, band)` and the right columns `[W - band, W)` for the
//     rows between those two strips only,
//
// so corner pixels appear once. When the image is narrower or shorter than twice
// the band, the strips are clipped where they meet instead of overlapping.
//
// The band becomes a pseudo-region that the contrast stage can append after the
// real regions, and it also tells which real regions touch the image border.
//
// Known discrepancy: an older variant of the color-contrast code listed the side
// strips over every row, counting the corner blocks twice. This module uses the
// de-duplicated definition.

use crate::core_modules::region::{Region, Segmentation};

/// The border band of one image, as a pseudo-region.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundMask {
    band: u32,
    region: Region,
}

impl BackgroundMask {
    pub fn new(height: u32, width: u32, band: u32) -> Self {
        let top_end = band.min(height);
        let bottom_start = height.saturating_sub(band).max(top_end);
        let left_end = band.min(width);
        let right_start = width.saturating_sub(band).max(left_end);

        let mut rows = Vec::new();
        let mut cols = Vec::new();
        for row in (0..top_end).chain(bottom_start..height) {
            for col in 0..width {
                rows.push(row);
                cols.push(col);
            }
        }
        for row in top_end..bottom_start {
            for col in (0..left_end).chain(right_start..width) {
                rows.push(row);
                cols.push(col);
            }
        }

        Self {
            band,
            region: Region::from_parts(rows, cols),
        }
    }

    pub fn band(&self) -> u32 {
        self.band
    }

    /// The band as a pseudo-region.
    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Indices of the real regions with at least one pixel inside the band.
    pub fn overlapping_regions(&self, segmentation: &Segmentation) -> Vec<usize> {
        let mut touched = vec![false; segmentation.region_count()];
        for (row, col) in self.region.pixels() {
            touched[segmentation.label_at(row, col) as usize] = true;
        }
        touched
            .iter()
            .enumerate()
            .filter_map(|(index, &hit)| hit.then_some(index))
            .collect()
    }
}
