// THEORY:
// The `region` module is the foundation of the feature engine. It turns a
// superpixel segmentation into the one representation every extractor works on:
// a list of regions, each holding the coordinates of the pixels it owns.
//
// Key architectural principles:
// 1.  **One Explicit Shape**: A `Region` always holds two equal-length sequences,
//     row indices and column indices. The lengths are validated at construction,
//     so no extractor ever has to guess whether it received points or index arrays.
// 2.  **Validated Partition**: A `Segmentation` pairs the label map with the region
//     lists and guarantees that every pixel of the image belongs to exactly one
//     non-empty region whose index equals the pixel's label. Anything else is a
//     `MalformedSegmentation` and is rejected before any statistics are computed.
// 3.  **Tagged Virtual Region**: The border "background" pseudo-region is never an
//     index `-1`. A `RegionSet` appends it explicitly after the real regions and
//     addresses it through `RegionId::Background`.
// 4.  **Derived Once**: A `Segmentation` is immutable. If the labeling changes, a
//     new one is built and every feature is recomputed.

use crate::core_modules::error::{FeatureError, Result};
use image::{ImageBuffer, Luma};

/// Per-pixel region labels, `0..n-1`.
pub type LabelMap = ImageBuffer<Luma<u32>, Vec<u32>>;

/// The pixels of one region, stored as parallel row and column sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    rows: Vec<u32>,
    cols: Vec<u32>,
}

impl Region {
    /// Builds a region from parallel row/column sequences.
    pub fn new(rows: Vec<u32>, cols: Vec<u32>) -> Result<Self> {
        if rows.len() != cols.len() {
            return Err(FeatureError::malformed(format!(
                "region has {} row indices but {} column indices",
                rows.len(),
                cols.len()
            )));
        }
        if rows.is_empty() {
            return Err(FeatureError::malformed("region has no pixels"));
        }
        Ok(Self { rows, cols })
    }

    /// Builds a region from `(row, col)` pairs.
    pub fn from_pixels(pixels: &[(u32, u32)]) -> Result<Self> {
        let (rows, cols) = pixels.iter().copied().unzip();
        Self::new(rows, cols)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    pub fn cols(&self) -> &[u32] {
        &self.cols
    }

    /// Iterates the region's pixels as `(row, col)`.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    pub(crate) fn from_parts(rows: Vec<u32>, cols: Vec<u32>) -> Self {
        debug_assert_eq!(rows.len(), cols.len());
        Self { rows, cols }
    }
}

/// Addresses either a real region or the appended background pseudo-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    Real(usize),
    Background,
}

/// The real regions of a segmentation, optionally followed by the background
/// pseudo-region. Position `real.len()` is the background when present.
#[derive(Debug, Clone, Copy)]
pub struct RegionSet<'a> {
    real: &'a [Region],
    background: Option<&'a Region>,
}

impl<'a> RegionSet<'a> {
    pub fn real(real: &'a [Region]) -> Self {
        Self { real, background: None }
    }

    pub fn with_background(real: &'a [Region], background: &'a Region) -> Self {
        Self {
            real,
            background: Some(background),
        }
    }

    /// Number of entries, including the background when present.
    pub fn len(&self) -> usize {
        self.real.len() + usize::from(self.background.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn real_count(&self) -> usize {
        self.real.len()
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    pub fn get(&self, id: RegionId) -> Option<&'a Region> {
        match id {
            RegionId::Real(index) => self.real.get(index),
            RegionId::Background => self.background,
        }
    }

    /// Position of `id` in the flattened set.
    pub fn position(&self, id: RegionId) -> Option<usize> {
        match id {
            RegionId::Real(index) if index < self.real.len() => Some(index),
            RegionId::Background if self.background.is_some() => Some(self.real.len()),
            _ => None,
        }
    }

    /// Entries in order: real regions first, then the background.
    pub fn iter(&self) -> impl Iterator<Item = &'a Region> + '_ {
        self.real.iter().chain(self.background)
    }

    pub fn to_vec(&self) -> Vec<&'a Region> {
        self.iter().collect()
    }
}

/// A validated partition of an image into labelled regions.
#[derive(Debug, Clone)]
pub struct Segmentation {
    label_map: LabelMap,
    regions: Vec<Region>,
}

impl Segmentation {
    /// Derives the region pixel lists from a label map with labels `0..n-1`.
    pub fn from_label_map(label_map: LabelMap) -> Result<Self> {
        let (width, height) = label_map.dimensions();
        if width == 0 || height == 0 {
            return Err(FeatureError::malformed("label map is empty"));
        }

        // Every label must own a pixel, so the largest one is bounded by the pixel count.
        let pixel_count = width as usize * height as usize;
        let max_label = label_map.pixels().map(|p| p.0[0]).max().unwrap_or(0);
        let region_count = usize::try_from(max_label)
            .ok()
            .and_then(|label| label.checked_add(1))
            .filter(|&count| count <= pixel_count)
            .ok_or_else(|| {
                FeatureError::malformed(format!(
                    "label {max_label} exceeds the {pixel_count} pixels of the label map"
                ))
            })?;
        let mut rows: Vec<Vec<u32>> = vec![Vec::new(); region_count];
        let mut cols: Vec<Vec<u32>> = vec![Vec::new(); region_count];
        for (x, y, label) in label_map.enumerate_pixels() {
            let label = label.0[0] as usize;
            rows[label].push(y);
            cols[label].push(x);
        }

        let mut regions = Vec::with_capacity(region_count);
        for (index, (rows, cols)) in rows.into_iter().zip(cols).enumerate() {
            if rows.is_empty() {
                return Err(FeatureError::malformed(format!("region {index} has no pixels")));
            }
            regions.push(Region::from_parts(rows, cols));
        }

        Ok(Self { label_map, regions })
    }

    /// Pairs a label map with caller-supplied region lists and checks that they
    /// describe the same partition.
    pub fn new(label_map: LabelMap, regions: Vec<Region>) -> Result<Self> {
        let (width, height) = label_map.dimensions();
        if width == 0 || height == 0 {
            return Err(FeatureError::malformed("label map is empty"));
        }

        let mut seen = vec![false; width as usize * height as usize];
        let mut covered = 0usize;
        for (index, region) in regions.iter().enumerate() {
            if region.is_empty() {
                return Err(FeatureError::malformed(format!("region {index} has no pixels")));
            }
            for (row, col) in region.pixels() {
                if row >= height || col >= width {
                    return Err(FeatureError::malformed(format!(
                        "region {index} lists pixel ({row}, {col}) outside a {height}x{width} image"
                    )));
                }
                let label = label_map.get_pixel(col, row).0[0] as usize;
                if label != index {
                    return Err(FeatureError::malformed(format!(
                        "region {index} lists pixel ({row}, {col}) labelled {label}"
                    )));
                }
                let flat = row as usize * width as usize + col as usize;
                if std::mem::replace(&mut seen[flat], true) {
                    return Err(FeatureError::malformed(format!(
                        "pixel ({row}, {col}) is listed twice"
                    )));
                }
                covered += 1;
            }
        }

        if covered != seen.len() {
            return Err(FeatureError::malformed(format!(
                "regions cover {covered} of {} pixels",
                seen.len()
            )));
        }

        Ok(Self { label_map, regions })
    }

    pub fn width(&self) -> u32 {
        self.label_map.width()
    }

    pub fn height(&self) -> u32 {
        self.label_map.height()
    }

    /// `H * W`, the normalizer shared by area, perimeter and density features.
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    pub fn label_at(&self, row: u32, col: u32) -> u32 {
        self.label_map.get_pixel(col, row).0[0]
    }
}
