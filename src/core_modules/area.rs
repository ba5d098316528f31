// The `area` module weights each region by the share of the image it covers:
// `a[i] = |region_i| / (H * W)`. Over a full partition the weights sum to 1.

use crate::core_modules::region::Region;

/// Normalized pixel count of one region.
pub fn area_weight(region: &Region, pixel_count: usize) -> f64 {
    region.len() as f64 / pixel_count as f64
}

/// Normalized pixel counts of every region, in order.
pub fn area_vector<'a>(regions: impl IntoIterator<Item = &'a Region>, pixel_count: usize) -> Vec<f64> {
    regions
        .into_iter()
        .map(|region| area_weight(region, pixel_count))
        .collect()
}
