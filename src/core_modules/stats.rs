// THEORY:
// `stats` holds the single reduction every per-region extractor shares: the
// population mean and population variance of a per-pixel value over the pixels
// of one region. Color channels, filter responses and local pattern codes all
// go through `RegionMoments`, so the divisor (count, not count - 1) is decided
// in exactly one place.

use crate::core_modules::region::Region;

/// Population mean and variance of one value over one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionMoments {
    pub mean: f64,
    pub variance: f64,
}

impl RegionMoments {
    /// Two-pass reduction over the region's pixels: mean first, then the mean
    /// squared deviation from it.
    pub fn over<F>(region: &Region, value_at: F) -> Self
    where
        F: Fn(u32, u32) -> f64,
    {
        let count = region.len() as f64;
        if count < 1.0 {
            return Self::default();
        }
        let sum: f64 = region.pixels().map(|(r, c)| value_at(r, c)).sum();
        let mean = sum / count;
        let variance = region
            .pixels()
            .map(|(r, c)| (value_at(r, c) - mean).powi(2))
            .sum::<f64>()
            / count;
        Self { mean, variance }
    }
}
