// THEORY:
// The `uniformity` module captures micro-texture: how regular the immediate
// neighbourhood of each pixel is. A local-pattern coder assigns every pixel a
// small integer code; per region the engine keeps the population mean and
// variance of that code, and the code map itself is retained as a histogram
// source for the contrast stage.
//
// The coder is a collaborator behind `LocalPatternCoder`. The default,
// `UniformLbp`, is the rotation-variant "uniform" local binary pattern:
// - `points` samples on a circle of `radius` around the pixel, sample `p` at
//   `(row - r sin(2 pi p / P), col + r cos(2 pi p / P))`, bilinearly interpolated,
//   zero outside the image;
// - bit `p` is set when the sample is at least the center value;
// - if the bit string changes value at most twice between consecutive samples,
//   the code is the number of set bits, otherwise it is `P + 1`.

use crate::core_modules::region::Region;
use crate::core_modules::stats::RegionMoments;
use image::{GrayImage, Luma};
use std::f64::consts::PI;

/// Local-pattern-code collaborator.
pub trait LocalPatternCoder: Send + Sync {
    /// One integer code per pixel of `gray`.
    fn codes(&self, gray: &GrayImage) -> GrayImage;
}

/// Uniform local binary pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformLbp {
    pub points: usize,
    pub radius: f64,
}

impl Default for UniformLbp {
    fn default() -> Self {
        Self {
            points: 8,
            radius: 1.0,
        }
    }
}

impl UniformLbp {
    /// Sample offsets `(d_row, d_col)`, rounded to 5 decimals so the axis-aligned
    /// samples land exactly on pixel centers.
    fn offsets(&self) -> Vec<(f64, f64)> {
        let round = |v: f64| (v * 1e5).round() / 1e5;
        (0..self.points)
            .map(|p| {
                let angle = 2.0 * PI * p as f64 / self.points as f64;
                (round(-self.radius * angle.sin()), round(self.radius * angle.cos()))
            })
            .collect()
    }
}

impl LocalPatternCoder for UniformLbp {
    fn codes(&self, gray: &GrayImage) -> GrayImage {
        let offsets = self.offsets();
        let non_uniform = (self.points + 1).min(u8::MAX as usize) as u8;
        let mut bits = vec![false; self.points];

        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let center = gray.get_pixel(x, y).0[0] as f64;
            for (bit, &(dr, dc)) in bits.iter_mut().zip(&offsets) {
                *bit = bilinear(gray, y as f64 + dr, x as f64 + dc) >= center;
            }
            let changes = bits.windows(2).filter(|pair| pair[0] != pair[1]).count();
            let code = if changes <= 2 {
                bits.iter().filter(|&&b| b).count() as u8
            } else {
                non_uniform
            };
            Luma([code])
        })
    }
}

/// Bilinear sample at fractional `(row, col)`; pixels outside the image read as 0.
fn bilinear(gray: &GrayImage, row: f64, col: f64) -> f64 {
    let at = |r: f64, c: f64| -> f64 {
        if r < 0.0 || c < 0.0 || r >= gray.height() as f64 || c >= gray.width() as f64 {
            0.0
        } else {
            gray.get_pixel(c as u32, r as u32).0[0] as f64
        }
    };
    let (r0, c0) = (row.floor(), col.floor());
    let (r1, c1) = (row.ceil(), col.ceil());
    let (dr, dc) = (row - r0, col - c0);
    let top = (1.0 - dc) * at(r0, c0) + dc * at(r0, c1);
    let bottom = (1.0 - dc) * at(r1, c0) + dc * at(r1, c1);
    (1.0 - dr) * top + dr * bottom
}

/// Mean and variance of the local pattern code over one region.
pub fn uniformity_moments(region: &Region, codes: &GrayImage) -> RegionMoments {
    RegionMoments::over(region, |row, col| codes.get_pixel(col, row).0[0] as f64)
}
