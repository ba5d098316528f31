// THEORY:
// The `texture` module measures how each region responds to the pretrained filter
// bank. It runs in two stages:
//
// 1.  **Dense responses** (`TextureResponses`): the normalized grayscale image is
//     filtered once per kernel. The 15 filterings are independent and run in
//     parallel; the resulting planes are shared read-only by every region.
// 2.  **Regional reduction** (`TextureStats`): per region and per filter, the
//     population mean and variance of the float response, exactly the reduction
//     the color statistics use.
//
// Each response plane is also min-max rescaled to 0..=255 and quantized to one
// byte per pixel. The quantized maps are small-integer "labels" that the contrast
// stage histograms; the regional statistics never see them. A byte here is the
// same bin index a signed 8-bit reading of the value would wrap to.

use crate::core_modules::channel::FloatPlane;
use crate::core_modules::convolution::Convolver;
use crate::core_modules::filter_bank::{FilterBank, TEXTURE_FILTER_COUNT};
use crate::core_modules::region::Region;
use crate::core_modules::stats::RegionMoments;
use image::{GrayImage, Luma};
use log::warn;
use rayon::prelude::*;

/// Filter responses of one image, float and quantized.
#[derive(Debug, Clone)]
pub struct TextureResponses {
    responses: Vec<FloatPlane>,
    quantized: Vec<GrayImage>,
}

impl TextureResponses {
    pub fn compute(gray: &FloatPlane, bank: &FilterBank, convolver: &dyn Convolver) -> Self {
        let responses: Vec<FloatPlane> = bank
            .kernels()
            .par_iter()
            .map(|kernel| convolver.filter(gray, kernel))
            .collect();
        let quantized = responses
            .iter()
            .enumerate()
            .map(|(index, response)| quantize(index, response))
            .collect();
        Self {
            responses,
            quantized,
        }
    }

    pub fn filter_count(&self) -> usize {
        self.responses.len()
    }

    pub fn response(&self, filter: usize) -> Option<&FloatPlane> {
        self.responses.get(filter)
    }

    /// The 0..=255 quantized response of `filter`, usable as a histogram source.
    pub fn quantized(&self, filter: usize) -> Option<&GrayImage> {
        self.quantized.get(filter)
    }

    pub fn quantized_maps(&self) -> &[GrayImage] {
        &self.quantized
    }
}

/// Mean and variance of every filter response over one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureStats {
    pub mean: [f64; TEXTURE_FILTER_COUNT],
    pub variance: [f64; TEXTURE_FILTER_COUNT],
}

impl TextureStats {
    pub fn compute(region: &Region, responses: &TextureResponses) -> Self {
        let mut stats = Self::default();
        for (index, response) in responses.responses.iter().take(TEXTURE_FILTER_COUNT).enumerate() {
            let moments = RegionMoments::over(region, |row, col| response.get_pixel(col, row).0[0]);
            stats.mean[index] = moments.mean;
            stats.variance[index] = moments.variance;
        }
        stats
    }
}

/// Per-map min-max rescale to 0..=255, rounded to one byte.
fn quantize(index: usize, response: &FloatPlane) -> GrayImage {
    let (min, max) = response
        .pixels()
        .map(|p| p.0[0])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        warn!("texture filter {index} has a flat response; its quantized map is all zeros");
        return GrayImage::new(response.width(), response.height());
    }
    GrayImage::from_fn(response.width(), response.height(), |x, y| {
        let scaled = (response.get_pixel(x, y).0[0] - min) / range * 255.0;
        Luma([scaled.round().clamp(0.0, 255.0) as u8])
    })
}
