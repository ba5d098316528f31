// THEORY:
// The `pipeline` module is the top-level API of the feature engine. It wires the
// extractors of `core_modules` into one call: hand it an RGB image and a validated
// segmentation, receive a `RegionReport` holding the n x 34 feature matrix, the
// spatial affinity matrix, the area vector and every retained map the contrast
// stage needs.
//
// Key architectural principles:
// 1.  **Load Once, Share**: The pretrained filter bank is an explicit
//     `Arc<FilterBank>` handle owned by the pipeline. Many images (and many
//     worker threads) reuse it read-only; nothing is cached globally.
// 2.  **Dense Then Regional**: Dense per-pixel work (color planes, the 15 filter
//     responses, local pattern codes) runs once per image. Per-region reductions
//     then run in parallel over regions, each writing only its own output row.
// 3.  **Pluggable Collaborators**: Color conversion, convolution and the local
//     pattern coder are trait objects with sensible defaults, so callers can swap
//     in their own implementations without touching the engine.
// 4.  **Contrast On Demand**: The report keeps the background pseudo-region's
//     statistics next to the real regions, so any contrast, including the
//     background-only form, is one `contrast` call away.

use crate::core_modules::affinity::{affinity_matrix, neighbor_density, AffinityParams};
use crate::core_modules::area::{area_vector, area_weight};
use crate::core_modules::background::BackgroundMask;
use crate::core_modules::channel::{ChannelMaps, ColorConverter, PaletteConverter};
use crate::core_modules::color::ColorStats;
use crate::core_modules::contrast::{aggregate, DiffMatrix};
use crate::core_modules::convolution::{Convolver, ReplicateConvolver};
use crate::core_modules::edges::perimeter_proxy;
use crate::core_modules::error::{FeatureError, Result};
use crate::core_modules::feature::FeatureVector;
use crate::core_modules::filter_bank::FilterBank;
use crate::core_modules::region::{Region, RegionSet, Segmentation};
use crate::core_modules::shape::{ShapeDescriptor, ShapeParams};
use crate::core_modules::stats::RegionMoments;
use crate::core_modules::texture::{TextureResponses, TextureStats};
use crate::core_modules::uniformity::{uniformity_moments, LocalPatternCoder, UniformLbp};
use image::{GrayImage, RgbImage};
use log::{debug, info};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

// Re-export key data structures for the public API.
pub use crate::core_modules::channel::Channel;
pub use crate::core_modules::contrast::ContrastScope;
pub use crate::core_modules::feature::{FeatureMatrix, FEATURE_WIDTH};
pub use crate::core_modules::matrix::SymmetricMatrix;

/// Numeric constants of the feature engine.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Width in pixels of the border band treated as background.
    pub border_band: u32,
    /// Divisor of the squared pixel distance in the affinity kernel.
    pub affinity_bandwidth: f64,
    /// Divisor of the squared normalized distance in the neighbour density.
    pub neighbor_sigma: f64,
    /// Added to the column extent in the aspect ratio.
    pub ratio_epsilon: f64,
    pub low_percentile: f64,
    pub high_percentile: f64,
    /// Number of bins of every contrast histogram. Must exceed the largest value
    /// of the compared map: at least 256 for quantized texture maps, 10 for the
    /// default local pattern codes. `contrast` rejects a smaller count.
    pub histogram_bins: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            border_band: 15,
            affinity_bandwidth: 2.0,
            neighbor_sigma: 0.4,
            ratio_epsilon: 1.0,
            low_percentile: 0.1,
            high_percentile: 0.9,
            histogram_bins: 256,
        }
    }
}

impl PipelineConfig {
    pub fn shape_params(&self) -> ShapeParams {
        ShapeParams {
            low_percentile: self.low_percentile,
            high_percentile: self.high_percentile,
            ratio_epsilon: self.ratio_epsilon,
        }
    }

    pub fn affinity_params(&self) -> AffinityParams {
        AffinityParams {
            bandwidth: self.affinity_bandwidth,
            neighbor_sigma: self.neighbor_sigma,
        }
    }
}

/// The feature a contrast score is computed from.
#[derive(Debug, Clone, Copy)]
pub enum ContrastFeature<'a> {
    /// One value per entry, compared by absolute difference. Background-only
    /// contrast needs `n + 1` values, the background's last.
    Scalar(&'a [f64]),
    /// One vector per entry, compared by Euclidean distance. Same length rule as
    /// `Scalar`.
    Vector(&'a [Vec<f64>]),
    /// A caller-supplied quantized map of the image size, compared by histogram.
    Histogram(&'a GrayImage),
    /// The regional mean of one color channel.
    ChannelMean(Channel),
    /// The nine regional color means as one vector.
    ColorMeans,
    /// The quantized response of one texture filter, compared by histogram.
    TextureHistogram(usize),
    /// The local pattern code map, compared by histogram.
    UniformityHistogram,
}

/// Statistics of one region before they are flattened into a feature row.
#[derive(Debug, Clone, Copy)]
struct RegionalStats {
    shape: ShapeDescriptor,
    color: ColorStats,
    texture: TextureStats,
    uniformity: RegionMoments,
    perimeter: f64,
}

/// What the engine knows about the border band.
#[derive(Debug, Clone)]
pub struct BackgroundSummary {
    pub mask: BackgroundMask,
    pub color: ColorStats,
    pub area: f64,
    pub raw_centroid: (f64, f64),
    /// Real regions with at least one pixel in the band.
    pub overlapping_regions: Vec<usize>,
}

/// Everything extracted from one image and segmentation.
#[derive(Debug, Clone)]
pub struct RegionReport {
    width: u32,
    height: u32,
    histogram_bins: usize,
    regions: Vec<Region>,
    features: Vec<FeatureVector>,
    feature_matrix: FeatureMatrix,
    color: Vec<ColorStats>,
    texture: Vec<TextureStats>,
    uniformity: Vec<RegionMoments>,
    area: Vec<f64>,
    affinity: SymmetricMatrix,
    neighbor_density: Vec<f64>,
    background: BackgroundSummary,
    /// Area and affinity over the real regions plus the background, last.
    extended_area: Vec<f64>,
    extended_affinity: SymmetricMatrix,
    quantized_texture: Vec<GrayImage>,
    pattern_codes: GrayImage,
}

/// The single-image feature engine.
#[derive(Clone)]
pub struct SaliencyPipeline {
    config: PipelineConfig,
    filter_bank: Arc<FilterBank>,
    color_converter: Arc<dyn ColorConverter>,
    convolver: Arc<dyn Convolver>,
    pattern_coder: Arc<dyn LocalPatternCoder>,
}

impl SaliencyPipeline {
    pub fn new(config: PipelineConfig, filter_bank: Arc<FilterBank>) -> Self {
        Self {
            config,
            filter_bank,
            color_converter: Arc::new(PaletteConverter),
            convolver: Arc::new(ReplicateConvolver),
            pattern_coder: Arc::new(UniformLbp::default()),
        }
    }

    pub fn with_color_converter(mut self, converter: Arc<dyn ColorConverter>) -> Self {
        self.color_converter = converter;
        self
    }

    pub fn with_convolver(mut self, convolver: Arc<dyn Convolver>) -> Self {
        self.convolver = convolver;
        self
    }

    pub fn with_pattern_coder(mut self, coder: Arc<dyn LocalPatternCoder>) -> Self {
        self.pattern_coder = coder;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn filter_bank(&self) -> &Arc<FilterBank> {
        &self.filter_bank
    }

    /// Runs every extractor over `rgb` partitioned by `segmentation`.
    pub fn extract(&self, rgb: &RgbImage, segmentation: &Segmentation) -> Result<RegionReport> {
        let (width, height) = rgb.dimensions();
        if (width, height) != (segmentation.width(), segmentation.height()) {
            return Err(FeatureError::malformed(format!(
                "label map is {}x{} but the image is {height}x{width}",
                segmentation.height(),
                segmentation.width()
            )));
        }
        let pixel_count = segmentation.pixel_count();
        info!(
            "extracting features of {} regions over a {height}x{width} image",
            segmentation.region_count()
        );

        // Stage 1: Dense Maps
        let started = Instant::now();
        let maps = ChannelMaps::build(rgb, self.color_converter.as_ref());
        let responses =
            TextureResponses::compute(&maps.gray_normalized(), &self.filter_bank, self.convolver.as_ref());
        let pattern_codes = self.pattern_coder.codes(maps.gray());
        debug!("dense maps ready in {:?}", started.elapsed());

        // Stage 2: Regional Reductions
        let started = Instant::now();
        let shape_params = self.config.shape_params();
        let labels = segmentation.label_map();
        let regional: Vec<RegionalStats> = segmentation
            .regions()
            .par_iter()
            .map(|region| RegionalStats {
                shape: ShapeDescriptor::compute(region, height, width, &shape_params),
                color: ColorStats::compute(region, &maps),
                texture: TextureStats::compute(region, &responses),
                uniformity: uniformity_moments(region, &pattern_codes),
                perimeter: perimeter_proxy(region, labels),
            })
            .collect();
        let area = area_vector(segmentation.regions(), pixel_count);
        debug!("regional statistics ready in {:?}", started.elapsed());

        let features: Vec<FeatureVector> = regional
            .iter()
            .zip(&area)
            .map(|(stats, &area)| FeatureVector {
                shape: stats.shape,
                perimeter: stats.perimeter,
                area,
                color_variance: stats.color.variance,
                texture_variance: stats.texture.variance,
                uniformity_variance: stats.uniformity.variance,
            })
            .collect();

        // Stage 3: Background Band
        let mask = BackgroundMask::new(height, width, self.config.border_band);
        let background_shape = ShapeDescriptor::compute(mask.region(), height, width, &shape_params);
        let background = BackgroundSummary {
            color: ColorStats::compute(mask.region(), &maps),
            area: area_weight(mask.region(), pixel_count),
            raw_centroid: background_shape.raw_centroid,
            overlapping_regions: mask.overlapping_regions(segmentation),
            mask,
        };

        // Stage 4: Spatial Weights
        let started = Instant::now();
        let affinity_params = self.config.affinity_params();
        let mut raw_centroids: Vec<(f64, f64)> = regional.iter().map(|s| s.shape.raw_centroid).collect();
        let centroids: Vec<(f64, f64)> = regional.iter().map(|s| s.shape.centroid).collect();
        let affinity = affinity_matrix(&raw_centroids, &affinity_params);
        let neighbor_density = neighbor_density(&centroids, &affinity_params, pixel_count);
        raw_centroids.push(background.raw_centroid);
        let extended_affinity = affinity_matrix(&raw_centroids, &affinity_params);
        let mut extended_area = area.clone();
        extended_area.push(background.area);
        debug!("spatial weights ready in {:?}", started.elapsed());

        Ok(RegionReport {
            width,
            height,
            histogram_bins: self.config.histogram_bins,
            regions: segmentation.regions().to_vec(),
            feature_matrix: FeatureMatrix::from_vectors(&features),
            features,
            color: regional.iter().map(|s| s.color).collect(),
            texture: regional.iter().map(|s| s.texture).collect(),
            uniformity: regional.iter().map(|s| s.uniformity).collect(),
            area,
            affinity,
            neighbor_density,
            background,
            extended_area,
            extended_affinity,
            quantized_texture: responses.quantized_maps().to_vec(),
            pattern_codes,
        })
    }
}

impl RegionReport {
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// The n x 34 feature matrix.
    pub fn feature_matrix(&self) -> &FeatureMatrix {
        &self.feature_matrix
    }

    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    /// The n x n spatial affinity between real regions.
    pub fn affinity(&self) -> &SymmetricMatrix {
        &self.affinity
    }

    pub fn area(&self) -> &[f64] {
        &self.area
    }

    pub fn neighbor_density(&self) -> &[f64] {
        &self.neighbor_density
    }

    pub fn color_stats(&self) -> &[ColorStats] {
        &self.color
    }

    pub fn texture_stats(&self) -> &[TextureStats] {
        &self.texture
    }

    pub fn uniformity(&self) -> &[RegionMoments] {
        &self.uniformity
    }

    pub fn background(&self) -> &BackgroundSummary {
        &self.background
    }

    pub fn quantized_texture(&self, filter: usize) -> Option<&GrayImage> {
        self.quantized_texture.get(filter)
    }

    pub fn pattern_codes(&self) -> &GrayImage {
        &self.pattern_codes
    }

    /// Affinity- and area-weighted contrast of `feature`.
    ///
    /// Returns one score per region for `ContrastScope::AllRegions` and a single
    /// score for `ContrastScope::BackgroundOnly`.
    pub fn contrast(&self, feature: ContrastFeature<'_>, scope: ContrastScope) -> Result<Vec<f64>> {
        let with_background = scope == ContrastScope::BackgroundOnly;
        let entries = self.regions.len() + usize::from(with_background);

        let diff = match feature {
            ContrastFeature::Scalar(values) => {
                check_len("scalar feature length", entries, values.len())?;
                DiffMatrix::scalar(values)
            }
            ContrastFeature::Vector(vectors) => {
                check_len("vector feature count", entries, vectors.len())?;
                DiffMatrix::euclidean(vectors)?
            }
            ContrastFeature::Histogram(map) => {
                check_len("histogram map width", self.width as usize, map.width() as usize)?;
                check_len("histogram map height", self.height as usize, map.height() as usize)?;
                self.histogram_diff(map, with_background)?
            }
            ContrastFeature::ChannelMean(channel) => {
                let mut values: Vec<f64> = self.color.iter().map(|c| c.mean_of(channel)).collect();
                if with_background {
                    values.push(self.background.color.mean_of(channel));
                }
                DiffMatrix::scalar(&values)
            }
            ContrastFeature::ColorMeans => {
                let mut vectors: Vec<Vec<f64>> = self.color.iter().map(|c| c.mean.to_vec()).collect();
                if with_background {
                    vectors.push(self.background.color.mean.to_vec());
                }
                DiffMatrix::euclidean(&vectors)?
            }
            ContrastFeature::TextureHistogram(filter) => {
                let map = self
                    .quantized_texture
                    .get(filter)
                    .ok_or(FeatureError::DimensionMismatch {
                        what: "texture filter index bound",
                        expected: self.quantized_texture.len(),
                        actual: filter,
                    })?;
                self.histogram_diff(map, with_background)?
            }
            ContrastFeature::UniformityHistogram => self.histogram_diff(&self.pattern_codes, with_background)?,
        };

        if with_background {
            aggregate(&diff, &self.extended_affinity, &self.extended_area, scope)
        } else {
            aggregate(&diff, &self.affinity, &self.area, scope)
        }
    }

    fn histogram_diff(&self, map: &GrayImage, with_background: bool) -> Result<DiffMatrix> {
        let needed = map.pixels().map(|p| p.0[0] as usize + 1).max().unwrap_or(0);
        if needed > self.histogram_bins {
            return Err(FeatureError::DimensionMismatch {
                what: "histogram bin count",
                expected: needed,
                actual: self.histogram_bins,
            });
        }
        let regions = if with_background {
            RegionSet::with_background(&self.regions, self.background.mask.region())
        } else {
            RegionSet::real(&self.regions)
        };
        Ok(DiffMatrix::histogram(&regions, map, self.histogram_bins))
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(FeatureError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}
