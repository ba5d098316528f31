// THEORY:
// `region_saliency` computes what a salient-region classifier needs to know about
// every superpixel of an image: a fixed 34-field descriptor per region, the
// spatial affinity and area weights between regions, and affinity-weighted
// contrast scores of any regional feature.
//
// The public surface is small. `SaliencyPipeline` takes an RGB image
// and a validated `Segmentation` and returns a `RegionReport`;
// `parallel_pipeline` runs many such extractions against one shared
// `FilterBank`. The individual extractors stay reachable under `core_modules`
// for callers that only need one of them.

pub mod core_modules;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::error::{FeatureError, ModelLoadError, Result};
pub use core_modules::filter_bank::FilterBank;
pub use core_modules::region::{Region, Segmentation};
pub use pipeline::{ContrastFeature, ContrastScope, PipelineConfig, RegionReport, SaliencyPipeline};
