// Example runner for the `region_saliency` library.
//
// Usage: region_saliency [image_path] [model_path]
//
// Without an image a synthetic scene is used; without a model file a small
// in-memory bank of oriented derivative filters stands in for the pretrained
// one. The image is split into square blocks that play the role of superpixels.

use anyhow::{Context, bail};
use image::{Luma, Rgb, RgbImage};
use log::info;
use region_saliency::core_modules::filter_bank::{Kernel, TEXTURE_FILTER_COUNT};
use region_saliency::core_modules::region::LabelMap;
use region_saliency::parallel_pipeline::{BatchConfig, ExtractionJob, ParallelPipeline};
use region_saliency::pipeline::{Channel, ContrastFeature, ContrastScope};
use region_saliency::{FilterBank, PipelineConfig, SaliencyPipeline, Segmentation};
use std::env;
use std::f64::consts::PI;
use std::sync::Arc;

const BLOCK_SIZE: u32 = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // --- 1. Inputs ---
    let args: Vec<String> = env::args().collect();
    let image = match args.get(1) {
        Some(path) => image::open(path)
            .with_context(|| format!("failed to open image {path}"))?
            .to_rgb8(),
        None => synthetic_scene(96, 128),
    };
    let filter_bank = match args.get(2) {
        Some(path) => FilterBank::load(path).with_context(|| format!("failed to load model {path}"))?,
        None => derivative_bank()?,
    };
    if image.width() == 0 || image.height() == 0 {
        bail!("image is empty");
    }

    let segmentation = Segmentation::from_label_map(block_labels(image.width(), image.height()))?;
    info!(
        "{}x{} image split into {} blocks",
        image.height(),
        image.width(),
        segmentation.region_count()
    );

    // --- 2. Extraction ---
    let pipeline = SaliencyPipeline::new(PipelineConfig::default(), Arc::new(filter_bank));
    let batch = ParallelPipeline::new(pipeline, BatchConfig::default());
    let report = batch.process(ExtractionJob { image, segmentation }).await?;
    batch.shutdown().await;

    // --- 3. Contrast ---
    let lightness = report.contrast(ContrastFeature::ChannelMean(Channel::Lightness), ContrastScope::AllRegions)?;
    let color = report.contrast(ContrastFeature::ColorMeans, ContrastScope::AllRegions)?;
    let texture = report.contrast(ContrastFeature::TextureHistogram(0), ContrastScope::AllRegions)?;
    let pattern = report.contrast(ContrastFeature::UniformityHistogram, ContrastScope::AllRegions)?;
    let border = report.contrast(ContrastFeature::ColorMeans, ContrastScope::BackgroundOnly)?;

    println!("region  area      L-contrast  color       texture     pattern");
    for i in 0..report.region_count() {
        println!(
            "{i:>6}  {:<8.5}  {:<10.4e}  {:<10.4e}  {:<10.4e}  {:<10.4e}",
            report.area()[i],
            lightness[i],
            color[i],
            texture[i],
            pattern[i]
        );
    }
    println!("background color contrast: {:.4e}", border[0]);
    println!(
        "regions touching the border band: {}",
        report.background().overlapping_regions.len()
    );
    Ok(())
}

/// A horizontal gradient with a bright square near the center.
fn synthetic_scene(height: u32, width: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = (width / 3..2 * width / 3).contains(&x) && (height / 3..2 * height / 3).contains(&y);
        if inside {
            Rgb([230, 40, 40])
        } else {
            let shade = (x * 160 / width.max(1)) as u8;
            Rgb([shade, shade, 120])
        }
    })
}

/// Square blocks of `BLOCK_SIZE`, labelled row-major.
fn block_labels(width: u32, height: u32) -> LabelMap {
    let blocks_per_row = width.div_ceil(BLOCK_SIZE);
    LabelMap::from_fn(width, height, |x, y| {
        Luma([(y / BLOCK_SIZE) * blocks_per_row + x / BLOCK_SIZE])
    })
}

/// Fifteen 5x5 first-derivative filters at evenly spaced orientations.
fn derivative_bank() -> anyhow::Result<FilterBank> {
    let kernels = (0..TEXTURE_FILTER_COUNT)
        .map(|k| {
            let angle = PI * k as f64 / TEXTURE_FILTER_COUNT as f64;
            Kernel::from_fn(5, 5, |r, c| {
                let (dr, dc) = (r as f64 - 2.0, c as f64 - 2.0);
                angle.cos() * dc + angle.sin() * dr
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FilterBank::from_kernels(kernels)?)
}
