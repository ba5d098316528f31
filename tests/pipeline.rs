// tests/pipeline.rs: End-to-end checks of SaliencyPipeline over synthetic scenes.
//
// Every test goes through the public API only: build a segmentation, run the
// pipeline, then inspect the report and its contrast queries.

mod common;

use common::fixtures::{identity_bank, quadrant_image, quadrant_labels, uniform_image};
use region_saliency::pipeline::{Channel, ContrastFeature, ContrastScope, FEATURE_WIDTH};
use region_saliency::{FeatureError, PipelineConfig, RegionReport, SaliencyPipeline, Segmentation};
use std::sync::Arc;

fn pipeline() -> SaliencyPipeline {
    let _ = env_logger::builder().is_test(true).try_init();
    SaliencyPipeline::new(PipelineConfig::default(), Arc::new(identity_bank()))
}

fn quadrant_report() -> RegionReport {
    let segmentation = Segmentation::from_label_map(quadrant_labels(4)).unwrap();
    pipeline().extract(&quadrant_image(4), &segmentation).unwrap()
}

// ===== Quadrant scene =====

#[test]
fn quadrant_feature_matrix_has_one_row_per_region() {
    let report = quadrant_report();
    let matrix = report.feature_matrix();
    assert_eq!(matrix.region_count(), 4);
    assert_eq!(FEATURE_WIDTH, 34);
    assert_eq!(matrix.rows()[0].len(), 34);
}

#[test]
fn flat_quadrants_have_zero_appearance_variance() {
    let report = quadrant_report();
    for feature in report.features() {
        for &v in feature.color_variance.iter().chain(&feature.texture_variance) {
            assert!(v.abs() < 1e-9, "variance {v} should vanish on a flat region");
        }
    }
}

#[test]
fn quadrant_areas_are_one_quarter() {
    let report = quadrant_report();
    assert_eq!(report.area(), &[0.25; 4]);
    assert_eq!(report.feature_matrix().column(8), vec![0.25; 4]);
}

#[test]
fn every_quadrant_pixel_is_a_boundary_pixel() {
    // Each of the 4 pixels per region contributes 1/16.
    let report = quadrant_report();
    assert_eq!(report.feature_matrix().column(7), vec![0.25; 4]);
}

#[test]
fn quadrant_centroids_are_integer_divided() {
    let report = quadrant_report();
    let rows = report.feature_matrix().rows();
    // Region 3 spans rows and cols 2..4: (2 + 2 + 3 + 3) / 4 = 2 -> 2 / 4.
    assert_eq!(rows[3][0], 0.5);
    assert_eq!(rows[3][1], 0.5);
    assert_eq!(rows[0][0], 0.0);
    assert_eq!(report.features()[0].shape.raw_centroid, (0.5, 0.5));
}

#[test]
fn affinity_is_symmetric_with_unit_diagonal() {
    let report = quadrant_report();
    let w = report.affinity();
    assert_eq!(w.size(), 4);
    assert!(w.is_symmetric());
    for i in 0..4 {
        assert_eq!(w.get(i, i), 1.0);
    }
    // Raw centroids of regions 0 and 1 are two columns apart: exp(-4 / 2).
    assert!((w.get(0, 1) - (-2.0f64).exp()).abs() < 1e-12);
}

#[test]
fn distinct_colors_give_positive_color_contrast() {
    let report = quadrant_report();
    let contrast = report
        .contrast(ContrastFeature::ColorMeans, ContrastScope::AllRegions)
        .unwrap();
    assert_eq!(contrast.len(), 4);
    assert!(contrast.iter().all(|&c| c > 0.0));
}

// ===== Contrast properties =====

#[test]
fn identical_scalar_feature_has_zero_contrast() {
    let report = quadrant_report();
    let contrast = report
        .contrast(ContrastFeature::Scalar(&[0.3; 4]), ContrastScope::AllRegions)
        .unwrap();
    assert_eq!(contrast, vec![0.0; 4]);
}

#[test]
fn uniform_image_has_zero_histogram_and_channel_contrast() {
    let segmentation = Segmentation::from_label_map(quadrant_labels(6)).unwrap();
    let report = pipeline().extract(&uniform_image(6, 6, 90), &segmentation).unwrap();

    let texture = report
        .contrast(ContrastFeature::TextureHistogram(4), ContrastScope::AllRegions)
        .unwrap();
    assert_eq!(texture, vec![0.0; 4]);

    let lightness = report
        .contrast(ContrastFeature::ChannelMean(Channel::Lightness), ContrastScope::AllRegions)
        .unwrap();
    assert_eq!(lightness, vec![0.0; 4]);
}

#[test]
fn background_scope_returns_a_single_score() {
    let report = quadrant_report();
    let contrast = report
        .contrast(ContrastFeature::ColorMeans, ContrastScope::BackgroundOnly)
        .unwrap();
    assert_eq!(contrast.len(), 1);
    assert!(contrast[0] > 0.0);

    // A 4x4 image lies entirely inside the default 15-pixel band.
    let background = report.background();
    assert_eq!(background.mask.len(), 16);
    assert_eq!(background.area, 1.0);
    assert_eq!(background.overlapping_regions, vec![0, 1, 2, 3]);
}

#[test]
fn background_scope_needs_background_value_for_raw_features() {
    let report = quadrant_report();
    let err = report
        .contrast(ContrastFeature::Scalar(&[1.0; 4]), ContrastScope::BackgroundOnly)
        .unwrap_err();
    assert!(matches!(err, FeatureError::DimensionMismatch { expected: 5, actual: 4, .. }));

    let contrast = report
        .contrast(ContrastFeature::Scalar(&[1.0; 5]), ContrastScope::BackgroundOnly)
        .unwrap();
    assert_eq!(contrast, vec![0.0]);
}

#[test]
fn out_of_range_texture_filter_is_rejected() {
    let report = quadrant_report();
    let err = report
        .contrast(ContrastFeature::TextureHistogram(15), ContrastScope::AllRegions)
        .unwrap_err();
    assert!(matches!(err, FeatureError::DimensionMismatch { .. }));
}

#[test]
fn too_few_histogram_bins_are_rejected() {
    let config = PipelineConfig {
        histogram_bins: 4,
        ..PipelineConfig::default()
    };
    let pipeline = SaliencyPipeline::new(config, Arc::new(identity_bank()));
    let segmentation = Segmentation::from_label_map(quadrant_labels(4)).unwrap();
    let report = pipeline.extract(&quadrant_image(4), &segmentation).unwrap();

    let err = report
        .contrast(ContrastFeature::TextureHistogram(0), ContrastScope::AllRegions)
        .unwrap_err();
    assert!(matches!(
        err,
        FeatureError::DimensionMismatch { what: "histogram bin count", expected: 256, actual: 4 }
    ));

    let flat = image::GrayImage::new(4, 4);
    assert!(report
        .contrast(ContrastFeature::Histogram(&flat), ContrastScope::AllRegions)
        .is_ok());
}

// ===== Geometry =====

#[test]
fn single_region_centroid_is_image_center() {
    let labels = region_saliency::core_modules::region::LabelMap::new(5, 5);
    let segmentation = Segmentation::from_label_map(labels).unwrap();
    let report = pipeline().extract(&uniform_image(5, 5, 10), &segmentation).unwrap();

    let shape = report.features()[0].shape;
    assert!((shape.centroid.0 - 0.4).abs() < 1e-12);
    assert!((shape.centroid.1 - 0.4).abs() < 1e-12);
    assert_eq!(shape.raw_centroid, (2.0, 2.0));
    assert_eq!(report.area(), &[1.0]);
}

// ===== Input validation =====

#[test]
fn image_and_label_map_sizes_must_agree() {
    let segmentation = Segmentation::from_label_map(quadrant_labels(4)).unwrap();
    let err = pipeline().extract(&uniform_image(5, 5, 0), &segmentation).unwrap_err();
    assert!(matches!(err, FeatureError::MalformedSegmentation(_)));
}
