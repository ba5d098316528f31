// tests/filter_bank.rs: Loading the pretrained texture filter bank.
//
// The model layout is built byte by byte in `common::fixtures::model_stream`,
// so these tests cover the reader without a real model file.

mod common;

use common::fixtures::model_stream;
use region_saliency::core_modules::filter_bank::TEXTURE_FILTER_COUNT;
use region_saliency::{FilterBank, ModelLoadError};

fn sample_filters() -> Vec<i8> {
    // Element (r, c, k) of a 3x3x15 matrix, stored row-major.
    (0..3 * 3 * 15).map(|i| (i / 15) as i8 * if i % 2 == 0 { 1 } else { -1 }).collect()
}

// ===== Reading from memory =====

#[test]
fn reader_skips_leading_matrices() {
    let bank = FilterBank::from_reader(model_stream([3, 3, 15], &sample_filters()).as_slice()).unwrap();
    assert_eq!(bank.header(), [15, 9, 34]);
    assert_eq!(bank.len(), TEXTURE_FILTER_COUNT);

    let first = bank.kernel(0).unwrap();
    assert_eq!((first.rows(), first.cols()), (3, 3));
    // Flat index (r * 3 + c) * 15 + k; odd indices are negated.
    assert_eq!(first.weight(2, 2), 8.0);
    let second = bank.kernel(1).unwrap();
    assert_eq!(second.weight(1, 1), -4.0);
}

#[test]
fn short_stream_is_truncated() {
    let stream = model_stream([3, 3, 15], &sample_filters());
    for cut in [4, 20, stream.len() - 1] {
        let err = FilterBank::from_reader(&stream[..cut]).unwrap_err();
        assert!(matches!(err, ModelLoadError::Truncated { .. }), "cut at {cut}: {err}");
    }
}

#[test]
fn filter_matrix_must_hold_fifteen_filters() {
    let stream = model_stream([2, 2, 4], &[0; 16]);
    let err = FilterBank::from_reader(stream.as_slice()).unwrap_err();
    assert!(matches!(err, ModelLoadError::FilterShape { dims: [2, 2, 4], .. }));
}

// ===== Reading from disk =====

#[test]
fn bank_loads_from_file() {
    let path = std::env::temp_dir().join(format!("region_saliency_bank_{}.data", std::process::id()));
    std::fs::write(&path, model_stream([3, 3, 15], &sample_filters())).unwrap();
    let loaded = FilterBank::load(&path);
    std::fs::remove_file(&path).unwrap();

    let bank = loaded.unwrap();
    assert_eq!(bank.len(), TEXTURE_FILTER_COUNT);
    assert_eq!(bank, FilterBank::from_reader(model_stream([3, 3, 15], &sample_filters()).as_slice()).unwrap());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = FilterBank::load("/nonexistent/region_saliency/DrfiModel.data").unwrap_err();
    assert!(matches!(err, ModelLoadError::Io(_)));
}
