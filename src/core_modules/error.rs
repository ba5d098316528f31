// THEORY:
// The `error` module defines the two failure families of the feature engine.
//
// 1.  **Model loading** (`ModelLoadError`): the pretrained filter bank is read once
//     from a binary stream. A truncated stream, a header whose dimensions overflow
//     or go negative, or a filter matrix of the wrong shape are all surfaced to the
//     caller. Loading is a one-time startup dependency, so nothing is retried here.
// 2.  **Extraction** (`FeatureError`): a segmentation that is not a proper partition
//     of the image fails fast with `MalformedSegmentation`; a caller-supplied
//     feature whose length does not match the region count fails with
//     `DimensionMismatch`.
//
// Numeric edge cases (single-pixel regions, zero-width regions, empty histogram
// bins) are not errors: they are absorbed by the additive guards documented in
// the extractors themselves.

use thiserror::Error;

/// Failure while reading a pretrained filter bank.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read filter bank")]
    Io(#[from] std::io::Error),
    #[error("filter bank stream ended while reading {what}")]
    Truncated { what: &'static str },
    #[error("matrix header {dims:?} is negative or too large")]
    HeaderOverflow { dims: [i32; 3] },
    #[error("texture filter matrix has shape {dims:?}, expected {expected} filters in the last dimension")]
    FilterShape { dims: [i32; 3], expected: usize },
}

/// Failure while extracting region features.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("malformed segmentation: {0}")]
    MalformedSegmentation(String),
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
}

pub type Result<T> = std::result::Result<T, FeatureError>;

impl FeatureError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        FeatureError::MalformedSegmentation(message.into())
    }
}
