// One file per extractor, plus the shared building blocks they reduce through.

pub mod affinity;
pub mod area;
pub mod background;
pub mod channel;
pub mod color;
pub mod contrast;
pub mod convolution;
pub mod edges;
pub mod error;
pub mod feature;
pub mod filter_bank;
pub mod matrix;
pub mod region;
pub mod shape;
pub mod stats;
pub mod texture;
pub mod uniformity;
