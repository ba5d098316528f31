// THEORY:
// The `filter_bank` module loads the pretrained texture filter bank and holds it
// as an immutable handle that is threaded explicitly through every extraction.
//
// Binary layout (all integers little-endian `i32`):
// 1.  A 9-byte name field, ignored.
// 2.  Three header counts.
// 3.  A sequence of matrices. Each matrix is a 5-byte tag (ignored), three
//     dimensions `(d0, d1, d2)`, then `d0 * d1 * d2` signed bytes laid out
//     row-major over `(d0, d1, d2)`.
// 4.  The first eight matrices belong to the classifier and are skipped without
//     being materialized. The ninth is the texture bank, shape `(rows, cols, 15)`:
//     filter `k` is the `rows x cols` slice at depth `k`, reinterpreted as floats.
//
// The bank is loaded once per batch and shared behind an `Arc`; there is no hidden
// global cache, so the lifetime of a loaded model is always visible at the call site.

use crate::core_modules::error::{FeatureError, ModelLoadError, Result};
use log::debug;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Number of filters the texture descriptor expects.
pub const TEXTURE_FILTER_COUNT: usize = 15;

const NAME_LEN: usize = 9;
const MATRIX_TAG_LEN: usize = 5;
const SKIPPED_MATRICES: usize = 8;
/// Upper bound on a single stored matrix; larger headers are treated as corrupt.
const MAX_MATRIX_ELEMENTS: usize = 1 << 28;

/// A dense 2-D convolution kernel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

impl Kernel {
    pub fn new(rows: usize, cols: usize, weights: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 || weights.len() != rows * cols {
            return Err(FeatureError::DimensionMismatch {
                what: "kernel weights",
                expected: rows * cols,
                actual: weights.len(),
            });
        }
        Ok(Self { rows, cols, weights })
    }

    pub fn from_fn<F>(rows: usize, cols: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> f64,
    {
        let weights = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .map(|(r, c)| f(r, c))
            .collect();
        Self::new(rows, cols, weights)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn weight(&self, row: usize, col: usize) -> f64 {
        self.weights[row * self.cols + col]
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// The pretrained bank of texture filters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    header: [i32; 3],
    kernels: Vec<Kernel>,
}

impl FilterBank {
    /// Builds a bank from in-memory kernels. Exactly `TEXTURE_FILTER_COUNT` are required.
    pub fn from_kernels(kernels: Vec<Kernel>) -> Result<Self> {
        if kernels.len() != TEXTURE_FILTER_COUNT {
            return Err(FeatureError::DimensionMismatch {
                what: "texture filters",
                expected: TEXTURE_FILTER_COUNT,
                actual: kernels.len(),
            });
        }
        Ok(Self {
            header: [0; 3],
            kernels,
        })
    }

    /// Loads a bank from a model file on disk.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ModelLoadError> {
        let path = path.as_ref();
        debug!("loading texture filter bank from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses a bank from any byte stream in the model layout.
    pub fn from_reader<R: Read>(mut reader: R) -> std::result::Result<Self, ModelLoadError> {
        read_bytes(&mut reader, NAME_LEN, "model name")?;
        let header = [
            read_i32(&mut reader, "header counts")?,
            read_i32(&mut reader, "header counts")?,
            read_i32(&mut reader, "header counts")?,
        ];

        for _ in 0..SKIPPED_MATRICES {
            let (_, len) = read_matrix_header(&mut reader)?;
            let skipped = io::copy(&mut reader.by_ref().take(len as u64), &mut io::sink())?;
            if skipped != len as u64 {
                return Err(ModelLoadError::Truncated {
                    what: "classifier matrix",
                });
            }
        }

        let (dims, len) = read_matrix_header(&mut reader)?;
        if dims[2] as usize != TEXTURE_FILTER_COUNT || dims[0] == 0 || dims[1] == 0 {
            return Err(ModelLoadError::FilterShape {
                dims,
                expected: TEXTURE_FILTER_COUNT,
            });
        }
        let bytes = read_bytes(&mut reader, len, "texture filter matrix")?;

        let (rows, cols, depth) = (dims[0] as usize, dims[1] as usize, dims[2] as usize);
        let kernels = (0..depth)
            .map(|k| Kernel {
                rows,
                cols,
                weights: (0..rows * cols)
                    .map(|rc| bytes[rc * depth + k] as i8 as f64)
                    .collect(),
            })
            .collect();

        debug!("texture filter bank: header {header:?}, {depth} filters of {rows}x{cols}");
        Ok(Self { header, kernels })
    }

    /// The three leading header counts of the model file.
    pub fn header(&self) -> [i32; 3] {
        self.header
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    pub fn kernel(&self, index: usize) -> Option<&Kernel> {
        self.kernels.get(index)
    }
}

fn read_bytes<R: Read>(
    reader: &mut R,
    len: usize,
    what: &'static str,
) -> std::result::Result<Vec<u8>, ModelLoadError> {
    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ModelLoadError::Truncated { what },
        _ => ModelLoadError::Io(e),
    })?;
    Ok(buffer)
}

fn read_i32<R: Read>(reader: &mut R, what: &'static str) -> std::result::Result<i32, ModelLoadError> {
    let bytes = read_bytes(reader, 4, what)?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Reads a matrix tag and dimensions, returning the dimensions and the element count.
fn read_matrix_header<R: Read>(reader: &mut R) -> std::result::Result<([i32; 3], usize), ModelLoadError> {
    read_bytes(reader, MATRIX_TAG_LEN, "matrix tag")?;
    let dims = [
        read_i32(reader, "matrix dimensions")?,
        read_i32(reader, "matrix dimensions")?,
        read_i32(reader, "matrix dimensions")?,
    ];
    let len = dims
        .iter()
        .try_fold(1usize, |acc, &d| usize::try_from(d).ok().and_then(|d| acc.checked_mul(d)))
        .filter(|&len| len <= MAX_MATRIX_ELEMENTS)
        .ok_or(ModelLoadError::HeaderOverflow { dims })?;
    Ok((dims, len))
}
