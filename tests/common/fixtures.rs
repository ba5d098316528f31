// Synthetic inputs shared by the integration tests.

use image::{Luma, Rgb, RgbImage};
use region_saliency::FilterBank;
use region_saliency::core_modules::filter_bank::{Kernel, TEXTURE_FILTER_COUNT};
use region_saliency::core_modules::region::LabelMap;

pub const QUADRANT_COLORS: [[u8; 3]; 4] = [[200, 30, 30], [30, 200, 30], [30, 30, 200], [240, 240, 240]];

/// A `size x size` label map split into four equal quadrants, labelled row-major.
pub fn quadrant_labels(size: u32) -> LabelMap {
    let half = size / 2;
    LabelMap::from_fn(size, size, |x, y| Luma([(y / half) * 2 + x / half]))
}

/// One flat color per quadrant, matching `quadrant_labels`.
pub fn quadrant_image(size: u32) -> RgbImage {
    let half = size / 2;
    RgbImage::from_fn(size, size, |x, y| {
        Rgb(QUADRANT_COLORS[((y / half) * 2 + x / half) as usize])
    })
}

pub fn uniform_image(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// Fifteen 3x3 identity kernels: every response equals the normalized gray image.
pub fn identity_bank() -> FilterBank {
    let identity = Kernel::from_fn(3, 3, |r, c| if r == 1 && c == 1 { 1.0 } else { 0.0 }).unwrap();
    FilterBank::from_kernels(vec![identity; TEXTURE_FILTER_COUNT]).unwrap()
}

fn push_matrix(stream: &mut Vec<u8>, dims: [i32; 3], data: &[i8]) {
    stream.extend_from_slice(b"mtx01");
    for d in dims {
        stream.extend_from_slice(&d.to_le_bytes());
    }
    stream.extend(data.iter().map(|&v| v as u8));
}

/// A model byte stream: name, three header counts, eight ignored matrices and
/// the texture filter matrix `filter_dims` holding `filter_data` row-major.
pub fn model_stream(filter_dims: [i32; 3], filter_data: &[i8]) -> Vec<u8> {
    let mut stream = b"DrfiModel".to_vec();
    for count in [15i32, 9, 34] {
        stream.extend_from_slice(&count.to_le_bytes());
    }
    for i in 0..8 {
        push_matrix(&mut stream, [2, 1, 2], &[i, i, -i, 0]);
    }
    push_matrix(&mut stream, filter_dims, filter_data);
    stream
}
