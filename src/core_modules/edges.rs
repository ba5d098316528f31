// THEORY:
// The `edges` module gives each region a perimeter proxy: the number of its
// pixels that sit on a boundary, divided by the image area.
//
// A pixel is a boundary pixel when it lies on the image border (first or last row,
// first or last column), or, for interior pixels only, when any of its four direct
// neighbours carries a different label. The border test runs first, so the
// neighbour lookup never leaves the image. Each pixel contributes at most once.

use crate::core_modules::region::{LabelMap, Region};

/// Whether the pixel at `(row, col)` lies on the image border or next to another label.
pub fn is_boundary_pixel(labels: &LabelMap, row: u32, col: u32) -> bool {
    let (width, height) = labels.dimensions();
    if row == 0 || col == 0 || row + 1 >= height || col + 1 >= width {
        return true;
    }
    let label = labels.get_pixel(col, row).0[0];
    [
        (row - 1, col),
        (row + 1, col),
        (row, col - 1),
        (row, col + 1),
    ]
    .iter()
    .any(|&(r, c)| labels.get_pixel(c, r).0[0] != label)
}

/// Count of boundary pixels in `region`, normalized by `H * W`.
pub fn perimeter_proxy(region: &Region, labels: &LabelMap) -> f64 {
    let area = labels.width() as f64 * labels.height() as f64;
    let count = region
        .pixels()
        .filter(|&(row, col)| is_boundary_pixel(labels, row, col))
        .count();
    count as f64 / area
}
