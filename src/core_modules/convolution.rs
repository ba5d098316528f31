// convolution.rs: dense 2-D filtering with a replicate border.
//
// The texture extractor treats convolution as a collaborator behind the
// `Convolver` trait. `ReplicateConvolver` is the default:
//
//   dst(y, x) = sum_{i, j} k(i, j) * src(clamp(y + i - ay), clamp(x + j - ax))
//
// i.e. correlation (the kernel is not flipped) with the anchor at the kernel
// center `(ay, ax) = (rows / 2, cols / 2)`. Samples falling outside the image are
// clamped to the nearest edge pixel. Rows of the output are independent and are
// computed in parallel.

use crate::core_modules::channel::FloatPlane;
use crate::core_modules::filter_bank::Kernel;
use rayon::prelude::*;

/// Dense 2-D filtering collaborator.
pub trait Convolver: Send + Sync {
    /// Filters `src` with `kernel`, returning a plane of the same size.
    fn filter(&self, src: &FloatPlane, kernel: &Kernel) -> FloatPlane;
}

/// Correlation with a centered anchor and replicated borders.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicateConvolver;

impl Convolver for ReplicateConvolver {
    fn filter(&self, src: &FloatPlane, kernel: &Kernel) -> FloatPlane {
        let (width, height) = src.dimensions();
        let mut dst = FloatPlane::new(width, height);
        if width == 0 || height == 0 {
            return dst;
        }

        let w = width as isize;
        let h = height as isize;
        let anchor_y = (kernel.rows() / 2) as isize;
        let anchor_x = (kernel.cols() / 2) as isize;
        let data = src.as_raw();

        dst.par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, out_row)| {
                for (x, out) in out_row.iter_mut().enumerate() {
                    let mut acc = 0.0f64;
                    for ki in 0..kernel.rows() {
                        let sy = (y as isize + ki as isize - anchor_y).clamp(0, h - 1) as usize;
                        let src_row = &data[sy * width as usize..(sy + 1) * width as usize];
                        for kj in 0..kernel.cols() {
                            let sx = (x as isize + kj as isize - anchor_x).clamp(0, w - 1) as usize;
                            acc += kernel.weight(ki, kj) * src_row[sx];
                        }
                    }
                    *out = acc;
                }
            });

        dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ramp(width: u32, height: u32) -> FloatPlane {
        FloatPlane::from_fn(width, height, |x, y| Luma([(y * width + x) as f64]))
    }

    #[test]
    fn identity_kernel_is_a_copy() {
        let src = ramp(5, 4);
        let kernel = Kernel::from_fn(3, 3, |r, c| if r == 1 && c == 1 { 1.0 } else { 0.0 }).unwrap();
        let dst = ReplicateConvolver.filter(&src, &kernel);
        assert_eq!(dst, src);
    }

    #[test]
    fn kernel_is_not_flipped() {
        // Picks the right-hand neighbour; a flipped kernel would pick the left one.
        let src = ramp(4, 1);
        let kernel = Kernel::new(1, 3, vec![0.0, 0.0, 1.0]).unwrap();
        let dst = ReplicateConvolver.filter(&src, &kernel);
        let values: Vec<f64> = dst.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn borders_replicate_edge_pixels() {
        let src = ramp(3, 1);
        let kernel = Kernel::new(1, 5, vec![1.0; 5]).unwrap();
        let dst = ReplicateConvolver.filter(&src, &kernel);
        // x = 0 sees [0, 0, 0, 1, 2].
        assert_eq!(dst.get_pixel(0, 0).0[0], 3.0);
        // x = 2 sees [0, 1, 2, 2, 2].
        assert_eq!(dst.get_pixel(2, 0).0[0], 7.0);
    }

    #[test]
    fn constant_image_scales_by_kernel_sum() {
        let src = FloatPlane::from_pixel(6, 6, Luma([0.5]));
        let kernel = Kernel::from_fn(7, 7, |_, _| 2.0).unwrap();
        let dst = ReplicateConvolver.filter(&src, &kernel);
        assert!(dst.pixels().all(|p| (p.0[0] - 49.0).abs() < 1e-9));
    }
}
