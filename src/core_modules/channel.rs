// THEORY:
// The `channel` module produces the dense per-pixel planes every color statistic
// is computed from: R, G, B, L, a, b, H, S, V and a grayscale image.
//
// Key architectural principles:
// 1.  **Explicit Channel Order**: The stacking order is an enumerated constant
//     (`Channel::ALL`), never a positional convention. Feature columns, contrast
//     queries and tests all name channels through the enum, so the order cannot
//     drift silently between modules.
// 2.  **Delegated Conversion**: Color-space conversion is a collaborator, not part
//     of this engine. `ColorConverter` is the seam; `PaletteConverter` is the
//     default implementation built on the `palette` crate and the `image` crate's
//     Rec. 601 grayscale. Channel ranges are whatever the converter produces.
// 3.  **Computed Once, Shared Read-Only**: `ChannelMaps` is built once per image and
//     then only borrowed by the extractors, which may run in parallel.

use image::{GrayImage, ImageBuffer, Luma, Rgb, Rgb32FImage, RgbImage};
use palette::white_point::D65;
use palette::{FromColor, Hsv, Lab, Srgb};

/// A dense single-channel floating point plane.
pub type FloatPlane = ImageBuffer<Luma<f64>, Vec<f64>>;

/// The nine color channels, in stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Lightness,
    GreenRed,
    BlueYellow,
    Hue,
    Saturation,
    Value,
}

impl Channel {
    pub const COUNT: usize = 9;

    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Red,
        Channel::Green,
        Channel::Blue,
        Channel::Lightness,
        Channel::GreenRed,
        Channel::BlueYellow,
        Channel::Hue,
        Channel::Saturation,
        Channel::Value,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "R",
            Channel::Green => "G",
            Channel::Blue => "B",
            Channel::Lightness => "L",
            Channel::GreenRed => "a",
            Channel::BlueYellow => "b",
            Channel::Hue => "H",
            Channel::Saturation => "S",
            Channel::Value => "V",
        }
    }
}

/// Color-space conversion collaborator.
pub trait ColorConverter: Send + Sync {
    /// RGB to CIE Lab, one `[L, a, b]` triple per pixel.
    fn to_lab(&self, rgb: &RgbImage) -> Rgb32FImage;
    /// RGB to HSV, one `[H, S, V]` triple per pixel.
    fn to_hsv(&self, rgb: &RgbImage) -> Rgb32FImage;
    /// RGB to 8-bit grayscale.
    fn to_gray(&self, rgb: &RgbImage) -> GrayImage;
}

/// Default converter: `palette` for Lab (D65) and HSV, Rec. 601 luma for gray.
///
/// - Lab: L in [0, 100], a and b roughly in [-128, 127].
/// - HSV: H in degrees [0, 360), S and V in [0, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteConverter;

impl PaletteConverter {
    fn srgb(pixel: &Rgb<u8>) -> Srgb<f32> {
        Srgb::new(
            pixel.0[0] as f32 / 255.0,
            pixel.0[1] as f32 / 255.0,
            pixel.0[2] as f32 / 255.0,
        )
    }
}

impl ColorConverter for PaletteConverter {
    fn to_lab(&self, rgb: &RgbImage) -> Rgb32FImage {
        ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
            let lab: Lab<D65, f32> = Lab::from_color(Self::srgb(rgb.get_pixel(x, y)));
            Rgb([lab.l, lab.a, lab.b])
        })
    }

    fn to_hsv(&self, rgb: &RgbImage) -> Rgb32FImage {
        ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
            let hsv: Hsv = Hsv::from_color(Self::srgb(rgb.get_pixel(x, y)));
            Rgb([hsv.hue.into_positive_degrees(), hsv.saturation, hsv.value])
        })
    }

    fn to_gray(&self, rgb: &RgbImage) -> GrayImage {
        GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
            Luma([luma.round().clamp(0.0, 255.0) as u8])
        })
    }
}

/// Per-pixel planes for the nine color channels plus grayscale.
#[derive(Debug, Clone)]
pub struct ChannelMaps {
    planes: Vec<FloatPlane>,
    gray: GrayImage,
}

impl ChannelMaps {
    pub fn build(rgb: &RgbImage, converter: &dyn ColorConverter) -> Self {
        let (width, height) = rgb.dimensions();
        let lab = converter.to_lab(rgb);
        let hsv = converter.to_hsv(rgb);

        let planes = Channel::ALL
            .iter()
            .map(|&channel| {
                FloatPlane::from_fn(width, height, |x, y| {
                    let value = match channel {
                        Channel::Red => rgb.get_pixel(x, y).0[0] as f32,
                        Channel::Green => rgb.get_pixel(x, y).0[1] as f32,
                        Channel::Blue => rgb.get_pixel(x, y).0[2] as f32,
                        Channel::Lightness => lab.get_pixel(x, y).0[0],
                        Channel::GreenRed => lab.get_pixel(x, y).0[1],
                        Channel::BlueYellow => lab.get_pixel(x, y).0[2],
                        Channel::Hue => hsv.get_pixel(x, y).0[0],
                        Channel::Saturation => hsv.get_pixel(x, y).0[1],
                        Channel::Value => hsv.get_pixel(x, y).0[2],
                    };
                    Luma([value as f64])
                })
            })
            .collect();

        Self {
            planes,
            gray: converter.to_gray(rgb),
        }
    }

    pub fn plane(&self, channel: Channel) -> &FloatPlane {
        &self.planes[channel.index()]
    }

    /// Value of `channel` at `(row, col)`.
    pub fn value(&self, channel: Channel, row: u32, col: u32) -> f64 {
        self.planes[channel.index()].get_pixel(col, row).0[0]
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Grayscale scaled to [0, 1], the input of the texture filter bank.
    pub fn gray_normalized(&self) -> FloatPlane {
        FloatPlane::from_fn(self.gray.width(), self.gray.height(), |x, y| {
            Luma([self.gray.get_pixel(x, y).0[0] as f64 / 255.0])
        })
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_order_is_fixed() {
        for (position, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), position);
        }
        assert_eq!(Channel::Lightness.name(), "L");
    }

    #[test]
    fn pure_red_converts_to_expected_ranges() {
        let rgb = RgbImage::from_pixel(2, 1, Rgb([255, 0, 0]));
        let maps = ChannelMaps::build(&rgb, &PaletteConverter);

        assert_eq!(maps.value(Channel::Red, 0, 1), 255.0);
        assert_eq!(maps.value(Channel::Green, 0, 1), 0.0);
        assert!((maps.value(Channel::Hue, 0, 0)).abs() < 1e-3);
        assert!((maps.value(Channel::Saturation, 0, 0) - 1.0).abs() < 1e-5);
        assert!((maps.value(Channel::Value, 0, 0) - 1.0).abs() < 1e-5);
        // sRGB red is roughly L=53, a=80, b=67 under D65.
        assert!((maps.value(Channel::Lightness, 0, 0) - 53.2).abs() < 1.0);
        assert!(maps.value(Channel::GreenRed, 0, 0) > 70.0);
    }

    #[test]
    fn gray_is_normalized_to_unit_range() {
        let rgb = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let maps = ChannelMaps::build(&rgb, &PaletteConverter);
        assert_eq!(maps.gray().get_pixel(0, 0).0[0], 255);
        assert_eq!(maps.gray_normalized().get_pixel(0, 0).0[0], 1.0);
    }

    #[test]
    fn gray_uses_rec601_weights() {
        let rgb = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        let gray = PaletteConverter.to_gray(&rgb);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
    }
}
