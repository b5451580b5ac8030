//! Color space conversion utilities
//!
//! Provides the perceptual measurements used in the harmonization report:
//! - 8-bit RGB to CIE Lab (D65)
//! - Mean Lab color of an image
//! - Delta E between two Lab colors

use image::RgbImage;
use palette::{FromColor, Lab, Srgb};

/// Approximate number of pixels sampled when averaging an image
const MEAN_SAMPLE_TARGET: u64 = 250_000;

/// Color converter for Lab measurements
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConverter;

impl ColorConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert RGB (0-255) to Lab color space
    ///
    /// # Arguments
    ///
    /// * `r`, `g`, `b` - RGB values in range [0, 255]
    ///
    /// # Returns
    ///
    /// Lab color in D65 illuminant
    pub fn rgb_to_lab(&self, r: u8, g: u8, b: u8) -> Lab {
        let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        Lab::from_color(srgb)
    }

    /// Mean Lab color of an image
    ///
    /// Large images are subsampled on a regular pixel stride. An empty
    /// image yields black.
    pub fn mean_lab(&self, image: &RgbImage) -> Lab {
        let pixel_count = image.width() as u64 * image.height() as u64;
        if pixel_count == 0 {
            return Lab::new(0.0, 0.0, 0.0);
        }
        let stride = (pixel_count / MEAN_SAMPLE_TARGET).max(1) as usize;

        let (mut l, mut a, mut b, mut n) = (0.0f64, 0.0f64, 0.0f64, 0u64);
        for pixel in image.pixels().step_by(stride) {
            let lab = self.rgb_to_lab(pixel.0[0], pixel.0[1], pixel.0[2]);
            l += lab.l as f64;
            a += lab.a as f64;
            b += lab.b as f64;
            n += 1;
        }

        let n = n as f64;
        Lab::new((l / n) as f32, (a / n) as f32, (b / n) as f32)
    }

    /// Compute Delta E (color difference) between two Lab colors
    ///
    /// Uses simple Euclidean distance (ΔE76).
    pub fn delta_e(&self, lab1: Lab, lab2: Lab) -> f32 {
        let dl = lab1.l - lab2.l;
        let da = lab1.a - lab2.a;
        let db = lab1.b - lab2.b;
        (dl * dl + da * da + db * db).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_and_black() {
        let converter = ColorConverter::new();
        let white = converter.rgb_to_lab(255, 255, 255);
        assert!((white.l - 100.0).abs() < 0.1);
        assert!(white.a.abs() < 0.1 && white.b.abs() < 0.1);

        let black = converter.rgb_to_lab(0, 0, 0);
        assert!(black.l.abs() < 0.1);
    }

    #[test]
    fn test_mean_lab_uniform() {
        let converter = ColorConverter::new();
        let image = RgbImage::from_pixel(10, 10, image::Rgb([200, 30, 30]));
        let mean = converter.mean_lab(&image);
        let expected = converter.rgb_to_lab(200, 30, 30);
        assert!(converter.delta_e(mean, expected) < 1e-3);
    }

    #[test]
    fn test_delta_e() {
        let converter = ColorConverter::new();
        let a = Lab::new(50.0, 0.0, 0.0);
        let b = Lab::new(53.0, 4.0, 0.0);
        assert!((converter.delta_e(a, b) - 5.0).abs() < 1e-6);
        assert_eq!(converter.delta_e(a, a), 0.0);
    }

    #[test]
    fn test_empty_image() {
        let converter = ColorConverter::new();
        let mean = converter.mean_lab(&RgbImage::new(0, 0));
        assert_eq!(mean.l, 0.0);
    }
}
