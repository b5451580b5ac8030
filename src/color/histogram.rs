//! Per-channel color histograms of masked image regions

use crate::constants::histogram::BINS;
use crate::selection::Mask;
use image::RgbImage;

/// 256-bin histogram of one 8-bit channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHistogram {
    bins: [u64; BINS],
    total: u64,
}

impl Default for ChannelHistogram {
    fn default() -> Self {
        Self {
            bins: [0; BINS],
            total: 0,
        }
    }
}

impl ChannelHistogram {
    /// Count one sample
    pub fn add(&mut self, value: u8) {
        self.bins[value as usize] += 1;
        self.total += 1;
    }

    /// Number of samples
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn bin(&self, value: u8) -> u64 {
        self.bins[value as usize]
    }

    /// Smallest value whose cumulative share reaches `q`
    ///
    /// Returns `None` for an empty histogram.
    pub fn quantile(&self, q: f64) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let target = (q.clamp(0.0, 1.0) * self.total as f64).ceil().max(1.0) as u64;
        let mut cumulative = 0;
        for (value, count) in self.bins.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return Some(value as u8);
            }
        }
        Some(u8::MAX)
    }
}

/// Red, green and blue histograms of a masked region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RgbHistogram {
    pub channels: [ChannelHistogram; 3],
}

impl RgbHistogram {
    /// Histogram of the pixels of `image` selected by `mask`
    pub fn from_image_mask(image: &RgbImage, mask: &Mask) -> Self {
        let mut hist = Self::default();
        for (x, y, pixel) in image.enumerate_pixels() {
            if mask.get(x, y) {
                for (channel, value) in hist.channels.iter_mut().zip(pixel.0) {
                    channel.add(value);
                }
            }
        }
        hist
    }

    /// Number of pixels counted
    pub fn total(&self) -> u64 {
        self.channels[0].total()
    }
}

/// Quantile levels `(k + 1) / (count + 1)` for `k` in `0..count`
pub fn quantile_levels(count: usize) -> Vec<f64> {
    (0..count)
        .map(|k| (k + 1) as f64 / (count + 1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile() {
        let mut hist = ChannelHistogram::default();
        for v in [10u8, 20, 30, 40] {
            hist.add(v);
        }
        assert_eq!(hist.quantile(0.0), Some(10));
        assert_eq!(hist.quantile(0.25), Some(10));
        assert_eq!(hist.quantile(0.26), Some(20));
        assert_eq!(hist.quantile(0.5), Some(20));
        assert_eq!(hist.quantile(1.0), Some(40));
    }

    #[test]
    fn test_empty_quantile() {
        assert_eq!(ChannelHistogram::default().quantile(0.5), None);
    }

    #[test]
    fn test_masked_histogram() {
        let image = RgbImage::from_fn(4, 4, |x, _| image::Rgb([x as u8, 100, 200]));
        let mut mask = Mask::new(4, 4);
        mask.set(1, 0);
        mask.set(3, 2);

        let hist = RgbHistogram::from_image_mask(&image, &mask);
        assert_eq!(hist.total(), 2);
        assert_eq!(hist.channels[0].bin(1), 1);
        assert_eq!(hist.channels[0].bin(3), 1);
        assert_eq!(hist.channels[1].bin(100), 2);
        assert_eq!(hist.channels[2].quantile(0.5), Some(200));
    }

    #[test]
    fn test_quantile_levels() {
        assert_eq!(quantile_levels(3), vec![0.25, 0.5, 0.75]);
    }
}
