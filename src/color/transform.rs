//! Per-image affine color transforms

use crate::constants::histogram::MAX_VALUE;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Color channel of an RGB image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Index of the channel in an RGB pixel
    pub fn index(&self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        };
        f.write_str(name)
    }
}

/// Affine map `v -> gain * v + offset` of one channel, in 0-255 units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainOffset {
    pub gain: f64,
    pub offset: f64,
}

impl GainOffset {
    pub const IDENTITY: GainOffset = GainOffset {
        gain: 1.0,
        offset: 0.0,
    };

    pub fn new(gain: f64, offset: f64) -> Self {
        Self { gain, offset }
    }

    /// Map a channel value, rounding and clamping to the 8-bit range
    pub fn map(&self, value: u8) -> u8 {
        (self.gain * value as f64 + self.offset)
            .round()
            .clamp(0.0, MAX_VALUE) as u8
    }

    /// Lookup table of `map` over all 8-bit values
    pub fn lookup_table(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        for (value, out) in lut.iter_mut().enumerate() {
            *out = self.map(value as u8);
        }
        lut
    }
}

impl Default for GainOffset {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Gain/offset for each channel of one image
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorTransform {
    pub red: GainOffset,
    pub green: GainOffset,
    pub blue: GainOffset,
}

impl ColorTransform {
    pub fn channel(&self, channel: Channel) -> &GainOffset {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut GainOffset {
        match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
        }
    }

    pub fn is_identity(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|c| *self.channel(*c) == GainOffset::IDENTITY)
    }

    /// Apply the transform to every pixel in place
    pub fn apply(&self, image: &mut RgbImage) {
        let luts = Channel::ALL.map(|c| self.channel(c).lookup_table());
        for pixel in image.pixels_mut() {
            for (value, lut) in pixel.0.iter_mut().zip(&luts) {
                *value = lut[*value as usize];
            }
        }
    }
}
