//! Default values and fixed limits for color harmonization
//!
//! Tunables exposed through [`crate::config::HarmonizeParams`] take their
//! defaults from here; the remaining values are fixed properties of the
//! 8-bit RGB pipeline.

/// Histogram layout for 8-bit channels
pub mod histogram {
    /// Number of bins per channel histogram
    pub const BINS: usize = 256;

    /// Largest representable channel value
    pub const MAX_VALUE: f64 = 255.0;

    /// Number of quantile levels compared per image pair and channel
    pub const DEFAULT_QUANTILE_COUNT: usize = 19;
}

/// Region selection defaults
pub mod selection {
    /// Minimum number of selected pixels in each image of a pair
    pub const DEFAULT_MIN_OVERLAP_PIXELS: usize = 100;

    /// Minimum disc radius drawn around a matched feature, in pixels
    pub const DEFAULT_MIN_POINT_RADIUS: f32 = 3.0;

    /// Number of cells a virtual line is split into
    pub const DEFAULT_VLD_SEGMENTS: usize = 10;

    /// Thickness of accepted virtual lines in the masks, in pixels
    pub const DEFAULT_VLD_THICKNESS: f32 = 2.0;

    /// Maximum normalized descriptor distance for two lines to agree
    pub const DEFAULT_VLD_THRESHOLD: f32 = 0.35;

    /// Shortest virtual line considered, in pixels
    pub const DEFAULT_VLD_MIN_LENGTH: f32 = 10.0;

    /// Longest virtual line considered, in pixels
    pub const DEFAULT_VLD_MAX_LENGTH: f32 = 400.0;

    /// Number of nearest matches each match is paired with
    pub const DEFAULT_VLD_NEIGHBORS: usize = 10;

    /// Number of gradient orientation bins in a VLD cell
    pub const VLD_ORIENTATION_BINS: usize = 8;
}

/// Global solver defaults
pub mod solver {
    /// Lawson reweighting iterations
    pub const DEFAULT_MAX_ITERATIONS: usize = 200;

    /// Relative change of the max residual below which iterations stop
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;

    /// Ridge toward the identity transform, relative to the mean diagonal
    /// of the weighted normal matrix
    pub const RIDGE_WEIGHT: f64 = 1e-9;

    /// Smallest accepted gain
    pub const DEFAULT_GAIN_MIN: f64 = 0.2;

    /// Largest accepted gain
    pub const DEFAULT_GAIN_MAX: f64 = 5.0;
}

/// Output naming
pub mod output {
    /// Report written next to the harmonized images
    pub const REPORT_FILE_NAME: &str = "harmonization.json";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vld_length_bounds() {
        assert!(
            selection::DEFAULT_VLD_MIN_LENGTH < selection::DEFAULT_VLD_MAX_LENGTH
        );
    }

    #[test]
    fn test_gain_bounds() {
        assert!(solver::DEFAULT_GAIN_MIN > 0.0);
        assert!(
            solver::DEFAULT_GAIN_MIN < 1.0 && solver::DEFAULT_GAIN_MAX > 1.0
        );
    }
}
