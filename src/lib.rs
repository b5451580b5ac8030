//! # Color Harmonize
//!
//! Global color harmonization of structure-from-motion image sets.
//!
//! Photos of one scene taken with varying exposure and white balance look
//! inconsistent once stitched into a texture. This crate brings every image
//! of a matched scene into the color space of a reference image by:
//! - Selecting corresponding regions of each matched pair (full frame,
//!   discs around matched features, or virtual line segments)
//! - Comparing per-channel histogram quantiles of those regions
//! - Solving one gain/offset per image and channel that minimizes the
//!   largest disagreement over all pairs (L-infinity)
//! - Writing the corrected images and a JSON report
//!
//! ## Example
//!
//! ```rust,no_run
//! use colorharmonize::{ColorHarmonizationEngine, HarmonizeConfig};
//!
//! let config = HarmonizeConfig::new("scene/sfm_data.json", "scene/matches", "scene/harmonized");
//! let report = ColorHarmonizationEngine::new(config).process()?;
//! println!("reference view {}, max residual {:.2}", report.reference_view, report.max_residual());
//! # Ok::<(), colorharmonize::HarmonizeError>(())
//! ```

pub mod color;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod image_loader;
pub mod report;
pub mod selection;
pub mod sfm;

pub use config::{DescriberType, GeometricModel, HarmonizeConfig, HarmonizeParams, SelectionMethod};
pub use engine::ColorHarmonizationEngine;
pub use error::{HarmonizeError, Result};
pub use report::HarmonizationReport;

/// Harmonize a scene with the given configuration
///
/// Shorthand for building a [`ColorHarmonizationEngine`] and running it.
pub fn harmonize(config: HarmonizeConfig) -> Result<HarmonizationReport> {
    ColorHarmonizationEngine::new(config).process()
}
