//! Harmonization report
//!
//! Summary of a run written as `harmonization.json` next to the corrected
//! images: which reference and pairs were used, the remaining disagreement
//! per channel, and each view's transform with its mean-color distance to
//! the reference before and after correction.

use crate::color::{Channel, ColorTransform};
use crate::config::{DescriberType, GeometricModel, SelectionMethod};
use crate::error::{HarmonizeError, Result};
use crate::sfm::{Pair, ViewId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one harmonization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonizationReport {
    /// View every other view was mapped onto
    pub reference_view: ViewId,
    /// Region selection used
    pub selection_method: SelectionMethod,
    /// Geometric model of the matches
    pub geometric_model: GeometricModel,
    /// Describer types whose matches were read
    pub describer_types: Vec<DescriberType>,
    /// Pairs that contributed constraints
    pub pairs_used: Vec<Pair>,
    /// Pairs skipped for lack of selected pixels
    pub pairs_skipped: Vec<Pair>,
    /// Scene views that were not harmonized
    pub excluded_views: Vec<ViewId>,
    /// Solver summary per channel
    pub channels: Vec<ChannelReport>,
    /// Harmonized views in ascending id order
    pub views: Vec<ViewReport>,
}

/// Solver summary of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: Channel,
    /// Largest quantile disagreement left, in 0-255 units
    pub max_residual: f64,
    pub iterations: usize,
}

/// Per-view result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewReport {
    pub view_id: ViewId,
    /// Written image
    pub output_path: PathBuf,
    pub transform: ColorTransform,
    /// ΔE76 between this view's mean color and the reference's, before correction
    pub delta_e_before: f32,
    /// Same distance after correction
    pub delta_e_after: f32,
}

impl HarmonizationReport {
    /// Report entry of a view
    pub fn view(&self, view_id: ViewId) -> Option<&ViewReport> {
        self.views.iter().find(|v| v.view_id == view_id)
    }

    /// Largest residual over the three channels
    pub fn max_residual(&self) -> f64 {
        self.channels
            .iter()
            .map(|c| c.max_residual)
            .fold(0.0, f64::max)
    }

    /// Write the report as pretty JSON
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| HarmonizeError::report(path, "cannot serialize report", e))?;
        std::fs::write(path, json).map_err(|e| HarmonizeError::io(path, e))
    }

    /// Read a report back
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HarmonizeError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| HarmonizeError::report(path, "invalid report JSON", e))
    }
}
