//! Configuration for the color harmonization pipeline.
//!
//! This module defines the run configuration collected from the command
//! line, the enumerations it is built from, and the tunable parameters of
//! region selection and the global solve.
//!
//! # Configuration Loading
//!
//! Tunables can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use colorharmonize::config::HarmonizeParams;
//! use std::path::Path;
//!
//! // Load from file
//! let params = HarmonizeParams::from_json_file(Path::new("params.json"))?;
//!
//! // Or use defaults
//! let params = HarmonizeParams::default();
//! # Ok::<(), colorharmonize::HarmonizeError>(())
//! ```

use crate::constants::{histogram, selection, solver};
use crate::error::{HarmonizeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Feature describer a features/matches set was produced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DescriberType {
    /// SIFT with unsigned char descriptors
    Sift,
    /// SIFT stored as float
    SiftFloat,
    /// AKAZE with floating point descriptors
    Akaze,
    /// AKAZE with binary descriptors
    AkazeMldb,
    /// CCTag markers with 3 crowns
    Cctag3,
    /// CCTag markers with 4 crowns
    Cctag4,
    /// OpenCV SIFT
    SiftOcv,
    /// OpenCV AKAZE
    AkazeOcv,
}

impl DescriberType {
    /// All known describer types
    pub const ALL: [DescriberType; 8] = [
        DescriberType::Sift,
        DescriberType::SiftFloat,
        DescriberType::Akaze,
        DescriberType::AkazeMldb,
        DescriberType::Cctag3,
        DescriberType::Cctag4,
        DescriberType::SiftOcv,
        DescriberType::AkazeOcv,
    ];

    /// Name as written on the command line and in matches files
    pub fn name(&self) -> &'static str {
        match self {
            DescriberType::Sift => "SIFT",
            DescriberType::SiftFloat => "SIFT_FLOAT",
            DescriberType::Akaze => "AKAZE",
            DescriberType::AkazeMldb => "AKAZE_MLDB",
            DescriberType::Cctag3 => "CCTAG3",
            DescriberType::Cctag4 => "CCTAG4",
            DescriberType::SiftOcv => "SIFT_OCV",
            DescriberType::AkazeOcv => "AKAZE_OCV",
        }
    }

    /// Suffix used in feature file names (`<viewId>.<suffix>.feat`)
    pub fn file_suffix(&self) -> String {
        self.name().to_lowercase()
    }
}

impl fmt::Display for DescriberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DescriberType {
    type Err = HarmonizeError;

    fn from_str(s: &str) -> Result<Self> {
        DescriberType::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| HarmonizeError::invalid_parameter("describerMethods", s))
    }
}

/// Parse a comma separated describer list such as `"SIFT,AKAZE"`
pub fn describer_types_from_str(list: &str) -> Result<Vec<DescriberType>> {
    let mut types = Vec::new();
    for item in list.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(HarmonizeError::invalid_parameter("describerMethods", list));
        }
        let describer: DescriberType = item.parse()?;
        if !types.contains(&describer) {
            types.push(describer);
        }
    }
    Ok(types)
}

/// Geometric model the matches were filtered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometricModel {
    /// Fundamental matrix ('f')
    Fundamental,
    /// Essential matrix ('e')
    Essential,
    /// Homography ('h')
    Homography,
}

impl GeometricModel {
    /// One-letter code used on the command line and in file names
    pub fn code(&self) -> char {
        match self {
            GeometricModel::Fundamental => 'f',
            GeometricModel::Essential => 'e',
            GeometricModel::Homography => 'h',
        }
    }

    /// Name of the matches file for this model
    pub fn matches_file_name(&self) -> String {
        format!("matches.{}.txt", self.code())
    }
}

impl FromStr for GeometricModel {
    type Err = HarmonizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f" => Ok(GeometricModel::Fundamental),
            "e" => Ok(GeometricModel::Essential),
            "h" => Ok(GeometricModel::Homography),
            _ => Err(HarmonizeError::invalid_parameter(
                "matchesGeometricModel",
                s,
            )),
        }
    }
}

/// Strategy used to pick the pixels compared between two images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Whole images
    FullFrame,
    /// Discs around matched features
    MatchedPoints,
    /// Virtual line segments between matched features
    VldSegment,
}

impl SelectionMethod {
    /// Map the numeric command line code; `-1` means unset
    pub fn from_code(code: i32) -> Result<Option<Self>> {
        match code {
            -1 => Ok(None),
            0 => Ok(Some(SelectionMethod::FullFrame)),
            1 => Ok(Some(SelectionMethod::MatchedPoints)),
            2 => Ok(Some(SelectionMethod::VldSegment)),
            _ => Err(HarmonizeError::invalid_parameter("selectionMethod", code)),
        }
    }

    /// Whether this method reads feature positions
    pub fn needs_features(&self) -> bool {
        !matches!(self, SelectionMethod::FullFrame)
    }
}

/// Complete configuration of one harmonization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonizeConfig {
    /// Path to the sfm_data JSON file
    pub sfm_data_path: PathBuf,

    /// Directory holding features and matches
    pub matches_dir: PathBuf,

    /// Describer types whose matches are used
    pub describer_types: Vec<DescriberType>,

    /// Geometric model the matches were filtered with
    pub geometric_model: GeometricModel,

    /// Output directory for harmonized images and the report
    pub output_dir: PathBuf,

    /// Region selection strategy; `None` picks the default
    pub selection_method: Option<SelectionMethod>,

    /// Reference view id; `None` picks the best connected view
    pub reference_view: Option<u32>,

    /// Tunable parameters
    #[serde(default)]
    pub params: HarmonizeParams,
}

impl HarmonizeConfig {
    /// Create a configuration with default tunables
    pub fn new(
        sfm_data_path: impl Into<PathBuf>,
        matches_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sfm_data_path: sfm_data_path.into(),
            matches_dir: matches_dir.into(),
            describer_types: vec![DescriberType::Sift],
            geometric_model: GeometricModel::Fundamental,
            output_dir: output_dir.into(),
            selection_method: None,
            reference_view: None,
            params: HarmonizeParams::default(),
        }
    }

    /// Check that every path and parameter is usable
    pub fn validate(&self) -> Result<()> {
        if self.sfm_data_path.as_os_str().is_empty() {
            return Err(HarmonizeError::invalid_parameter("input_file", ""));
        }
        if self.matches_dir.as_os_str().is_empty() {
            return Err(HarmonizeError::invalid_parameter("matchesDir", ""));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(HarmonizeError::invalid_parameter("outdir", ""));
        }
        if self.describer_types.is_empty() {
            return Err(HarmonizeError::invalid_parameter("describerMethods", ""));
        }
        self.params.validate()
    }
}

/// Tunable parameters of selection and solving.
///
/// Every field has a default, so a JSON file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizeParams {
    /// Quantile levels compared per pair and channel
    pub quantile_count: usize,

    /// Pairs with fewer selected pixels in either image are skipped
    pub min_overlap_pixels: usize,

    /// Minimum disc radius around matched points
    pub min_point_radius: f32,

    /// Virtual line descriptor settings
    pub vld: VldParams,

    /// Lawson reweighting iterations
    pub max_iterations: usize,

    /// Convergence tolerance on the max residual
    pub tolerance: f64,

    /// Smallest accepted gain
    pub gain_min: f64,

    /// Largest accepted gain
    pub gain_max: f64,
}

/// Virtual line descriptor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VldParams {
    /// Cells per line
    pub segments: usize,
    /// Drawn line thickness in pixels
    pub thickness: f32,
    /// Maximum normalized descriptor distance
    pub threshold: f32,
    /// Shortest line in pixels
    pub min_length: f32,
    /// Longest line in pixels
    pub max_length: f32,
    /// Nearest matches paired with each match
    pub neighbors: usize,
}

impl Default for HarmonizeParams {
    fn default() -> Self {
        Self {
            quantile_count: histogram::DEFAULT_QUANTILE_COUNT,
            min_overlap_pixels: selection::DEFAULT_MIN_OVERLAP_PIXELS,
            min_point_radius: selection::DEFAULT_MIN_POINT_RADIUS,
            vld: VldParams::default(),
            max_iterations: solver::DEFAULT_MAX_ITERATIONS,
            tolerance: solver::DEFAULT_TOLERANCE,
            gain_min: solver::DEFAULT_GAIN_MIN,
            gain_max: solver::DEFAULT_GAIN_MAX,
        }
    }
}

impl Default for VldParams {
    fn default() -> Self {
        Self {
            segments: selection::DEFAULT_VLD_SEGMENTS,
            thickness: selection::DEFAULT_VLD_THICKNESS,
            threshold: selection::DEFAULT_VLD_THRESHOLD,
            min_length: selection::DEFAULT_VLD_MIN_LENGTH,
            max_length: selection::DEFAULT_VLD_MAX_LENGTH,
            neighbors: selection::DEFAULT_VLD_NEIGHBORS,
        }
    }
}

impl HarmonizeParams {
    /// Load parameters from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HarmonizeError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            HarmonizeError::invalid_parameter("config", format!("{}: {}", path.display(), e))
        })
    }

    /// Save parameters to a JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| HarmonizeError::invalid_parameter("config", e))?;
        std::fs::write(path, json).map_err(|e| HarmonizeError::io(path, e))
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.quantile_count < 2 {
            return Err(HarmonizeError::invalid_parameter(
                "quantile_count",
                self.quantile_count,
            ));
        }
        if self.min_point_radius <= 0.0 {
            return Err(HarmonizeError::invalid_parameter(
                "min_point_radius",
                self.min_point_radius,
            ));
        }
        if !(self.gain_min > 0.0 && self.gain_min < self.gain_max) {
            return Err(HarmonizeError::invalid_parameter(
                "gain_min/gain_max",
                format!("{}/{}", self.gain_min, self.gain_max),
            ));
        }
        if self.max_iterations == 0 {
            return Err(HarmonizeError::invalid_parameter("max_iterations", 0));
        }
        let vld = &self.vld;
        if vld.segments == 0 || vld.neighbors == 0 {
            return Err(HarmonizeError::invalid_parameter(
                "vld.segments/vld.neighbors",
                format!("{}/{}", vld.segments, vld.neighbors),
            ));
        }
        if vld.thickness <= 0.0 || vld.min_length >= vld.max_length {
            return Err(HarmonizeError::invalid_parameter(
                "vld",
                format!(
                    "thickness {} length {}..{}",
                    vld.thickness, vld.min_length, vld.max_length
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describer_list() {
        let types = describer_types_from_str("SIFT, AKAZE_MLDB").unwrap();
        assert_eq!(types, vec![DescriberType::Sift, DescriberType::AkazeMldb]);

        assert!(describer_types_from_str("SIFT,,AKAZE").is_err());
        assert!(describer_types_from_str("sift").is_err());
        assert!(describer_types_from_str("ORB").is_err());
    }

    #[test]
    fn test_describer_duplicates_collapse() {
        let types = describer_types_from_str("SIFT,SIFT").unwrap();
        assert_eq!(types, vec![DescriberType::Sift]);
        assert_eq!(DescriberType::SiftFloat.file_suffix(), "sift_float");
    }

    #[test]
    fn test_geometric_model() {
        assert_eq!(
            "e".parse::<GeometricModel>().unwrap(),
            GeometricModel::Essential
        );
        assert_eq!(
            GeometricModel::Homography.matches_file_name(),
            "matches.h.txt"
        );
        assert!("x".parse::<GeometricModel>().is_err());
        assert!("ff".parse::<GeometricModel>().is_err());
    }

    #[test]
    fn test_selection_codes() {
        assert_eq!(SelectionMethod::from_code(-1).unwrap(), None);
        assert_eq!(
            SelectionMethod::from_code(2).unwrap(),
            Some(SelectionMethod::VldSegment)
        );
        assert!(SelectionMethod::from_code(3).is_err());
        assert!(!SelectionMethod::FullFrame.needs_features());
    }

    #[test]
    fn test_config_validation() {
        let config = HarmonizeConfig::new("sfm.json", "matches", "out");
        assert!(config.validate().is_ok());

        let config = HarmonizeConfig::new("sfm.json", "matches", "");
        assert!(matches!(
            config.validate(),
            Err(HarmonizeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_params_partial_json() {
        let json = r#"{ "quantile_count": 9, "vld": { "threshold": 0.5 } }"#;
        let params: HarmonizeParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.quantile_count, 9);
        assert_eq!(params.vld.threshold, 0.5);
        assert_eq!(params.vld.segments, selection::DEFAULT_VLD_SEGMENTS);
        assert_eq!(params.gain_max, solver::DEFAULT_GAIN_MAX);
    }

    #[test]
    fn test_params_rejects_bad_gains() {
        let params = HarmonizeParams {
            gain_min: 2.0,
            gain_max: 1.0,
            ..HarmonizeParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_params_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let params = HarmonizeParams {
            min_overlap_pixels: 42,
            ..HarmonizeParams::default()
        };
        params.to_json_file(&path).unwrap();
        assert_eq!(HarmonizeParams::from_json_file(&path).unwrap(), params);
    }
}
