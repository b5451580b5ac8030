//! Feature point files
//!
//! Features of a view for one describer type live in
//! `<dir>/<viewId>.<describer>.feat`, one `x y [scale [orientation]]` line
//! per feature. Only geometry is read; descriptors are not needed for
//! harmonization.

use crate::config::DescriberType;
use crate::error::{HarmonizeError, Result};
use crate::sfm::ViewId;
use std::path::{Path, PathBuf};

/// A detected feature point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub orientation: f32,
}

impl Feature {
    pub fn new(x: f32, y: f32, scale: f32, orientation: f32) -> Self {
        Self {
            x,
            y,
            scale,
            orientation,
        }
    }

    /// Euclidean distance to another feature
    pub fn distance(&self, other: &Feature) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Path of the feature file of a view for one describer type
pub fn feature_file_path(dir: &Path, view: ViewId, describer: DescriberType) -> PathBuf {
    dir.join(format!("{}.{}.feat", view, describer.file_suffix()))
}

/// Load the features of a view for one describer type
pub fn load_features(dir: &Path, view: ViewId, describer: DescriberType) -> Result<Vec<Feature>> {
    let path = feature_file_path(dir, view, describer);
    let content = std::fs::read_to_string(&path).map_err(|e| HarmonizeError::io(&path, e))?;
    parse_features(&content, &path)
}

/// Parse feature lines; `path` is only used in error messages
pub fn parse_features(content: &str, path: &Path) -> Result<Vec<Feature>> {
    let mut features = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values = line
            .split_whitespace()
            .map(str::parse::<f32>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HarmonizeError::ParseError {
                path: path.to_path_buf(),
                line: index + 1,
                reason: e.to_string(),
            })?;

        let feature = match values.as_slice() {
            [x, y] => Feature::new(*x, *y, 1.0, 0.0),
            [x, y, scale] => Feature::new(*x, *y, *scale, 0.0),
            [x, y, scale, orientation, ..] => Feature::new(*x, *y, *scale, *orientation),
            _ => {
                return Err(HarmonizeError::ParseError {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason: format!("expected at least 2 values, got {}", values.len()),
                })
            }
        };
        features.push(feature);
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_features() {
        let content = "10 20 2.5 0.3\n\n  5.5 6\n1 2 4\n";
        let features = parse_features(content, Path::new("0.sift.feat")).unwrap();

        assert_eq!(features.len(), 3);
        assert_eq!(features[0], Feature::new(10.0, 20.0, 2.5, 0.3));
        assert_eq!(features[1], Feature::new(5.5, 6.0, 1.0, 0.0));
        assert_eq!(features[2].scale, 4.0);
    }

    #[test]
    fn test_parse_error_line_number() {
        let err = parse_features("1 2\n3 abc\n", Path::new("f.feat")).unwrap_err();
        match err {
            HarmonizeError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected ParseError, got: {:?}", other),
        }

        assert!(parse_features("42\n", Path::new("f.feat")).is_err());
    }

    #[test]
    fn test_feature_file_path() {
        assert_eq!(
            feature_file_path(Path::new("/m"), 12, DescriberType::AkazeMldb),
            PathBuf::from("/m/12.akaze_mldb.feat")
        );
    }

    #[test]
    fn test_distance() {
        let a = Feature::new(0.0, 0.0, 1.0, 0.0);
        let b = Feature::new(3.0, 4.0, 1.0, 0.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
