//! SfM data loading
//!
//! Reads the view list of an `sfm_data.json` scene description. Only the
//! fields harmonization needs are deserialized; poses, intrinsics and
//! structure are ignored.

use crate::error::{HarmonizeError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// View identifier as stored in the SfM data
pub type ViewId = u32;

/// One image of the scene
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Unique view identifier
    pub id: ViewId,
    /// Resolved path of the image file
    pub path: PathBuf,
    /// Declared image width, if present
    pub width: Option<u32>,
    /// Declared image height, if present
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSfmData {
    #[serde(default)]
    root_path: Option<PathBuf>,
    views: Vec<RawView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawView {
    view_id: ViewId,
    path: PathBuf,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

/// Views of a scene keyed by id, in ascending id order
#[derive(Debug, Clone, Default)]
pub struct SfmData {
    views: BTreeMap<ViewId, View>,
}

impl SfmData {
    /// Load and resolve an SfM data JSON file
    ///
    /// Relative view paths resolve against `rootPath` when present and
    /// against the directory holding the file otherwise.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarmonizeError::sfm_data(path, "cannot read file", e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&content, base).map_err(|e| match e {
            HarmonizeError::SfmDataError { message, source, .. } => HarmonizeError::SfmDataError {
                path: path.to_path_buf(),
                message,
                source,
            },
            other => other,
        })
    }

    /// Parse SfM data from a JSON string, resolving paths against `base`
    pub fn from_json_str(content: &str, base: &Path) -> Result<Self> {
        let raw: RawSfmData = serde_json::from_str(content)
            .map_err(|e| HarmonizeError::sfm_data("<memory>", "invalid JSON", e))?;

        let root = match raw.root_path {
            Some(root) if root.is_absolute() => root,
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        };

        let mut views = BTreeMap::new();
        let mut seen = HashSet::new();
        for raw_view in raw.views {
            if !seen.insert(raw_view.view_id) {
                return Err(HarmonizeError::SfmDataError {
                    path: PathBuf::from("<memory>"),
                    message: format!("duplicate view id {}", raw_view.view_id),
                    source: None,
                });
            }
            let path = if raw_view.path.is_absolute() {
                raw_view.path
            } else {
                root.join(raw_view.path)
            };
            views.insert(
                raw_view.view_id,
                View {
                    id: raw_view.view_id,
                    path,
                    width: raw_view.width,
                    height: raw_view.height,
                },
            );
        }

        Ok(Self { views })
    }

    /// Look up a view by id
    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    /// Whether the scene holds a view with this id
    pub fn contains(&self, id: ViewId) -> bool {
        self.views.contains_key(&id)
    }

    /// Views in ascending id order
    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "version": ["1", "0", "0"],
        "rootPath": "images",
        "views": [
            { "viewId": 7, "poseId": 7, "path": "b.jpg", "width": 640, "height": 480 },
            { "viewId": 2, "path": "/abs/a.jpg" }
        ],
        "intrinsics": []
    }"#;

    #[test]
    fn test_parse_views() {
        let data = SfmData::from_json_str(SCENE, Path::new("/scene")).unwrap();
        assert_eq!(data.len(), 2);

        let ids: Vec<ViewId> = data.views().map(|v| v.id).collect();
        assert_eq!(ids, vec![2, 7]);

        let b = data.view(7).unwrap();
        assert_eq!(b.path, PathBuf::from("/scene/images/b.jpg"));
        assert_eq!(b.width, Some(640));
        assert_eq!(data.view(2).unwrap().path, PathBuf::from("/abs/a.jpg"));
    }

    #[test]
    fn test_paths_relative_to_file_without_root() {
        let json = r#"{ "views": [ { "viewId": 0, "path": "x.png" } ] }"#;
        let data = SfmData::from_json_str(json, Path::new("/d")).unwrap();
        assert_eq!(data.view(0).unwrap().path, PathBuf::from("/d/x.png"));
    }

    #[test]
    fn test_duplicate_view_id() {
        let json = r#"{ "views": [ { "viewId": 1, "path": "a" }, { "viewId": 1, "path": "b" } ] }"#;
        let result = SfmData::from_json_str(json, Path::new("."));
        assert!(matches!(result, Err(HarmonizeError::SfmDataError { .. })));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SfmData::from_json_file(Path::new("/nope/sfm_data.json")).unwrap_err();
        match err {
            HarmonizeError::SfmDataError { path, .. } => {
                assert_eq!(path, PathBuf::from("/nope/sfm_data.json"))
            }
            other => panic!("Expected SfmDataError, got: {:?}", other),
        }
    }
}
