//! Error types for the colorharmonize library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for colorharmonize operations
pub type Result<T> = std::result::Result<T, HarmonizeError>;

/// Error types for the harmonization pipeline
#[derive(Error, Debug)]
pub enum HarmonizeError {
    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Harmonized image could not be encoded or written
    #[error("Failed to save image: {message}")]
    ImageSaveError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// SfM data file could not be read or parsed
    #[error("Invalid SfM data {path}: {message}")]
    SfmDataError {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Harmonization report could not be serialized or parsed
    #[error("Invalid report {path}: {message}")]
    ReportError {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Feature or matches text file is malformed
    #[error("Parse error in {path} line {line}: {reason}")]
    ParseError {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Scene cannot be harmonized (no matches, a single view, ...)
    #[error("Scene error: {reason}")]
    SceneError { reason: String },

    /// Requested reference view is not part of the harmonized component
    #[error("Reference view {view_id} is not in the largest connected component")]
    InvalidReference { view_id: u32 },

    /// Global gain/offset solve failed or produced an out of bounds solution
    #[error("Solver error on {channel} channel: {reason}")]
    SolverError { channel: String, reason: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Filesystem error
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HarmonizeError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an image save error with context
    pub fn image_save<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageSaveError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an SfM data error with an underlying cause
    pub fn sfm_data<E>(path: impl Into<PathBuf>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SfmDataError {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a report error with an underlying cause
    pub fn report<E>(path: impl Into<PathBuf>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ReportError {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error stems from user input rather than the data itself
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            HarmonizeError::InvalidParameter { .. } | HarmonizeError::InvalidReference { .. }
        )
    }

    /// Get user-friendly error description for terminal display
    pub fn user_message(&self) -> String {
        match self {
            HarmonizeError::ImageLoadError { .. } => {
                "Could not load one of the scene images. Check the view paths in the SfM data."
                    .to_string()
            }
            HarmonizeError::SfmDataError { .. } => {
                "Could not read the SfM data file. Check that it is a valid sfm_data JSON file."
                    .to_string()
            }
            HarmonizeError::ParseError { .. } => {
                "A features or matches file is malformed. Check the matches directory.".to_string()
            }
            HarmonizeError::ReportError { .. } => {
                "The harmonization report is not valid JSON.".to_string()
            }
            HarmonizeError::SceneError { .. } => {
                "The scene does not have enough matched images to harmonize.".to_string()
            }
            HarmonizeError::InvalidReference { view_id } => {
                format!(
                    "View {} cannot be used as reference. \
                     Pick a view that shares matches with the rest of the scene.",
                    view_id
                )
            }
            _ => "Color harmonization failed.".to_string(),
        }
    }
}
