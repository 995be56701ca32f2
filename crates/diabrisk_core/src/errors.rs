//! Error types for record validation, bundle handling and prediction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::serde_canon::CanonicalError;

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// A required input field is absent
    MissingField,
    /// A categorical value is outside the closed set
    InvalidCategory,
    /// A numeric field did not parse as a finite number
    InvalidNumber,
    /// A numeric value is outside its plausible range (strict range policy only)
    OutOfRange,
    /// A feature the bundle was fit on could not be produced
    MissingFeature,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingField => "missing field",
            Self::InvalidCategory => "invalid category",
            Self::InvalidNumber => "invalid number",
            Self::OutOfRange => "out of range",
            Self::MissingFeature => "missing feature",
        };
        f.write_str(name)
    }
}

/// Rejected input record.
///
/// `fields` lists every offending field of the failing stage, in required-field
/// order for input fields and in bundle order for features.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub fields: Vec<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new<S: Into<String>>(kind: ValidationErrorKind, fields: Vec<String>, message: S) -> Self {
        Self {
            kind,
            fields,
            message: message.into(),
        }
    }

    pub fn missing_fields(fields: Vec<String>) -> Self {
        let message = format!("missing required field(s): {}", fields.join(", "));
        Self::new(ValidationErrorKind::MissingField, fields, message)
    }

    pub fn missing_features(fields: Vec<String>) -> Self {
        let message = format!("missing model feature(s): {}", fields.join(", "));
        Self::new(ValidationErrorKind::MissingFeature, fields, message)
    }
}

/// Bundle persistence and load errors
#[derive(Debug, Error)]
pub enum BundleError {
    /// No bundle exists at the configured location
    #[error("model bundle not found at {}", path.display())]
    Unavailable { path: PathBuf },

    /// The bundle exists but cannot be served
    #[error("model bundle is corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),
}

impl BundleError {
    pub fn corrupt<S: Into<String>>(reason: S) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}

/// Errors crossing the `predict` boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// No bundle has reached the Ready state
    #[error("Model not ready")]
    NotReady,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Scaling or inference failed on an already validated record
    #[error("Prediction failed: {message}")]
    Failure { message: String },
}

impl PredictError {
    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
