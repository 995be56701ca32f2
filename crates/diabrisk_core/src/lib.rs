//! Diabetes risk preprocessing and inference
//!
//! Turns raw, user-supplied health records into the exact numeric encoding a
//! trained random forest expects and maps its positive-class probability to a
//! label with risk and confidence bands.
//!
//! Modules:
//! - `features`: canonical column names and categorical encoding tables
//! - `validation`: field presence, category, number, unit and range checks
//! - `encoding`: sentinel-zero imputation and bundle column ordering
//! - `scaler`: persisted standard scaler
//! - `forest`: random-forest inference and canonical model hashing
//! - `bundle`: the classifier/scaler/metadata unit and its atomic persistence
//! - `predictor`: lifecycle-gated prediction and the error-free boundary
//! - `bands`: label, risk and confidence thresholds
//! - `advice`: health advice from a prediction
//! - `config`: TOML and environment configuration

pub mod advice;
pub mod bands;
pub mod bundle;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod features;
pub mod forest;
pub mod predictor;
pub mod scaler;
pub mod serde_canon;
pub mod validation;

pub use advice::{advise, Assessment, HealthAdvice};
pub use bands::{ConfidenceBand, Diagnosis, RiskBand};
pub use bundle::{BundleMetadata, BundleState, ModelBundle, PerformanceMetrics};
pub use config::PredictorConfig;
pub use encoding::Encoder;
pub use errors::{BundleError, ConfigError, PredictError, ValidationError, ValidationErrorKind};
pub use features::{FeatureVector, Gender, SmokingHistory, FEATURE_COLUMNS};
pub use forest::RandomForest;
pub use predictor::{DiabetesPredictor, PredictionResponse, PredictionResult};
pub use scaler::StandardScaler;
pub use validation::{
    CategoryPolicy, FieldValue, RangePolicy, RangeWarning, RawRecord, RecordValidator,
    ValidatedRecord,
};

/// Crate version string for bundle metadata and CLI output
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
