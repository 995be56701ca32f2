//! Predictor configuration: TOML file plus environment overrides

use crate::bands::DEFAULT_DECISION_THRESHOLD;
use crate::errors::ConfigError;
use crate::validation::{CategoryPolicy, RangePolicy, RecordValidator};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_BUNDLE_PATH: &str = "DIABRISK_BUNDLE_PATH";
pub const ENV_CATEGORY_POLICY: &str = "DIABRISK_CATEGORY_POLICY";
pub const ENV_RANGE_POLICY: &str = "DIABRISK_RANGE_POLICY";
pub const ENV_ALLOW_DEGRADED: &str = "DIABRISK_ALLOW_DEGRADED";
pub const ENV_DECISION_THRESHOLD: &str = "DIABRISK_DECISION_THRESHOLD";

/// Per-deployment predictor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Location of the bundle JSON file
    pub bundle_path: PathBuf,
    pub category_policy: CategoryPolicy,
    pub range_policy: RangePolicy,
    /// Serve a bundle whose metadata had to be synthesized
    pub allow_degraded_bundle: bool,
    /// Probability at or above which the label is "Diabetes"
    pub decision_threshold: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            bundle_path: PathBuf::from("models/diabetes_bundle.json"),
            category_policy: CategoryPolicy::default(),
            range_policy: RangePolicy::default(),
            allow_degraded_bundle: false,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }
}

impl PredictorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: PredictorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with any `DIABRISK_*` variables
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup, then re-validate
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_BUNDLE_PATH) {
            self.bundle_path = PathBuf::from(val);
        }

        if let Some(val) = lookup(ENV_CATEGORY_POLICY) {
            self.category_policy = match val.trim().to_ascii_lowercase().as_str() {
                "strict" => CategoryPolicy::Strict,
                "lenient" => CategoryPolicy::Lenient,
                _ => return Err(invalid(ENV_CATEGORY_POLICY, val)),
            };
        }

        if let Some(val) = lookup(ENV_RANGE_POLICY) {
            self.range_policy = match val.trim().to_ascii_lowercase().as_str() {
                "off" => RangePolicy::Off,
                "warn" => RangePolicy::Warn,
                "strict" => RangePolicy::Strict,
                _ => return Err(invalid(ENV_RANGE_POLICY, val)),
            };
        }

        if let Some(val) = lookup(ENV_ALLOW_DEGRADED) {
            self.allow_degraded_bundle = match val.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(invalid(ENV_ALLOW_DEGRADED, val)),
            };
        }

        if let Some(val) = lookup(ENV_DECISION_THRESHOLD) {
            self.decision_threshold = val
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_DECISION_THRESHOLD, val.clone()))?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.decision_threshold;
        if !t.is_finite() || t <= 0.0 || t >= 1.0 {
            return Err(invalid("decision_threshold", t.to_string()));
        }
        if self.bundle_path.as_os_str().is_empty() {
            return Err(invalid("bundle_path", String::new()));
        }
        Ok(())
    }

    pub fn validator(&self) -> RecordValidator {
        RecordValidator::new(self.category_policy, self.range_policy)
    }
}

fn invalid(key: &str, value: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    }
}
