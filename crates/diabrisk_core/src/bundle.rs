//! Model bundle: classifier + scaler + metadata as one immutable unit
//!
//! A bundle is a single JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "classifier": { "version": 1, "n_features": 6, "trees": [ ... ] },
//!   "scaler": { "mean": [ ... ], "scale": [ ... ] },
//!   "metadata": {
//!     "feature_names": ["gender", "age", ...],
//!     "training_medians": { "bmi": 27.32, ... },
//!     "timestamp": "2026-10-14T09:12:44.120Z",
//!     "classifier_hash": "<blake3 hex>",
//!     ...
//!   }
//! }
//! ```
//!
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the target, so readers observe either the old or the new
//! bundle and never a partial one.

use crate::encoding::Encoder;
use crate::errors::BundleError;
use crate::features::is_zero_sentinel;
use crate::forest::RandomForest;
use crate::scaler::StandardScaler;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{info, instrument, warn};

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Lifecycle of the bundle backing a predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum BundleState {
    Unloaded,
    Loading,
    Ready { degraded: bool },
    /// Superseded by a replacement; in-flight predictions may still hold it
    Stale,
}

/// Held-out evaluation recorded at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    pub roc_auc: Option<f64>,
    pub train_samples: usize,
    pub test_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub feature_names: Vec<String>,
    pub training_medians: BTreeMap<String, f64>,
    /// RFC 3339 creation time
    pub timestamp: String,
    pub classifier_hash: String,
    #[serde(default)]
    pub performance_metrics: Option<PerformanceMetrics>,
    #[serde(default)]
    pub feature_importances: BTreeMap<String, f64>,
}

impl BundleMetadata {
    /// Metadata for a freshly trained classifier, stamped with the current time
    pub fn new(
        classifier: &RandomForest,
        feature_names: Vec<String>,
        training_medians: BTreeMap<String, f64>,
    ) -> Result<Self, BundleError> {
        Ok(Self {
            feature_names,
            training_medians,
            timestamp: chrono::Utc::now().to_rfc3339(),
            classifier_hash: classifier.hash_hex()?,
            performance_metrics: None,
            feature_importances: BTreeMap::new(),
        })
    }

    pub fn with_performance(mut self, metrics: PerformanceMetrics) -> Self {
        self.performance_metrics = Some(metrics);
        self
    }

    pub fn with_feature_importances(mut self, importances: BTreeMap<String, f64>) -> Self {
        self.feature_importances = importances;
        self
    }

    /// Consistency against the model width; the hash is checked separately
    fn check_consistency(&self, width: usize) -> Result<(), String> {
        if self.feature_names.len() != width {
            return Err(format!(
                "{} feature names for a model of width {width}",
                self.feature_names.len()
            ));
        }

        let unique: BTreeSet<&String> = self.feature_names.iter().collect();
        if unique.len() != self.feature_names.len() {
            return Err("duplicate feature names".to_string());
        }

        for name in self.feature_names.iter().filter(|n| is_zero_sentinel(n)) {
            match self.training_medians.get(name) {
                Some(m) if m.is_finite() => {}
                _ => return Err(format!("no training median for {name}")),
            }
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct BundleFileRef<'a> {
    format_version: u32,
    classifier: &'a RandomForest,
    scaler: &'a StandardScaler,
    metadata: &'a BundleMetadata,
}

/// Loaded, read-only bundle
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    classifier: RandomForest,
    scaler: StandardScaler,
    metadata: BundleMetadata,
    degraded: bool,
}

impl ModelBundle {
    /// Assemble a bundle, checking that all three parts agree
    pub fn new(
        classifier: RandomForest,
        scaler: StandardScaler,
        metadata: BundleMetadata,
    ) -> Result<Self, BundleError> {
        check_model(&classifier, &scaler)?;

        let actual = classifier.hash_hex()?;
        if actual != metadata.classifier_hash {
            return Err(BundleError::corrupt(format!(
                "classifier hash mismatch: metadata {}, computed {actual}",
                metadata.classifier_hash
            )));
        }

        metadata
            .check_consistency(classifier.n_features)
            .map_err(BundleError::corrupt)?;

        Ok(Self {
            classifier,
            scaler,
            metadata,
            degraded: false,
        })
    }

    /// Bundle whose metadata was lost: placeholder names, no medians.
    ///
    /// Placeholder names never match an input field, so every record fails
    /// encoding with `MissingFeature` until a proper bundle replaces it.
    pub fn degraded(classifier: RandomForest, scaler: StandardScaler) -> Result<Self, BundleError> {
        check_model(&classifier, &scaler)?;

        let feature_names = (0..classifier.n_features)
            .map(|i| format!("feature_{i}"))
            .collect();
        let metadata = BundleMetadata {
            feature_names,
            training_medians: BTreeMap::new(),
            timestamp: String::new(),
            classifier_hash: classifier.hash_hex()?,
            performance_metrics: None,
            feature_importances: BTreeMap::new(),
        };

        Ok(Self {
            classifier,
            scaler,
            metadata,
            degraded: true,
        })
    }

    /// Read a bundle from disk.
    ///
    /// A missing file is `Unavailable`. A missing or corrupt classifier or
    /// scaler, mismatched widths, or a hash mismatch is `Corrupt`. Missing or
    /// inconsistent metadata is `Corrupt` unless `allow_degraded` is set.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P, allow_degraded: bool) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BundleError::Unavailable {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut document: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| BundleError::corrupt(format!("bundle is not valid JSON: {e}")))?;

        if let Some(version) = document.get("format_version") {
            if version.as_u64() != Some(u64::from(BUNDLE_FORMAT_VERSION)) {
                return Err(BundleError::corrupt(format!(
                    "unsupported bundle format version {version}"
                )));
            }
        }

        let classifier: RandomForest = take_part(&mut document, "classifier")?;
        let scaler: StandardScaler = take_part(&mut document, "scaler")?;
        check_model(&classifier, &scaler)?;

        let metadata = match document.get_mut("metadata").map(serde_json::Value::take) {
            None | Some(serde_json::Value::Null) => Err("metadata is missing".to_string()),
            Some(value) => serde_json::from_value::<BundleMetadata>(value)
                .map_err(|e| format!("metadata is unreadable: {e}")),
        };

        let bundle = match metadata {
            Ok(metadata) => {
                let actual = classifier.hash_hex()?;
                if actual != metadata.classifier_hash {
                    return Err(BundleError::corrupt(format!(
                        "classifier hash mismatch: metadata {}, computed {actual}",
                        metadata.classifier_hash
                    )));
                }
                match metadata.check_consistency(classifier.n_features) {
                    Ok(()) => Self {
                        classifier,
                        scaler,
                        metadata,
                        degraded: false,
                    },
                    Err(reason) => Self::fallback(classifier, scaler, reason, allow_degraded)?,
                }
            }
            Err(reason) => Self::fallback(classifier, scaler, reason, allow_degraded)?,
        };

        info!(
            trees = bundle.classifier.num_trees(),
            features = bundle.classifier.n_features,
            degraded = bundle.degraded,
            hash = %bundle.metadata.classifier_hash,
            "model bundle loaded"
        );
        Ok(bundle)
    }

    fn fallback(
        classifier: RandomForest,
        scaler: StandardScaler,
        reason: String,
        allow_degraded: bool,
    ) -> Result<Self, BundleError> {
        if !allow_degraded {
            return Err(BundleError::corrupt(reason));
        }
        warn!(%reason, "bundle metadata unusable; synthesizing placeholder feature names");
        Self::degraded(classifier, scaler)
    }

    /// Atomically write the bundle to `path`
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BundleError> {
        if self.degraded {
            return Err(BundleError::corrupt(
                "refusing to persist a degraded bundle",
            ));
        }

        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(&BundleFileRef {
            format_version: BUNDLE_FORMAT_VERSION,
            classifier: &self.classifier,
            scaler: &self.scaler,
            metadata: &self.metadata,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| BundleError::Io(e.error))?;

        info!(bytes = json.len(), hash = %self.metadata.classifier_hash, "model bundle saved");
        Ok(())
    }

    pub fn classifier(&self) -> &RandomForest {
        &self.classifier
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.metadata
    }

    pub fn feature_names(&self) -> &[String] {
        &self.metadata.feature_names
    }

    pub fn training_medians(&self) -> &BTreeMap<String, f64> {
        &self.metadata.training_medians
    }

    /// True when metadata was synthesized from the scaler width
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn encoder(&self) -> Encoder<'_> {
        Encoder::new(&self.metadata.feature_names, &self.metadata.training_medians)
    }
}

fn take_part<T: serde::de::DeserializeOwned>(
    document: &mut serde_json::Value,
    key: &str,
) -> Result<T, BundleError> {
    let value = document
        .get_mut(key)
        .map(serde_json::Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| BundleError::corrupt(format!("{key} is missing")))?;
    serde_json::from_value(value).map_err(|e| BundleError::corrupt(format!("{key} is unreadable: {e}")))
}

fn check_model(classifier: &RandomForest, scaler: &StandardScaler) -> Result<(), BundleError> {
    classifier
        .validate()
        .map_err(|e| BundleError::corrupt(e.to_string()))?;
    scaler
        .validate()
        .map_err(|e| BundleError::corrupt(e.to_string()))?;

    if scaler.n_features() != classifier.n_features {
        return Err(BundleError::corrupt(format!(
            "scaler width {} does not match classifier width {}",
            scaler.n_features(),
            classifier.n_features
        )));
    }
    Ok(())
}
