//! Prediction over a shared, replaceable model bundle
//!
//! The current bundle sits behind a short-lived read lock as an
//! `Arc<ModelBundle>`; each prediction clones the `Arc` and runs without
//! holding the lock, so a replacement never blocks or disturbs in-flight
//! work.

use crate::advice::{advise, Assessment};
use crate::bands::{probability_percent, ConfidenceBand, Diagnosis, RiskBand};
use crate::bundle::{BundleState, ModelBundle};
use crate::config::PredictorConfig;
use crate::errors::{BundleError, PredictError, ValidationErrorKind};
use crate::validation::{RangeWarning, RawRecord, RecordValidator, ValidatedRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Diagnosis,
    pub probability_percent: f64,
    pub risk_category: RiskBand,
    pub confidence: ConfidenceBand,
    #[serde(default)]
    pub warnings: Vec<RangeWarning>,
    /// Served by a bundle with synthesized metadata. A degraded bundle's
    /// placeholder feature names match no input field, so it never produces
    /// a successful prediction; records fail with `MissingFeature`.
    #[serde(default)]
    pub degraded_bundle: bool,
}

/// Flat error payload returned at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValidationErrorKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl From<PredictError> for ErrorResponse {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Validation(v) => Self {
                error: v.to_string(),
                kind: Some(v.kind),
                fields: v.fields,
            },
            other => Self {
                error: other.to_string(),
                kind: None,
                fields: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Success(PredictionResult),
    Error(ErrorResponse),
}

impl PredictionResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, PredictionResponse::Error(_))
    }
}

#[derive(Debug)]
enum Slot {
    Unloaded,
    Loading,
    Ready(Arc<ModelBundle>),
}

/// Diabetes risk predictor bound to one deployment configuration
#[derive(Debug)]
pub struct DiabetesPredictor {
    config: PredictorConfig,
    validator: RecordValidator,
    slot: RwLock<Slot>,
}

impl DiabetesPredictor {
    /// Predictor in the `Unloaded` state
    pub fn new(config: PredictorConfig) -> Self {
        let validator = config.validator();
        Self {
            config,
            validator,
            slot: RwLock::new(Slot::Unloaded),
        }
    }

    /// Predictor that is immediately `Ready` with `bundle`
    pub fn with_bundle(config: PredictorConfig, bundle: ModelBundle) -> Self {
        let predictor = Self::new(config);
        *predictor.slot.write() = Slot::Ready(Arc::new(bundle));
        predictor
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Load the bundle at the configured path.
    ///
    /// From `Unloaded` this passes through `Loading` and ends `Ready` or back
    /// in `Unloaded`. If a bundle is already being served, a successful load
    /// replaces it and a failed one leaves it in place. `Ready{degraded: true}`
    /// accepts predictions but every one fails encoding with `MissingFeature`.
    #[instrument(skip(self), fields(path = %self.config.bundle_path.display()))]
    pub fn load(&self) -> Result<BundleState, BundleError> {
        {
            let mut slot = self.slot.write();
            if matches!(*slot, Slot::Unloaded) {
                *slot = Slot::Loading;
            }
        }

        match ModelBundle::load(&self.config.bundle_path, self.config.allow_degraded_bundle) {
            Ok(bundle) => {
                let degraded = bundle.is_degraded();
                *self.slot.write() = Slot::Ready(Arc::new(bundle));
                info!(degraded, "predictor ready");
                Ok(BundleState::Ready { degraded })
            }
            Err(e) => {
                let mut slot = self.slot.write();
                if matches!(*slot, Slot::Loading) {
                    *slot = Slot::Unloaded;
                }
                warn!(error = %e, "bundle load failed");
                Err(e)
            }
        }
    }

    /// Swap in a new bundle; the previous one becomes `Stale`
    pub fn replace_bundle(&self, bundle: ModelBundle) -> Option<Arc<ModelBundle>> {
        let degraded = bundle.is_degraded();
        let previous = std::mem::replace(&mut *self.slot.write(), Slot::Ready(Arc::new(bundle)));
        info!(degraded, "model bundle replaced");
        match previous {
            Slot::Ready(old) => Some(old),
            Slot::Unloaded | Slot::Loading => None,
        }
    }

    pub fn state(&self) -> BundleState {
        match &*self.slot.read() {
            Slot::Unloaded => BundleState::Unloaded,
            Slot::Loading => BundleState::Loading,
            Slot::Ready(bundle) => BundleState::Ready {
                degraded: bundle.is_degraded(),
            },
        }
    }

    /// The bundle currently being served, if any
    pub fn bundle(&self) -> Option<Arc<ModelBundle>> {
        match &*self.slot.read() {
            Slot::Ready(bundle) => Some(Arc::clone(bundle)),
            Slot::Unloaded | Slot::Loading => None,
        }
    }

    /// State of a bundle handle obtained earlier from this predictor
    pub fn bundle_state(&self, bundle: &Arc<ModelBundle>) -> BundleState {
        match &*self.slot.read() {
            Slot::Ready(current) if Arc::ptr_eq(current, bundle) => BundleState::Ready {
                degraded: current.is_degraded(),
            },
            _ => BundleState::Stale,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.state(), BundleState::Ready { degraded: true })
    }

    pub fn predict(&self, record: &RawRecord) -> Result<PredictionResult, PredictError> {
        self.evaluate(record).map(|(_, result)| result)
    }

    /// Prediction plus health advice
    pub fn assess(&self, record: &RawRecord) -> Result<Assessment, PredictError> {
        let (validated, result) = self.evaluate(record)?;
        let advice = advise(&validated, &result);
        Ok(Assessment { result, advice })
    }

    /// Boundary call: every failure becomes an error payload
    pub fn predict_diabetes(&self, record: &RawRecord) -> PredictionResponse {
        match self.predict(record) {
            Ok(result) => PredictionResponse::Success(result),
            Err(e) => {
                debug!(error = %e, "prediction rejected");
                PredictionResponse::Error(e.into())
            }
        }
    }

    fn evaluate(
        &self,
        record: &RawRecord,
    ) -> Result<(ValidatedRecord, PredictionResult), PredictError> {
        let bundle = self.bundle().ok_or(PredictError::NotReady)?;

        let validated = self.validator.validate(record)?;
        let features = bundle.encoder().encode(&validated)?;

        let scaled = bundle
            .scaler()
            .transform(&features)
            .map_err(|e| PredictError::failure(e.to_string()))?;
        let p = bundle
            .classifier()
            .predict_proba(&scaled)
            .map_err(|e| PredictError::failure(e.to_string()))?;

        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PredictError::failure(format!(
                "classifier returned invalid probability {p}"
            )));
        }

        let result = PredictionResult {
            label: Diagnosis::from_probability(p, self.config.decision_threshold),
            probability_percent: probability_percent(p),
            risk_category: RiskBand::from_probability(p),
            confidence: ConfidenceBand::from_probability(p),
            warnings: validated.warnings.clone(),
            degraded_bundle: bundle.is_degraded(),
        };
        debug!(probability = p, label = %result.label, "prediction");

        Ok((validated, result))
    }
}
