//! Feature encoding against a bundle's feature order and imputation table

use crate::errors::ValidationError;
use crate::features::{
    is_zero_sentinel, FeatureVector, AGE, BLOOD_GLUCOSE_LEVEL, BMI, GENDER, HBA1C_LEVEL,
    SMOKING_HISTORY,
};
use crate::validation::ValidatedRecord;
use std::collections::BTreeMap;

/// Encodes validated records into the exact column order a bundle was fit on.
///
/// Only an exact zero in a sentinel column is imputed; implausible nonzero
/// values pass through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'a> {
    feature_names: &'a [String],
    training_medians: &'a BTreeMap<String, f64>,
}

impl<'a> Encoder<'a> {
    pub fn new(feature_names: &'a [String], training_medians: &'a BTreeMap<String, f64>) -> Self {
        Self {
            feature_names,
            training_medians,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        self.feature_names
    }

    pub fn encode(&self, record: &ValidatedRecord) -> Result<FeatureVector, ValidationError> {
        let mut vector = Vec::with_capacity(self.feature_names.len());
        let mut missing = Vec::new();

        for name in self.feature_names {
            match self.column_value(record, name) {
                Some(value) => vector.push(value),
                None => missing.push(name.clone()),
            }
        }

        if missing.is_empty() {
            Ok(vector)
        } else {
            Err(ValidationError::missing_features(missing))
        }
    }

    fn column_value(&self, record: &ValidatedRecord, name: &str) -> Option<f64> {
        let raw = match name {
            GENDER => f64::from(record.gender.code()),
            SMOKING_HISTORY => f64::from(record.smoking_history.code()),
            AGE => record.age,
            BMI => record.bmi,
            HBA1C_LEVEL => record.hba1c_level,
            BLOOD_GLUCOSE_LEVEL => record.blood_glucose_level,
            _ => return None,
        };

        if is_zero_sentinel(name) && raw == 0.0 {
            self.training_medians.get(name).copied()
        } else {
            Some(raw)
        }
    }
}
