//! Raw record validation
//!
//! Turns a loosely typed field map (as received from a form or a JSON body)
//! into a [`ValidatedRecord`]. Checks run in a fixed order and the first
//! failing stage is returned, before any model computation happens:
//!
//! 1. required fields present
//! 2. categorical values inside the closed sets (policy dependent)
//! 3. numeric fields parse as finite numbers
//! 4. glucose unit conversion
//! 5. plausible ranges (policy dependent)

use crate::errors::{ValidationError, ValidationErrorKind};
use crate::features::{
    is_zero_sentinel, Gender, SmokingHistory, AGE, BLOOD_GLUCOSE_LEVEL, BMI, GENDER,
    GLUCOSE_UNIT, HBA1C_LEVEL, NUMERIC_FIELDS, REQUIRED_FIELDS, SMOKING_HISTORY,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// A single raw input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Null or a blank string
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn as_finite_number(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Field name to raw value; unknown fields are ignored
pub type RawRecord = BTreeMap<String, FieldValue>;

/// Handling of categorical values outside the closed sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPolicy {
    /// Reject with `InvalidCategory`
    #[default]
    Strict,
    /// Map to the fallback code ("other" / "no info")
    Lenient,
}

/// Handling of values outside clinically plausible bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    Off,
    /// Attach a [`RangeWarning`] and continue
    #[default]
    Warn,
    /// Reject with `OutOfRange`
    Strict,
}

/// Inclusive plausible bounds for a numeric field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
}

pub const PLAUSIBLE_RANGES: [FieldRange; 4] = [
    FieldRange { field: AGE, min: 0.0, max: 120.0 },
    FieldRange { field: BMI, min: 10.0, max: 60.0 },
    FieldRange { field: HBA1C_LEVEL, min: 3.0, max: 15.0 },
    FieldRange { field: BLOOD_GLUCOSE_LEVEL, min: 50.0, max: 300.0 },
];

/// Non-fatal advisory for an implausible value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeWarning {
    pub field: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} is outside the expected range {}-{}",
            self.field, self.value, self.min, self.max
        )
    }
}

/// Blood glucose unit accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[default]
    #[serde(rename = "mg/dL")]
    MgPerDl,
    #[serde(rename = "g/L")]
    GPerL,
}

impl GlucoseUnit {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mg/dl" => Some(GlucoseUnit::MgPerDl),
            "g/l" => Some(GlucoseUnit::GPerL),
            _ => None,
        }
    }

    /// Convert a reading in this unit to mg/dL (1 g/L = 100 mg/dL)
    pub fn to_mg_per_dl(self, value: f64) -> f64 {
        match self {
            GlucoseUnit::MgPerDl => value,
            GlucoseUnit::GPerL => value * 100.0,
        }
    }
}

/// Record that passed validation; glucose is always in mg/dL.
///
/// Sentinel columns keep their literal zero here; imputation happens in
/// encoding, against the bundle's medians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub gender: Gender,
    pub age: f64,
    pub smoking_history: SmokingHistory,
    pub bmi: f64,
    #[serde(rename = "hbA1c_level")]
    pub hba1c_level: f64,
    pub blood_glucose_level: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RangeWarning>,
}

impl ValidatedRecord {
    /// Numeric value of an input field by name
    pub fn numeric(&self, field: &str) -> Option<f64> {
        match field {
            AGE => Some(self.age),
            BMI => Some(self.bmi),
            HBA1C_LEVEL => Some(self.hba1c_level),
            BLOOD_GLUCOSE_LEVEL => Some(self.blood_glucose_level),
            _ => None,
        }
    }

    fn numeric_mut(&mut self, field: &str) -> Option<&mut f64> {
        match field {
            AGE => Some(&mut self.age),
            BMI => Some(&mut self.bmi),
            HBA1C_LEVEL => Some(&mut self.hba1c_level),
            BLOOD_GLUCOSE_LEVEL => Some(&mut self.blood_glucose_level),
            _ => None,
        }
    }
}

/// Validator with a fixed per-deployment policy
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator {
    category_policy: CategoryPolicy,
    range_policy: RangePolicy,
}

impl RecordValidator {
    pub fn new(category_policy: CategoryPolicy, range_policy: RangePolicy) -> Self {
        Self {
            category_policy,
            range_policy,
        }
    }

    pub fn category_policy(&self) -> CategoryPolicy {
        self.category_policy
    }

    pub fn range_policy(&self) -> RangePolicy {
        self.range_policy
    }

    pub fn validate(&self, record: &RawRecord) -> Result<ValidatedRecord, ValidationError> {
        self.check_required(record)?;
        let (gender, smoking_history) = self.check_categories(record)?;
        let mut validated = self.check_numbers(record, gender, smoking_history)?;
        apply_glucose_unit(record, &mut validated)?;
        self.check_ranges(&mut validated)?;
        Ok(validated)
    }

    fn check_required(&self, record: &RawRecord) -> Result<(), ValidationError> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| match record.get(**field) {
                None => true,
                Some(value) => value.is_blank() && !is_zero_sentinel(field),
            })
            .map(|field| field.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::missing_fields(missing))
        }
    }

    fn check_categories(
        &self,
        record: &RawRecord,
    ) -> Result<(Gender, SmokingHistory), ValidationError> {
        let gender_raw = record.get(GENDER);
        let smoking_raw = record.get(SMOKING_HISTORY);

        let gender = gender_raw.and_then(text).and_then(Gender::parse);
        let smoking = smoking_raw.and_then(text).and_then(SmokingHistory::parse);

        match self.category_policy {
            CategoryPolicy::Strict => {
                let mut invalid = Vec::new();
                let mut details = Vec::new();
                if gender.is_none() {
                    invalid.push(GENDER.to_string());
                    details.push(format!("{GENDER}: {}", describe(gender_raw)));
                }
                if smoking.is_none() {
                    invalid.push(SMOKING_HISTORY.to_string());
                    details.push(format!("{SMOKING_HISTORY}: {}", describe(smoking_raw)));
                }

                match (gender, smoking) {
                    (Some(g), Some(s)) => Ok((g, s)),
                    _ => Err(ValidationError::new(
                        ValidationErrorKind::InvalidCategory,
                        invalid,
                        format!("unknown category value(s): {}", details.join("; ")),
                    )),
                }
            }
            CategoryPolicy::Lenient => {
                if gender.is_none() {
                    debug!(value = %describe(gender_raw), "gender outside closed set; using fallback");
                }
                if smoking.is_none() {
                    debug!(value = %describe(smoking_raw), "smoking_history outside closed set; using fallback");
                }
                Ok((
                    gender.unwrap_or(Gender::FALLBACK),
                    smoking.unwrap_or(SmokingHistory::FALLBACK),
                ))
            }
        }
    }

    fn check_numbers(
        &self,
        record: &RawRecord,
        gender: Gender,
        smoking_history: SmokingHistory,
    ) -> Result<ValidatedRecord, ValidationError> {
        let mut parsed = BTreeMap::new();
        let mut invalid = Vec::new();
        let mut details = Vec::new();

        for field in NUMERIC_FIELDS {
            // Presence was checked already; only sentinel columns may be blank here.
            let value = match record.get(field) {
                Some(v) if v.is_blank() => Some(0.0),
                Some(v) => v.as_finite_number(),
                None => Some(0.0),
            };
            match value {
                Some(v) => {
                    parsed.insert(field, v);
                }
                None => {
                    invalid.push(field.to_string());
                    details.push(format!("{field}: {} is not a valid number", describe(record.get(field))));
                }
            }
        }

        if !invalid.is_empty() {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidNumber,
                invalid,
                details.join("; "),
            ));
        }

        let get = |field: &str| parsed.get(field).copied().unwrap_or(0.0);
        Ok(ValidatedRecord {
            gender,
            age: get(AGE),
            smoking_history,
            bmi: get(BMI),
            hba1c_level: get(HBA1C_LEVEL),
            blood_glucose_level: get(BLOOD_GLUCOSE_LEVEL),
            warnings: Vec::new(),
        })
    }

    fn check_ranges(&self, validated: &mut ValidatedRecord) -> Result<(), ValidationError> {
        if self.range_policy == RangePolicy::Off {
            return Ok(());
        }

        let mut warnings = Vec::new();
        for range in PLAUSIBLE_RANGES {
            let Some(value) = validated.numeric(range.field) else {
                continue;
            };
            if is_zero_sentinel(range.field) && value == 0.0 {
                continue;
            }
            if value < range.min || value > range.max {
                warnings.push(RangeWarning {
                    field: range.field.to_string(),
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        if self.range_policy == RangePolicy::Strict && !warnings.is_empty() {
            let fields = warnings.iter().map(|w| w.field.clone()).collect();
            let message = warnings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ValidationError::new(ValidationErrorKind::OutOfRange, fields, message));
        }

        validated.warnings = warnings;
        Ok(())
    }
}

fn apply_glucose_unit(
    record: &RawRecord,
    validated: &mut ValidatedRecord,
) -> Result<(), ValidationError> {
    let unit = match record.get(GLUCOSE_UNIT) {
        None => GlucoseUnit::default(),
        Some(value) if value.is_blank() => GlucoseUnit::default(),
        Some(value) => text(value).and_then(GlucoseUnit::parse).ok_or_else(|| {
            ValidationError::new(
                ValidationErrorKind::InvalidNumber,
                vec![GLUCOSE_UNIT.to_string()],
                format!("{GLUCOSE_UNIT}: unsupported unit {value}, expected mg/dL or g/L"),
            )
        })?,
    };

    if let Some(glucose) = validated.numeric_mut(BLOOD_GLUCOSE_LEVEL) {
        *glucose = unit.to_mg_per_dl(*glucose);
    }
    Ok(())
}

fn text(value: &FieldValue) -> Option<&str> {
    match value {
        FieldValue::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

fn describe(value: Option<&FieldValue>) -> String {
    value.map_or_else(|| "absent".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, FieldValue)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn base() -> RawRecord {
        record(&[
            (GENDER, "female".into()),
            (AGE, 45.0.into()),
            (BMI, 27.0.into()),
            (SMOKING_HISTORY, "never".into()),
            (HBA1C_LEVEL, 5.5.into()),
            (BLOOD_GLUCOSE_LEVEL, 110.0.into()),
        ])
    }

    #[test]
    fn test_valid_record() {
        let validated = RecordValidator::default().validate(&base()).unwrap();
        assert_eq!(validated.gender, Gender::Female);
        assert_eq!(validated.smoking_history, SmokingHistory::Never);
        assert_eq!(validated.age, 45.0);
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let mut rec = base();
        rec.remove(AGE);
        rec.remove(GENDER);

        let err = RecordValidator::default().validate(&rec).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingField);
        assert_eq!(err.fields, vec![GENDER.to_string(), AGE.to_string()]);
    }

    #[test]
    fn test_blank_sentinel_is_not_missing() {
        let mut rec = base();
        rec.insert(BMI.to_string(), FieldValue::Null);
        rec.insert(HBA1C_LEVEL.to_string(), "  ".into());

        let validated = RecordValidator::default().validate(&rec).unwrap();
        assert_eq!(validated.bmi, 0.0);
        assert_eq!(validated.hba1c_level, 0.0);
    }

    #[test]
    fn test_blank_age_is_missing() {
        let mut rec = base();
        rec.insert(AGE.to_string(), "".into());

        let err = RecordValidator::default().validate(&rec).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingField);
        assert_eq!(err.fields, vec![AGE.to_string()]);
    }

    #[test]
    fn test_strict_rejects_unknown_category() {
        let mut rec = base();
        rec.insert(SMOKING_HISTORY.to_string(), "sometimes".into());

        let err = RecordValidator::default().validate(&rec).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidCategory);
        assert_eq!(err.fields, vec![SMOKING_HISTORY.to_string()]);
    }

    #[test]
    fn test_lenient_maps_unknown_category_to_fallback() {
        let mut rec = base();
        rec.insert(GENDER.to_string(), "nonbinary".into());
        rec.insert(SMOKING_HISTORY.to_string(), 3.0.into());

        let validator = RecordValidator::new(CategoryPolicy::Lenient, RangePolicy::Warn);
        let validated = validator.validate(&rec).unwrap();
        assert_eq!(validated.gender, Gender::Other);
        assert_eq!(validated.smoking_history, SmokingHistory::NoInfo);
    }

    #[test]
    fn test_numeric_strings_and_invalid_numbers() {
        let mut rec = base();
        rec.insert(AGE.to_string(), " 52 ".into());
        let validated = RecordValidator::default().validate(&rec).unwrap();
        assert_eq!(validated.age, 52.0);

        rec.insert(AGE.to_string(), "fifty".into());
        rec.insert(BMI.to_string(), "NaN".into());
        let err = RecordValidator::default().validate(&rec).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidNumber);
        assert_eq!(err.fields, vec![AGE.to_string(), BMI.to_string()]);
    }

    #[test]
    fn test_glucose_unit_conversion() {
        let mut rec = base();
        rec.insert(BLOOD_GLUCOSE_LEVEL.to_string(), 1.4.into());
        rec.insert(GLUCOSE_UNIT.to_string(), "g/L".into());

        let validated = RecordValidator::default().validate(&rec).unwrap();
        assert!((validated.blood_glucose_level - 140.0).abs() < 1e-9);

        rec.insert(GLUCOSE_UNIT.to_string(), "mmol/L".into());
        let err = RecordValidator::default().validate(&rec).unwrap_err();
        assert_eq!(err.fields, vec![GLUCOSE_UNIT.to_string()]);
    }

    #[test]
    fn test_range_warnings_skip_sentinel_zero() {
        let mut rec = base();
        rec.insert(BMI.to_string(), 0.0.into());
        rec.insert(AGE.to_string(), 130.0.into());

        let validated = RecordValidator::default().validate(&rec).unwrap();
        assert_eq!(validated.warnings.len(), 1);
        assert_eq!(validated.warnings[0].field, AGE);
        assert_eq!(validated.warnings[0].max, 120.0);
    }

    #[test]
    fn test_strict_range_policy_rejects() {
        let mut rec = base();
        rec.insert(BMI.to_string(), 5.0.into());

        let validator = RecordValidator::new(CategoryPolicy::Strict, RangePolicy::Strict);
        let err = validator.validate(&rec).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::OutOfRange);
        assert_eq!(err.fields, vec![BMI.to_string()]);

        let off = RecordValidator::new(CategoryPolicy::Strict, RangePolicy::Off);
        assert!(off.validate(&rec).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_field_value_from_json() {
        let rec: RawRecord = serde_json::from_str(
            r#"{"gender":"Male","age":"61","bmi":null,"smoking_history":"former",
                "hbA1c_level":6.6,"blood_glucose_level":200,"notes":true}"#,
        )
        .unwrap();

        assert_eq!(rec.get(BMI), Some(&FieldValue::Null));
        assert_eq!(rec.get("notes"), Some(&FieldValue::Bool(true)));
        let validated = RecordValidator::default().validate(&rec).unwrap();
        assert_eq!(validated.gender, Gender::Male);
        assert_eq!(validated.age, 61.0);
    }
}
