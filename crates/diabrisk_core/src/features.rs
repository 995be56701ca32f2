//! Field names and categorical encoding tables
//!
//! One canonical, case-insensitive table per categorical field is shared by
//! training and inference. Codes are stable: they are baked into every
//! persisted bundle.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const GENDER: &str = "gender";
pub const AGE: &str = "age";
pub const SMOKING_HISTORY: &str = "smoking_history";
pub const BMI: &str = "bmi";
pub const HBA1C_LEVEL: &str = "hbA1c_level";
pub const BLOOD_GLUCOSE_LEVEL: &str = "blood_glucose_level";
pub const GLUCOSE_UNIT: &str = "glucose_unit";

/// Binary label column of the training dataset
pub const LABEL: &str = "diabetes";

/// Fields every inference record must carry
pub const REQUIRED_FIELDS: [&str; 6] = [
    GENDER,
    AGE,
    BMI,
    SMOKING_HISTORY,
    HBA1C_LEVEL,
    BLOOD_GLUCOSE_LEVEL,
];

/// Feature order produced by the trainer (dataset column order without the label)
pub const FEATURE_COLUMNS: [&str; 6] = [
    GENDER,
    AGE,
    SMOKING_HISTORY,
    BMI,
    HBA1C_LEVEL,
    BLOOD_GLUCOSE_LEVEL,
];

/// Columns where a literal zero means "not measured"
pub const ZERO_SENTINEL_COLUMNS: [&str; 3] = [BMI, HBA1C_LEVEL, BLOOD_GLUCOSE_LEVEL];

/// Numeric input fields, in required-field order
pub const NUMERIC_FIELDS: [&str; 4] = [AGE, BMI, HBA1C_LEVEL, BLOOD_GLUCOSE_LEVEL];

/// Ordered numeric feature vector fed to the scaler and classifier
pub type FeatureVector = Vec<f64>;

pub fn is_zero_sentinel(column: &str) -> bool {
    ZERO_SENTINEL_COLUMNS.contains(&column)
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Female, Gender::Male, Gender::Other];

    /// Code used when a value is outside the closed set
    pub const FALLBACK: Gender = Gender::Other;

    /// Match a raw value, ignoring surrounding whitespace and ASCII case
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "female" => Some(Gender::Female),
            "male" => Some(Gender::Male),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }

    pub fn parse_or_fallback(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::FALLBACK)
    }

    pub fn code(self) -> u8 {
        match self {
            Gender::Female => 0,
            Gender::Male => 1,
            Gender::Other => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokingHistory {
    Never,
    NotCurrent,
    Current,
    NoInfo,
    Ever,
    Former,
}

impl SmokingHistory {
    pub const ALL: [SmokingHistory; 6] = [
        SmokingHistory::Never,
        SmokingHistory::NotCurrent,
        SmokingHistory::Current,
        SmokingHistory::NoInfo,
        SmokingHistory::Ever,
        SmokingHistory::Former,
    ];

    /// Code used when a value is outside the closed set
    pub const FALLBACK: SmokingHistory = SmokingHistory::NoInfo;

    /// Match a raw value, ignoring surrounding whitespace and ASCII case
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "never" => Some(SmokingHistory::Never),
            "not current" => Some(SmokingHistory::NotCurrent),
            "current" => Some(SmokingHistory::Current),
            "no info" => Some(SmokingHistory::NoInfo),
            "ever" => Some(SmokingHistory::Ever),
            "former" => Some(SmokingHistory::Former),
            _ => None,
        }
    }

    pub fn parse_or_fallback(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::FALLBACK)
    }

    pub fn code(self) -> u8 {
        match self {
            SmokingHistory::Never => 0,
            SmokingHistory::NotCurrent => 1,
            SmokingHistory::Current => 2,
            SmokingHistory::NoInfo => 3,
            SmokingHistory::Ever => 4,
            SmokingHistory::Former => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SmokingHistory::Never => "never",
            SmokingHistory::NotCurrent => "not current",
            SmokingHistory::Current => "current",
            SmokingHistory::NoInfo => "no info",
            SmokingHistory::Ever => "ever",
            SmokingHistory::Former => "former",
        }
    }
}

impl fmt::Display for SmokingHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
