//! Label, risk and confidence bands derived from the positive-class probability

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Medium risk spans [LOW_RISK_MAX, HIGH_RISK_MIN], both edges inclusive
pub const LOW_RISK_MAX: f64 = 0.3;
pub const HIGH_RISK_MIN: f64 = 0.7;

/// Confidence is High outside (CONFIDENT_LOW, CONFIDENT_HIGH)
pub const CONFIDENT_LOW: f64 = 0.2;
pub const CONFIDENT_HIGH: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diagnosis {
    #[serde(rename = "Diabetes")]
    Diabetes,
    #[serde(rename = "No Diabetes")]
    NoDiabetes,
}

impl Diagnosis {
    pub fn from_probability(p: f64, threshold: f64) -> Self {
        if p >= threshold {
            Diagnosis::Diabetes
        } else {
            Diagnosis::NoDiabetes
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Diagnosis::Diabetes => "Diabetes",
            Diagnosis::NoDiabetes => "No Diabetes",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_probability(p: f64) -> Self {
        if p > HIGH_RISK_MIN {
            RiskBand::High
        } else if p >= LOW_RISK_MAX {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two bands only: a probability near either end is High, everything else Medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceBand {
    Medium,
    High,
}

impl ConfidenceBand {
    pub fn from_probability(p: f64) -> Self {
        if p > CONFIDENT_HIGH || p < CONFIDENT_LOW {
            ConfidenceBand::High
        } else {
            ConfidenceBand::Medium
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceBand::Medium => "Medium",
            ConfidenceBand::High => "High",
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `p` as a percentage rounded to two decimals
pub fn probability_percent(p: f64) -> f64 {
    (p * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_band_edges_are_medium() {
        assert_eq!(RiskBand::from_probability(0.30), RiskBand::Medium);
        assert_eq!(RiskBand::from_probability(0.70), RiskBand::Medium);
        assert_eq!(RiskBand::from_probability(0.2999), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.7001), RiskBand::High);
        assert_eq!(RiskBand::from_probability(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(1.0), RiskBand::High);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(ConfidenceBand::from_probability(0.19), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_probability(0.5), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_probability(0.75), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_probability(0.81), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_probability(0.2), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_probability(0.8), ConfidenceBand::Medium);
    }

    #[test]
    fn test_diagnosis_threshold_inclusive() {
        assert_eq!(Diagnosis::from_probability(0.5, 0.5), Diagnosis::Diabetes);
        assert_eq!(Diagnosis::from_probability(0.49, 0.5), Diagnosis::NoDiabetes);
        assert_eq!(Diagnosis::from_probability(0.6, 0.65), Diagnosis::NoDiabetes);
    }

    #[test]
    fn test_probability_percent() {
        assert_eq!(probability_percent(0.75), 75.0);
        assert_eq!(probability_percent(0.123456), 12.35);
        assert_eq!(probability_percent(0.0), 0.0);
        assert_eq!(probability_percent(1.0), 100.0);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&Diagnosis::NoDiabetes).unwrap(),
            "\"No Diabetes\""
        );
        assert_eq!(serde_json::to_string(&RiskBand::High).unwrap(), "\"High\"");
    }
}
