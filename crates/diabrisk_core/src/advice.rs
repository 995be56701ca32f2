//! Health advice derived from a prediction and the user's own inputs

use crate::bands::RiskBand;
use crate::predictor::PredictionResult;
use crate::validation::ValidatedRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Underweight,
    Overweight,
    Obese,
    PrediabetesHba1c,
    DiabetesHba1c,
    PrediabetesGlucose,
    DiabetesGlucose,
}

/// A clinical reading worth calling out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub kind: IndicatorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAdvice {
    pub risk_category: RiskBand,
    pub recommendations: Vec<String>,
    pub indicators: Vec<Indicator>,
    pub age_tip: String,
}

/// Prediction together with the advice built from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub result: PredictionResult,
    pub advice: HealthAdvice,
}

pub fn recommendations(risk: RiskBand) -> &'static [&'static str] {
    match risk {
        RiskBand::High => &[
            "Consult a doctor for personalized treatment.",
            "Follow a balanced diet low in sugar and refined carbohydrates.",
            "Engage in regular physical activity.",
            "Monitor blood glucose levels daily.",
        ],
        RiskBand::Medium => &[
            "Maintain a healthy diet and monitor carbohydrate intake.",
            "Exercise at least 30 minutes daily.",
            "Check blood sugar regularly and schedule regular check-ups.",
            "Avoid smoking and limit alcohol consumption.",
        ],
        RiskBand::Low => &[
            "Continue a balanced diet and regular exercise.",
            "Monitor your weight and BMI.",
            "Maintain healthy lifestyle habits to prevent diabetes.",
            "Regular check-ups are recommended.",
        ],
    }
}

/// Indicators are computed on the submitted values; a sentinel zero
/// ("not measured") yields no indicator for its column.
pub fn indicators(record: &ValidatedRecord) -> Vec<Indicator> {
    let mut out = Vec::new();

    let bmi = record.bmi;
    if bmi != 0.0 {
        if bmi < 18.5 {
            out.push(indicator(IndicatorKind::Underweight, format!("BMI {bmi:.1}: underweight")));
        } else if bmi >= 30.0 {
            out.push(indicator(IndicatorKind::Obese, format!("BMI {bmi:.1}: obese")));
        } else if bmi >= 25.0 {
            out.push(indicator(IndicatorKind::Overweight, format!("BMI {bmi:.1}: overweight")));
        }
    }

    let hba1c = record.hba1c_level;
    if hba1c != 0.0 {
        if hba1c >= 6.5 {
            out.push(indicator(
                IndicatorKind::DiabetesHba1c,
                format!("HbA1c {hba1c:.1}%: diabetes range"),
            ));
        } else if hba1c >= 5.7 {
            out.push(indicator(
                IndicatorKind::PrediabetesHba1c,
                format!("HbA1c {hba1c:.1}%: prediabetes range"),
            ));
        }
    }

    let glucose = record.blood_glucose_level;
    if glucose != 0.0 {
        if glucose >= 126.0 {
            out.push(indicator(
                IndicatorKind::DiabetesGlucose,
                format!("Blood glucose {glucose:.0} mg/dL: diabetes range"),
            ));
        } else if glucose >= 100.0 {
            out.push(indicator(
                IndicatorKind::PrediabetesGlucose,
                format!("Blood glucose {glucose:.0} mg/dL: prediabetes range"),
            ));
        }
    }

    out
}

pub fn age_tip(age: f64) -> &'static str {
    if age > 50.0 {
        "Regular health check-ups are important at your age."
    } else if age > 30.0 {
        "Now is a good time to build healthy lifelong habits."
    } else {
        "Building healthy habits early sets you up for life."
    }
}

pub fn advise(record: &ValidatedRecord, result: &PredictionResult) -> HealthAdvice {
    HealthAdvice {
        risk_category: result.risk_category,
        recommendations: recommendations(result.risk_category)
            .iter()
            .map(|s| s.to_string())
            .collect(),
        indicators: indicators(record),
        age_tip: age_tip(record.age).to_string(),
    }
}

fn indicator(kind: IndicatorKind, message: String) -> Indicator {
    Indicator { kind, message }
}
