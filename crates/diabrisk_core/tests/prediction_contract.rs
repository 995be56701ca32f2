//! End-to-end prediction contract over hand-built bundles

use diabrisk_core::forest::{Node, RandomForest, Tree};
use diabrisk_core::{
    BundleMetadata, CategoryPolicy, ConfidenceBand, DiabetesPredictor, Diagnosis, ModelBundle,
    PredictError, PredictionResponse, PredictorConfig, RangePolicy, RawRecord, RiskBand,
    StandardScaler, ValidationErrorKind, FEATURE_COLUMNS,
};
use serde_json::json;
use std::collections::BTreeMap;

fn medians() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("bmi".to_string(), 27.3),
        ("hbA1c_level".to_string(), 5.8),
        ("blood_glucose_level".to_string(), 140.0),
    ])
}

fn bundle_from(classifier: RandomForest, scaler: StandardScaler) -> ModelBundle {
    let names = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    let metadata = BundleMetadata::new(&classifier, names, medians()).unwrap();
    ModelBundle::new(classifier, scaler, metadata).unwrap()
}

fn identity_scaler() -> StandardScaler {
    StandardScaler {
        mean: vec![0.0; 6],
        scale: vec![1.0; 6],
    }
}

/// A single leaf, so the probability is `p` for any input
fn constant_predictor(p: f64, config: PredictorConfig) -> DiabetesPredictor {
    let forest = RandomForest::new(vec![Tree::new(vec![Node::leaf(0, p)])], 6);
    DiabetesPredictor::with_bundle(config, bundle_from(forest, identity_scaler()))
}

/// Stump on unscaled bmi (column 3): p = 0.9 above 27.0, else 0.1
fn bmi_predictor() -> DiabetesPredictor {
    let tree = Tree::new(vec![
        Node::internal(0, 3, 27.0, 1, 2),
        Node::leaf(1, 0.1),
        Node::leaf(2, 0.9),
    ]);
    DiabetesPredictor::with_bundle(
        PredictorConfig::default(),
        bundle_from(RandomForest::new(vec![tree], 6), identity_scaler()),
    )
}

fn record(value: serde_json::Value) -> RawRecord {
    serde_json::from_value(value).unwrap()
}

fn scenario_a() -> RawRecord {
    record(json!({
        "gender": "Female",
        "age": 45,
        "bmi": 0,
        "smoking_history": "never",
        "hbA1c_level": 5.5,
        "blood_glucose_level": 110
    }))
}

#[test]
fn test_scenario_a_sentinel_bmi_uses_median() {
    // imputed bmi 27.3 lands on the high side of the stump
    let result = bmi_predictor().predict(&scenario_a()).unwrap();
    assert_eq!(result.probability_percent, 90.0);
    assert_eq!(result.label, Diagnosis::Diabetes);

    let mut low = scenario_a();
    low.insert("bmi".to_string(), 22.0.into());
    assert_eq!(bmi_predictor().predict(&low).unwrap().probability_percent, 10.0);
}

#[test]
fn test_scenario_b_category_case_insensitive() {
    let predictor = bmi_predictor();
    let mut upper = scenario_a();
    upper.insert("smoking_history".to_string(), "CURRENT".into());
    let mut lower = scenario_a();
    lower.insert("smoking_history".to_string(), "current".into());

    assert_eq!(
        predictor.predict(&upper).unwrap(),
        predictor.predict(&lower).unwrap()
    );
}

#[test]
fn test_scenario_c_missing_age() {
    let mut rec = scenario_a();
    rec.remove("age");

    match bmi_predictor().predict(&rec) {
        Err(PredictError::Validation(e)) => {
            assert_eq!(e.kind, ValidationErrorKind::MissingField);
            assert_eq!(e.fields, vec!["age".to_string()]);
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn test_scenario_d_high_risk_medium_confidence() {
    let predictor = constant_predictor(0.75, PredictorConfig::default());
    let result = predictor.predict(&scenario_a()).unwrap();

    assert_eq!(result.label, Diagnosis::Diabetes);
    assert_eq!(result.risk_category, RiskBand::High);
    assert_eq!(result.confidence, ConfidenceBand::Medium);
    assert_eq!(result.probability_percent, 75.0);

    let json = serde_json::to_value(predictor.predict_diabetes(&scenario_a())).unwrap();
    assert_eq!(json["label"], "Diabetes");
    assert_eq!(json["risk_category"], "High");
    assert_eq!(json["confidence"], "Medium");
    assert_eq!(json["probability_percent"], 75.0);
}

#[test]
fn test_band_edges_through_predictor() {
    let cases = [
        (0.30, RiskBand::Medium, ConfidenceBand::Medium, Diagnosis::NoDiabetes),
        (0.70, RiskBand::Medium, ConfidenceBand::Medium, Diagnosis::Diabetes),
        (0.15, RiskBand::Low, ConfidenceBand::High, Diagnosis::NoDiabetes),
        (0.50, RiskBand::Medium, ConfidenceBand::Medium, Diagnosis::Diabetes),
        (0.85, RiskBand::High, ConfidenceBand::High, Diagnosis::Diabetes),
    ];

    for (p, risk, confidence, label) in cases {
        let result = constant_predictor(p, PredictorConfig::default())
            .predict(&scenario_a())
            .unwrap();
        assert_eq!(result.risk_category, risk, "risk at p={p}");
        assert_eq!(result.confidence, confidence, "confidence at p={p}");
        assert_eq!(result.label, label, "label at p={p}");
    }
}

#[test]
fn test_prediction_is_idempotent() {
    let predictor = bmi_predictor();
    let first = predictor.predict_diabetes(&scenario_a());
    for _ in 0..10 {
        assert_eq!(predictor.predict_diabetes(&scenario_a()), first);
    }
}

#[test]
fn test_strict_categories_reject_unknown_values() {
    let mut rec = scenario_a();
    rec.insert("gender".to_string(), "unknown".into());
    rec.insert("smoking_history".to_string(), "sometimes".into());

    let response = bmi_predictor().predict_diabetes(&rec);
    let json = serde_json::to_value(&response).unwrap();
    assert!(response.is_error());
    assert_eq!(json["kind"], "invalid_category");
    assert_eq!(json["fields"], json!(["gender", "smoking_history"]));
}

#[test]
fn test_lenient_categories_use_fallback() {
    let config = PredictorConfig {
        category_policy: CategoryPolicy::Lenient,
        ..PredictorConfig::default()
    };
    let predictor = constant_predictor(0.4, config);

    let mut rec = scenario_a();
    rec.insert("gender".to_string(), "unknown".into());
    assert!(predictor.predict(&rec).is_ok());
}

#[test]
fn test_range_warnings_attached() {
    let predictor = constant_predictor(0.4, PredictorConfig::default());
    let mut rec = scenario_a();
    rec.insert("blood_glucose_level".to_string(), 450.0.into());

    let result = predictor.predict(&rec).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].field, "blood_glucose_level");

    let strict = constant_predictor(
        0.4,
        PredictorConfig {
            range_policy: RangePolicy::Strict,
            ..PredictorConfig::default()
        },
    );
    assert!(matches!(
        strict.predict(&rec),
        Err(PredictError::Validation(e)) if e.kind == ValidationErrorKind::OutOfRange
    ));
}

#[test]
fn test_glucose_in_grams_per_litre() {
    // stump on glucose (column 5) at 120 mg/dL
    let tree = Tree::new(vec![
        Node::internal(0, 5, 120.0, 1, 2),
        Node::leaf(1, 0.2),
        Node::leaf(2, 0.6),
    ]);
    let predictor = DiabetesPredictor::with_bundle(
        PredictorConfig::default(),
        bundle_from(RandomForest::new(vec![tree], 6), identity_scaler()),
    );

    let mut rec = scenario_a();
    rec.insert("blood_glucose_level".to_string(), 1.4.into());
    rec.insert("glucose_unit".to_string(), "g/L".into());
    assert_eq!(predictor.predict(&rec).unwrap().probability_percent, 60.0);

    rec.insert("glucose_unit".to_string(), "mmol/L".into());
    assert!(predictor.predict(&rec).is_err());
}

#[test]
fn test_error_response_never_carries_result_fields() {
    let predictor = DiabetesPredictor::new(PredictorConfig::default());
    match predictor.predict_diabetes(&scenario_a()) {
        PredictionResponse::Error(e) => {
            assert_eq!(e.error, "Model not ready");
            assert!(e.kind.is_none());
        }
        PredictionResponse::Success(r) => panic!("unexpected success: {r:?}"),
    }
}
