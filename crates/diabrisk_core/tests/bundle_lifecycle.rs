//! Bundle persistence and predictor lifecycle against real files

use diabrisk_core::forest::{Node, RandomForest, Tree};
use diabrisk_core::{
    BundleError, BundleMetadata, BundleState, DiabetesPredictor, ModelBundle, PredictError,
    PredictorConfig, RawRecord, StandardScaler, ValidationErrorKind, FEATURE_COLUMNS,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn sample_bundle(leaf: f64) -> ModelBundle {
    let classifier = RandomForest::new(
        vec![
            Tree::new(vec![
                Node::internal(0, 4, 0.5, 1, 2),
                Node::leaf(1, leaf),
                Node::leaf(2, 0.8),
            ]),
            Tree::new(vec![Node::leaf(0, leaf)]),
        ],
        6,
    );
    let scaler = StandardScaler {
        mean: vec![0.4, 42.0, 2.1, 27.3, 5.5, 138.0],
        scale: vec![0.5, 22.0, 1.6, 6.6, 1.1, 40.0],
    };
    let names = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    let medians = BTreeMap::from([
        ("bmi".to_string(), 27.32),
        ("hbA1c_level".to_string(), 5.8),
        ("blood_glucose_level".to_string(), 140.0),
    ]);
    let metadata = BundleMetadata::new(&classifier, names, medians).unwrap();
    ModelBundle::new(classifier, scaler, metadata).unwrap()
}

fn config_for(path: &Path, allow_degraded: bool) -> PredictorConfig {
    PredictorConfig {
        bundle_path: path.to_path_buf(),
        allow_degraded_bundle: allow_degraded,
        ..PredictorConfig::default()
    }
}

fn record() -> RawRecord {
    serde_json::from_value(json!({
        "gender": "male",
        "age": 61,
        "bmi": 31.4,
        "smoking_history": "former",
        "hbA1c_level": 7.1,
        "blood_glucose_level": 200
    }))
    .unwrap()
}

fn rewrite(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
    let mut doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    edit(&mut doc);
    fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

#[test]
fn test_load_from_disk_reaches_ready() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    sample_bundle(0.3).save(&path).unwrap();

    let predictor = DiabetesPredictor::new(config_for(&path, false));
    assert_eq!(predictor.state(), BundleState::Unloaded);
    assert_eq!(predictor.load().unwrap(), BundleState::Ready { degraded: false });
    assert_eq!(predictor.state(), BundleState::Ready { degraded: false });
    assert!(predictor.predict(&record()).is_ok());
}

#[test]
fn test_saved_file_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    let bundle = sample_bundle(0.3);
    bundle.save(&path).unwrap();

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["format_version"], 1);
    assert!(doc["classifier"]["trees"].is_array());
    assert_eq!(doc["scaler"]["mean"].as_array().unwrap().len(), 6);
    assert_eq!(
        doc["metadata"]["classifier_hash"],
        bundle.classifier().hash_hex().unwrap()
    );
    assert_eq!(doc["metadata"]["feature_names"][3], "bmi");
}

#[test]
fn test_unavailable_bundle_rejects_predictions() {
    let dir = tempdir().unwrap();
    let predictor = DiabetesPredictor::new(config_for(&dir.path().join("missing.json"), true));

    assert!(matches!(predictor.load(), Err(BundleError::Unavailable { .. })));
    assert_eq!(predictor.state(), BundleState::Unloaded);
    assert_eq!(predictor.predict(&record()), Err(PredictError::NotReady));
}

#[test]
fn test_tampered_classifier_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    sample_bundle(0.3).save(&path).unwrap();

    rewrite(&path, |doc| {
        doc["classifier"]["trees"][1]["nodes"][0]["leaf"] = json!(0.99);
    });

    let err = ModelBundle::load(&path, true).unwrap_err();
    assert!(matches!(err, BundleError::Corrupt { ref reason } if reason.contains("hash")));
}

#[test]
fn test_garbage_file_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        ModelBundle::load(&path, true),
        Err(BundleError::Corrupt { .. })
    ));
}

#[test]
fn test_degraded_bundle_is_observable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    sample_bundle(0.3).save(&path).unwrap();
    rewrite(&path, |doc| {
        doc["metadata"] = json!("lost");
    });

    let strict = DiabetesPredictor::new(config_for(&path, false));
    assert!(matches!(strict.load(), Err(BundleError::Corrupt { .. })));

    let predictor = DiabetesPredictor::new(config_for(&path, true));
    assert_eq!(predictor.load().unwrap(), BundleState::Ready { degraded: true });
    assert!(predictor.is_degraded());

    // placeholder names never match input fields
    match predictor.predict(&record()) {
        Err(PredictError::Validation(e)) => {
            assert_eq!(e.kind, ValidationErrorKind::MissingFeature);
            assert_eq!(e.fields.len(), 6);
            assert_eq!(e.fields[0], "feature_0");
        }
        other => panic!("expected MissingFeature, got {other:?}"),
    }
}

#[test]
fn test_reload_replaces_and_marks_stale() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    sample_bundle(0.3).save(&path).unwrap();

    let predictor = DiabetesPredictor::new(config_for(&path, false));
    predictor.load().unwrap();
    let first = predictor.bundle().unwrap();

    sample_bundle(0.1).save(&path).unwrap();
    predictor.load().unwrap();

    assert_eq!(predictor.bundle_state(&first), BundleState::Stale);
    let current = predictor.bundle().unwrap();
    assert_ne!(
        current.metadata().classifier_hash,
        first.metadata().classifier_hash
    );
}

#[test]
fn test_failed_reload_keeps_serving() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    sample_bundle(0.3).save(&path).unwrap();

    let predictor = DiabetesPredictor::new(config_for(&path, false));
    predictor.load().unwrap();
    let before = predictor.predict(&record()).unwrap();

    fs::write(&path, "{}").unwrap();
    assert!(predictor.load().is_err());
    assert_eq!(predictor.state(), BundleState::Ready { degraded: false });
    assert_eq!(predictor.predict(&record()).unwrap(), before);
}

#[test]
fn test_concurrent_predictions_share_bundle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    sample_bundle(0.3).save(&path).unwrap();

    let predictor = DiabetesPredictor::new(config_for(&path, false));
    predictor.load().unwrap();
    let expected = predictor.predict(&record()).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| predictor.predict(&record()).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

/// Arbitrary full-precision thresholds, including CART-style midpoints
fn threshold() -> BoxedStrategy<f64> {
    prop_oneof![
        -1e4..1e4f64,
        (-1e3..1e3f64, -1e3..1e3f64).prop_map(|(a, b)| a + (b - a) / 2.0),
    ]
    .boxed()
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    (
        prop::array::uniform3(threshold()),
        prop::array::uniform3(0..6i32),
        prop::array::uniform4(0.0..=1.0f64),
    )
        .prop_map(|(t, f, l)| {
            Tree::new(vec![
                Node::internal(0, f[0], t[0], 1, 4),
                Node::internal(1, f[1], t[1], 2, 3),
                Node::leaf(2, l[0]),
                Node::leaf(3, l[1]),
                Node::internal(4, f[2], t[2], 5, 6),
                Node::leaf(5, l[2]),
                Node::leaf(6, l[3]),
            ])
        })
}

fn bundle_strategy() -> impl Strategy<Value = ModelBundle> {
    (
        prop::collection::vec(tree_strategy(), 1..5),
        prop::collection::vec(-1e4..1e4f64, 6),
        prop::collection::vec(1e-3..1e4f64, 6),
        prop::array::uniform3(1.0..300.0f64),
    )
        .prop_map(|(trees, mean, scale, m)| {
            let classifier = RandomForest::new(trees, 6);
            let names = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
            let medians = BTreeMap::from([
                ("bmi".to_string(), m[0]),
                ("hbA1c_level".to_string(), m[1]),
                ("blood_glucose_level".to_string(), m[2]),
            ]);
            let metadata = BundleMetadata::new(&classifier, names, medians).unwrap();
            ModelBundle::new(classifier, StandardScaler { mean, scale }, metadata).unwrap()
        })
}

fn score(bundle: &ModelBundle, row: &[f64]) -> f64 {
    let scaled = bundle.scaler().transform(row).unwrap();
    bundle.classifier().predict_proba(&scaled).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn saved_bundle_loads_back_exactly(
        bundle in bundle_strategy(),
        row in prop::array::uniform6(-1e3..1e3f64),
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        bundle.save(&path).unwrap();

        let loaded = ModelBundle::load(&path, false).unwrap();
        prop_assert_eq!(&loaded, &bundle);
        prop_assert_eq!(
            loaded.classifier().hash_hex().unwrap(),
            bundle.metadata().classifier_hash.clone()
        );
        prop_assert_eq!(score(&loaded, &row).to_bits(), score(&bundle, &row).to_bits());
    }
}
