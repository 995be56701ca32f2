//! End-to-end training: CSV to a validated model bundle

use diabrisk_core::bands::DEFAULT_DECISION_THRESHOLD;
use diabrisk_core::{BundleMetadata, ModelBundle, PerformanceMetrics, StandardScaler};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::dataset::Dataset;
use crate::errors::TrainerError;
use crate::forest::{ForestConfig, ForestTrainer};
use crate::metrics::{accuracy, roc_auc};
use crate::split::stratified_split;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub forest: ForestConfig,
    /// Held-out fraction
    pub test_size: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            test_size: 0.2,
        }
    }
}

/// What happened during a training run, for logs and tooling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    /// `[negatives, positives]` over the whole dataset
    pub class_counts: [usize; 2],
    pub training_medians: BTreeMap<String, f64>,
    pub metrics: PerformanceMetrics,
    pub feature_importances: BTreeMap<String, f64>,
}

pub fn train_bundle_from_csv(
    path: &Path,
    params: &TrainingParams,
) -> Result<(ModelBundle, TrainingReport), TrainerError> {
    let dataset = Dataset::from_csv(path).map_err(|err| TrainerError::Dataset(format!("{err:#}")))?;
    train_bundle(dataset, params)
}

/// Clean, split, scale, fit and evaluate.
///
/// Medians are taken over the full dataset before the split, so training and
/// test rows are imputed with the same values the bundle will carry.
pub fn train_bundle(
    mut dataset: Dataset,
    params: &TrainingParams,
) -> Result<(ModelBundle, TrainingReport), TrainerError> {
    let class_counts = dataset.class_counts();
    info!(
        samples = dataset.len(),
        negatives = class_counts[0],
        positives = class_counts[1],
        "dataset loaded"
    );

    let medians = dataset
        .training_medians()
        .map_err(|err| TrainerError::Dataset(format!("{err:#}")))?;
    dataset.impute_zeros(&medians);

    let (train_idx, test_idx) =
        stratified_split(&dataset.labels, params.test_size, params.forest.seed)?;
    let (train_x, train_y) = dataset.subset(&train_idx);
    let (test_x, test_y) = dataset.subset(&test_idx);
    info!(train = train_x.len(), test = test_x.len(), "stratified split");

    let scaler = StandardScaler::fit(&train_x).map_err(|e| TrainerError::Training(e.to_string()))?;
    let train_scaled = scaler
        .transform_rows(&train_x)
        .map_err(|e| TrainerError::Training(e.to_string()))?;
    let test_scaled = scaler
        .transform_rows(&test_x)
        .map_err(|e| TrainerError::Training(e.to_string()))?;

    let trained = ForestTrainer::new(params.forest.clone()).train(&train_scaled, &train_y)?;

    let probabilities = test_scaled
        .iter()
        .map(|row| trained.forest.predict_proba(row))
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| TrainerError::Training(e.to_string()))?;

    let metrics = PerformanceMetrics {
        accuracy: accuracy(&probabilities, &test_y, DEFAULT_DECISION_THRESHOLD),
        roc_auc: roc_auc(&probabilities, &test_y),
        train_samples: train_x.len(),
        test_samples: test_x.len(),
    };

    let feature_importances: BTreeMap<String, f64> = dataset
        .feature_names
        .iter()
        .cloned()
        .zip(trained.importances.iter().copied())
        .collect();

    let metadata = BundleMetadata::new(&trained.forest, dataset.feature_names.clone(), medians.clone())?
        .with_performance(metrics.clone())
        .with_feature_importances(feature_importances.clone());
    let bundle = ModelBundle::new(trained.forest, scaler, metadata)?;

    let report = TrainingReport {
        samples: dataset.len(),
        class_counts,
        training_medians: medians,
        metrics,
        feature_importances,
    };
    Ok((bundle, report))
}
