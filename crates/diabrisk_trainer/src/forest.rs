//! Bagged random-forest trainer
//!
//! Each tree gets a bootstrap sample and its own RNG seeded from the base
//! seed and the tree index, so trees can be fit in parallel with rayon and
//! still come out identical on every run.

use diabrisk_core::forest::{RandomForest, Tree};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::{tree_seed, LcgRng};
use crate::errors::TrainerError;

/// Random-forest hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub num_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Weight classes inversely to their frequency
    pub balanced_class_weight: bool,
    pub seed: i64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            balanced_class_weight: false,
            seed: 42,
        }
    }
}

/// Random forest plus normalized feature importances
#[derive(Debug, Clone)]
pub struct TrainedForest {
    pub forest: RandomForest,
    /// Mean per-tree impurity-decrease importances; sums to 1 when any split exists
    pub importances: Vec<f64>,
}

pub struct ForestTrainer {
    config: ForestConfig,
}

impl ForestTrainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fit on already scaled rows
    pub fn train(&self, features: &[Vec<f64>], labels: &[u8]) -> Result<TrainedForest, TrainerError> {
        if features.is_empty() {
            return Err(TrainerError::Training("no training samples".to_string()));
        }
        if features.len() != labels.len() {
            return Err(TrainerError::Training(format!(
                "{} rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if self.config.num_trees == 0 {
            return Err(TrainerError::Training("num_trees must be positive".to_string()));
        }

        let n_features = features[0].len();
        let class_weight = self.class_weight(labels);
        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: (n_features as f64).sqrt().floor().max(1.0) as usize,
        };

        let fitted: Vec<(Tree, Vec<f64>)> = (0..self.config.num_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = LcgRng::new(tree_seed(self.config.seed, tree_idx));
                let sample: Vec<usize> = (0..features.len())
                    .map(|_| rng.next_index(features.len()))
                    .collect();

                let builder =
                    CartBuilder::new(features, labels, class_weight, tree_config.clone(), rng);
                let (tree, importances) = builder.build(&sample);
                debug!(tree_idx, nodes = tree.nodes.len(), depth = tree.depth(), "tree fitted");
                (tree, importances)
            })
            .collect();

        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, tree_importances) in fitted {
            let total: f64 = tree_importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&tree_importances) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        let n_trees = trees.len() as f64;
        for v in &mut importances {
            *v /= n_trees;
        }

        let forest = RandomForest::new(trees, n_features);
        forest
            .validate()
            .map_err(|e| TrainerError::Training(e.to_string()))?;

        Ok(TrainedForest {
            forest,
            importances,
        })
    }

    /// `n / (2 * n_c)` per class when balanced, else 1.0
    fn class_weight(&self, labels: &[u8]) -> [f64; 2] {
        if !self.config.balanced_class_weight {
            return [1.0, 1.0];
        }
        let n = labels.len() as f64;
        let positives = labels.iter().filter(|&&l| l == 1).count() as f64;
        let negatives = n - positives;
        let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 1.0 };
        [weight(negatives), weight(positives)]
    }
}
