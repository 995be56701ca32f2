//! Random-forest classifier with canonical hashing
//!
//! The positive-class probability is the mean of the per-tree leaf
//! probabilities, as in bagged CART ensembles.

use super::tree::Tree;
use crate::serde_canon::{hash_canonical_hex, CanonicalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current classifier format version
pub const FOREST_FORMAT_VERSION: i32 = 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForestError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("Classifier expects {expected} features, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("Tree {0} could not be evaluated")]
    MalformedTree(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForest {
    pub version: i32,

    /// Width of the (scaled) feature vector the trees were fit on
    pub n_features: usize,

    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(trees: Vec<Tree>, n_features: usize) -> Self {
        Self {
            version: FOREST_FORMAT_VERSION,
            n_features,
            trees,
        }
    }

    pub fn validate(&self) -> Result<(), ForestError> {
        if self.version != FOREST_FORMAT_VERSION {
            return Err(ForestError::ValidationFailed(format!(
                "Unsupported classifier version: {}",
                self.version
            )));
        }
        if self.n_features == 0 {
            return Err(ForestError::ValidationFailed("n_features is 0".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ForestError::ValidationFailed("forest has no trees".to_string()));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features).map_err(|e| {
                ForestError::ValidationFailed(format!("Tree {i} validation failed: {e}"))
            })?;
        }

        Ok(())
    }

    /// Mean positive-class probability over all trees
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64, ForestError> {
        if features.len() != self.n_features {
            return Err(ForestError::WidthMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(ForestError::ValidationFailed("forest has no trees".to_string()));
        }

        let mut sum = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            sum += tree.evaluate(features).ok_or(ForestError::MalformedTree(i))?;
        }

        Ok(sum / self.trees.len() as f64)
    }

    /// BLAKE3 hash of the canonical JSON representation
    pub fn hash_hex(&self) -> Result<String, CanonicalError> {
        hash_canonical_hex(self)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}
