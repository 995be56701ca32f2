//! DiabRisk Trainer - deterministic offline random-forest trainer
//!
//! Produces model bundles from a CSV dataset: training-time cleaning,
//! stratified split, scaler fit, bagged CART trees and held-out metrics.
//! The same data, parameters and seed always give the same bundle hash.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod metrics;
pub mod pipeline;
pub mod split;

pub use dataset::Dataset;
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use forest::{ForestConfig, ForestTrainer, TrainedForest};
pub use pipeline::{train_bundle, train_bundle_from_csv, TrainingParams, TrainingReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
