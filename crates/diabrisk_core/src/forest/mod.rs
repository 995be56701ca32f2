//! Random-forest classifier inference
//!
//! Trees are plain CART trees whose leaves store a positive-class
//! probability. The ensemble averages leaf probabilities.
//!
//! # Model Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "n_features": 6,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"id":0,"left":1,"right":2,"feature_idx":4,"threshold":0.37,"leaf":null},
//!         {"id":1,"left":-1,"right":-1,"feature_idx":-1,"threshold":0.0,"leaf":0.04},
//!         {"id":2,"left":-1,"right":-1,"feature_idx":-1,"threshold":0.0,"leaf":0.61}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The model hash is BLAKE3 over the canonical (sorted-key, compact) JSON.

pub mod model;
pub mod tree;

pub use model::{ForestError, RandomForest, FOREST_FORMAT_VERSION};
pub use tree::{Node, Tree};
