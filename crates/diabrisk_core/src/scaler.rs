//! Per-column standard scaler: `(x - mean) / scale`
//!
//! `scale` is the population standard deviation captured at fit time; a
//! constant column gets scale 1.0 so it maps to zero instead of NaN.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalerError {
    #[error("Scaler expects {expected} features, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("Cannot fit scaler on an empty matrix")]
    Empty,

    #[error("Invalid scaler parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit column statistics on row-major samples
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ScalerError> {
        let first = rows.first().ok_or(ScalerError::Empty)?;
        let width = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            if row.len() != width {
                return Err(ScalerError::WidthMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((v, &x), &m) in variance.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }

        let scale = variance
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std == 0.0 || !std.is_finite() {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check parameter shape after deserialization
    pub fn validate(&self) -> Result<(), ScalerError> {
        if self.mean.len() != self.scale.len() {
            return Err(ScalerError::InvalidParameters(format!(
                "mean has {} columns, scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.is_empty() {
            return Err(ScalerError::InvalidParameters("no columns".to_string()));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(ScalerError::InvalidParameters(format!(
                "column {i} has non-positive scale"
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(ScalerError::InvalidParameters("non-finite mean".to_string()));
        }
        Ok(())
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScalerError> {
        if features.len() != self.n_features() {
            return Err(ScalerError::WidthMismatch {
                expected: self.n_features(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }

    pub fn transform_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ScalerError> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
