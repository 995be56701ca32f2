//! CSV dataset loading and training-time cleaning
//!
//! Reads a headed CSV with the six feature columns and the `diabetes` label.
//! Extra columns are ignored. Categories always map leniently here (unknown
//! values take the fallback code), and blank sentinel cells read as zero.

use anyhow::{bail, Context, Result};
use diabrisk_core::features::{
    is_zero_sentinel, Gender, SmokingHistory, FEATURE_COLUMNS, GENDER, LABEL, SMOKING_HISTORY,
    ZERO_SENTINEL_COLUMNS,
};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Encoded training rows in canonical column order
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().context("Failed to read CSV header")?.clone();
        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .with_context(|| format!("CSV header has no '{name}' column"))
        };

        let feature_idx = FEATURE_COLUMNS
            .iter()
            .map(|name| column(*name))
            .collect::<Result<Vec<_>>>()?;
        let label_idx = column(LABEL)?;

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for row in reader.records() {
            let row = row.context("Malformed CSV row")?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();

            let mut encoded = Vec::with_capacity(FEATURE_COLUMNS.len());
            for (name, &idx) in FEATURE_COLUMNS.iter().zip(&feature_idx) {
                let cell = row.get(idx).unwrap_or("");
                encoded.push(encode_cell(name, cell).with_context(|| {
                    format!("Line {line}, column {name}: invalid value '{cell}'")
                })?);
            }

            let label_cell = row.get(label_idx).unwrap_or("");
            let label = match label_cell.parse::<f64>() {
                Ok(v) if v == 0.0 => 0,
                Ok(v) if v == 1.0 => 1,
                _ => bail!("Line {line}: label must be 0 or 1, got '{label_cell}'"),
            };

            features.push(encoded);
            labels.push(label);
        }

        if features.is_empty() {
            bail!("Dataset is empty");
        }

        Ok(Self {
            feature_names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            features,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// `[negatives, positives]`
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        [self.labels.len() - positives, positives]
    }

    /// Median of each sentinel column with zeros treated as missing
    pub fn training_medians(&self) -> Result<BTreeMap<String, f64>> {
        let mut medians = BTreeMap::new();

        for name in ZERO_SENTINEL_COLUMNS {
            let idx = self.column_index(name)?;
            let mut values: Vec<f64> = self
                .features
                .iter()
                .map(|row| row[idx])
                .filter(|&v| v != 0.0)
                .collect();
            let m = median(&mut values)
                .with_context(|| format!("Column {name} has no nonzero values"))?;
            medians.insert(name.to_string(), m);
        }

        Ok(medians)
    }

    /// Replace sentinel zeros with the recorded medians
    pub fn impute_zeros(&mut self, medians: &BTreeMap<String, f64>) {
        let targets: Vec<(usize, f64)> = self
            .feature_names
            .iter()
            .enumerate()
            .filter(|(_, name)| is_zero_sentinel(name))
            .filter_map(|(i, name)| medians.get(name).map(|&m| (i, m)))
            .collect();

        for row in &mut self.features {
            for &(idx, m) in &targets {
                if row[idx] == 0.0 {
                    row[idx] = m;
                }
            }
        }
    }

    /// Min and max of each column, for logging
    pub fn feature_stats(&self) -> Vec<(f64, f64)> {
        let mut stats = vec![(f64::INFINITY, f64::NEG_INFINITY); self.feature_count()];

        for row in &self.features {
            for (i, &val) in row.iter().enumerate() {
                stats[i].0 = stats[i].0.min(val);
                stats[i].1 = stats[i].1.max(val);
            }
        }

        stats
    }

    /// Rows and labels at `indices`
    pub fn subset(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<u8>) {
        indices
            .iter()
            .map(|&i| (self.features[i].clone(), self.labels[i]))
            .unzip()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .with_context(|| format!("Dataset has no '{name}' column"))
    }
}

fn encode_cell(name: &str, cell: &str) -> Result<f64> {
    match name {
        GENDER => Ok(f64::from(Gender::parse_or_fallback(cell).code())),
        SMOKING_HISTORY => Ok(f64::from(SmokingHistory::parse_or_fallback(cell).code())),
        _ if cell.is_empty() && is_zero_sentinel(name) => Ok(0.0),
        _ => {
            let v: f64 = cell.parse()?;
            if !v.is_finite() {
                bail!("not a finite number");
            }
            Ok(v)
        }
    }
}

/// Median of `values`; even counts take the mean of the two middle values
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
