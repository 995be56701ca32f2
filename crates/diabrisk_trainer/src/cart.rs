//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy classification trees with weighted Gini impurity. Thresholds
//! are midpoints between adjacent distinct values; ties between equally good
//! splits are broken deterministically. Leaves store the weighted fraction
//! of positive samples.

use diabrisk_core::forest::{Node, Tree};

use crate::deterministic::{LcgRng, SplitTieBreaker};

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features examined at each node
    pub max_features: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: 2,
        }
    }
}

/// Split candidate with impurity decrease and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    decrease: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, decrease: f64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            decrease,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        const EPS: f64 = 1e-12;
        self.decrease > other.decrease + EPS
            || ((self.decrease - other.decrease).abs() <= EPS
                && self.tie_breaker.precedes(&other.tie_breaker))
    }
}

/// Weighted class totals of a node
#[derive(Debug, Clone, Copy, Default)]
struct ClassWeights {
    negative: f64,
    positive: f64,
}

impl ClassWeights {
    fn add(&mut self, label: u8, weight: f64) {
        if label == 1 {
            self.positive += weight;
        } else {
            self.negative += weight;
        }
    }

    fn total(&self) -> f64 {
        self.negative + self.positive
    }

    fn gini(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let p = self.positive / total;
        2.0 * p * (1.0 - p)
    }

    fn positive_fraction(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            0.0
        } else {
            (self.positive / total).clamp(0.0, 1.0)
        }
    }

    fn is_pure(&self) -> bool {
        self.negative <= 0.0 || self.positive <= 0.0
    }
}

/// Builds one classification tree over a (bootstrapped) sample of rows
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    labels: &'a [u8],
    class_weight: [f64; 2],
    feature_count: usize,
    rng: LcgRng,
    importances: Vec<f64>,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        labels: &'a [u8],
        class_weight: [f64; 2],
        config: TreeConfig,
        rng: LcgRng,
    ) -> Self {
        let feature_count = features.first().map(Vec::len).unwrap_or(0);
        Self {
            config,
            features,
            labels,
            class_weight,
            feature_count,
            rng,
            importances: vec![0.0; feature_count],
        }
    }

    /// Build a tree over `indices` (repeats allowed) and return it with the
    /// total weighted impurity decrease per feature
    pub fn build(mut self, indices: &[usize]) -> (Tree, Vec<f64>) {
        let mut nodes = Vec::new();
        self.build_node(indices, 0, &mut nodes, 0);
        (Tree::new(nodes), self.importances)
    }

    fn weight(&self, idx: usize) -> f64 {
        self.class_weight[usize::from(self.labels[idx] == 1)]
    }

    fn class_weights(&self, indices: &[usize]) -> ClassWeights {
        let mut w = ClassWeights::default();
        for &idx in indices {
            w.add(self.labels[idx], self.weight(idx));
        }
        w
    }

    /// Recursively build nodes in pre-order; returns this node's index
    fn build_node(
        &mut self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        node_id: usize,
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let weights = self.class_weights(indices);
        let leaf = Node::leaf(current_idx, weights.positive_fraction());

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
            || weights.is_pure()
        {
            nodes.push(leaf);
            return current_idx;
        }

        let split = match self.find_best_split(indices, &weights, node_id) {
            Some(s) if s.decrease > 0.0 => s,
            _ => {
                nodes.push(leaf);
                return current_idx;
            }
        };

        let (left_indices, right_indices) =
            self.split_samples(indices, split.feature_idx, split.threshold);

        self.importances[split.feature_idx] += split.decrease;

        // Reserve the slot; children are appended after it
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes, node_id * 2 + 1);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes, node_id * 2 + 2);

        let node = &mut nodes[current_idx as usize];
        node.left = left_idx;
        node.right = right_idx;

        current_idx
    }

    /// Best split over a random subset of `max_features` features
    fn find_best_split(
        &mut self,
        indices: &[usize],
        parent: &ClassWeights,
        node_id: usize,
    ) -> Option<SplitCandidate> {
        let candidates = self
            .rng
            .sample_without_replacement(self.feature_count, self.config.max_features.max(1));
        let parent_impurity = parent.gini() * parent.total();

        let mut best: Option<SplitCandidate> = None;

        for feature_idx in candidates {
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
            });

            let mut left = ClassWeights::default();
            let mut right = *parent;

            for pos in 0..sorted.len().saturating_sub(1) {
                let idx = sorted[pos];
                let w = self.weight(idx);
                left.add(self.labels[idx], w);
                right.add(self.labels[idx], -w);

                let here = self.features[idx][feature_idx];
                let next = self.features[sorted[pos + 1]][feature_idx];
                if here == next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = sorted.len() - n_left;
                if n_left < self.config.min_samples_leaf || n_right < self.config.min_samples_leaf {
                    continue;
                }

                let decrease =
                    parent_impurity - left.gini() * left.total() - right.gini() * right.total();

                let mut threshold = here + (next - here) / 2.0;
                if threshold >= next {
                    threshold = here;
                }

                let candidate = SplitCandidate::new(feature_idx, threshold, decrease, node_id);
                best = match best {
                    Some(current) if !candidate.beats(&current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }

        best
    }

    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .partition(|&&idx| self.features[idx][feature_idx] <= threshold)
    }
}
