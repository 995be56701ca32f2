//! Held-out evaluation metrics

/// Fraction of predictions matching the labels at `threshold`
pub fn accuracy(probabilities: &[f64], labels: &[u8], threshold: f64) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(&p, &l)| u8::from(p >= threshold) == l)
        .count();
    correct as f64 / labels.len() as f64
}

/// Area under the ROC curve via the rank-sum statistic, with tied scores
/// sharing their average rank. `None` when only one class is present.
pub fn roc_auc(probabilities: &[f64], labels: &[u8]) -> Option<f64> {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probabilities[order[j + 1]] == probabilities[order[i]] {
            j += 1;
        }
        // ranks are 1-based; the tie group i..=j shares the mean rank
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                rank_sum += rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let probs = [0.9, 0.2, 0.6, 0.4];
        let labels = [1, 0, 0, 0];
        assert_eq!(accuracy(&probs, &labels, 0.5), 0.75);
        assert_eq!(accuracy(&[], &[], 0.5), 0.0);
    }

    #[test]
    fn test_auc_perfect_and_inverted() {
        let labels = [0, 0, 1, 1];
        assert_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &labels), Some(1.0));
        assert_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &labels), Some(0.0));
    }

    #[test]
    fn test_auc_ties() {
        // one positive tied with one negative
        let auc = roc_auc(&[0.1, 0.5, 0.5, 0.9], &[0, 0, 1, 1]).unwrap();
        assert!((auc - 0.875).abs() < 1e-12);
        assert_eq!(roc_auc(&[0.5, 0.5], &[0, 1]), Some(0.5));
    }

    #[test]
    fn test_auc_single_class() {
        assert_eq!(roc_auc(&[0.3, 0.7], &[1, 1]), None);
    }
}
