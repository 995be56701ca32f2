//! Stratified train/test split

use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Split row indices so both parts keep the class ratio.
///
/// Each class is shuffled with a seeded RNG and `round(len * test_size)`
/// of its rows go to the test part, keeping at least one row of every
/// class on each side. Both index lists come back sorted.
pub fn stratified_split(
    labels: &[u8],
    test_size: f64,
    seed: i64,
) -> Result<(Vec<usize>, Vec<usize>), TrainerError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainerError::Training(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let mut rng = LcgRng::new(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();

        if members.len() < 2 {
            return Err(TrainerError::Training(format!(
                "class {class} has {} sample(s); need at least 2 to stratify",
                members.len()
            )));
        }

        rng.shuffle(&mut members);
        let n_test = ((members.len() as f64 * test_size).round() as usize)
            .clamp(1, members.len() - 1);

        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}
