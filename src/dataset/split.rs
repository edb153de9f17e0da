use rand::rngs::StdRng;
use rand::{SeedableRng, seq::SliceRandom};

use super::DatasetError;

/// Row indices of a seeded train/held-out split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub held_out: Vec<usize>,
}

/// Split `n` rows into train and held-out partitions with a seeded permutation.
///
/// The held-out partition takes `ceil(test_fraction * n)` rows, the training partition the
/// rest. No stratification is applied.
pub fn split_train_test(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, DatasetError> {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let held_out_len = ((n as f64) * fraction).ceil() as usize;
    let held_out_len = held_out_len.min(n);
    if n == 0 || held_out_len == n {
        return Err(DatasetError::EmptyTrainingSplit {
            total: n,
            held_out: held_out_len,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let train = indices.split_off(held_out_len);
    Ok(SplitIndices {
        train,
        held_out: indices,
    })
}
