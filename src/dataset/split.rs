//! Seeded train/test partitioning

use crate::{Error, Result};

/// Smallest dataset that can be split
pub const MIN_SPLIT_RECORDS: usize = 10;

pub const DEFAULT_TEST_FRACTION: f64 = 0.1;
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Disjoint train and test partitions of one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// Shuffle `records` with a seeded RNG and cut off `ceil(n * test_fraction)`
/// of them as the test partition.
///
/// Both partitions keep the shuffled order. The same input and seed always
/// give the same split.
pub fn train_test_split<T>(records: Vec<T>, test_fraction: f64, seed: u64) -> Result<Split<T>> {
    let n = records.len();
    if n < MIN_SPLIT_RECORDS {
        return Err(Error::insufficient_data(format!(
            "sample size is too small to create a train/test split: {} records, minimum is {}",
            n, MIN_SPLIT_RECORDS
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::configuration(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);

    let mut order: Vec<usize> = (0..n).collect();
    fastrand::Rng::with_seed(seed).shuffle(&mut order);

    let mut slots: Vec<Option<T>> = records.into_iter().map(Some).collect();
    let mut take = |idx: &usize| slots[*idx].take();

    let test: Vec<T> = order[..n_test].iter().filter_map(&mut take).collect();
    let train: Vec<T> = order[n_test..].iter().filter_map(&mut take).collect();

    tracing::info!(
        train = train.len(),
        test = test.len(),
        seed,
        "Split dataset into train and test"
    );

    Ok(Split { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split((0..100).collect::<Vec<i32>>(), 0.1, 42).unwrap();
        assert_eq!(split.test.len(), 10);
        assert_eq!(split.train.len(), 90);

        let split = train_test_split((0..15).collect::<Vec<i32>>(), 0.1, 42).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 13);
    }

    #[test]
    fn test_split_is_partition() {
        let split = train_test_split((0..57).collect::<Vec<i32>>(), 0.1, 1).unwrap();
        let mut all: Vec<i32> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..57).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_deterministic() {
        let a = train_test_split((0..40).collect::<Vec<i32>>(), 0.1, 42).unwrap();
        let b = train_test_split((0..40).collect::<Vec<i32>>(), 0.1, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_too_small() {
        let err = train_test_split((0..9).collect::<Vec<i32>>(), 0.1, 42).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
        assert!(train_test_split((0..10).collect::<Vec<i32>>(), 0.1, 42).is_ok());
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        for fraction in [0.0, 1.0, -0.5, f64::NAN] {
            let result = train_test_split((0..20).collect::<Vec<i32>>(), fraction, 42);
            assert!(matches!(result, Err(Error::Configuration(_))));
        }
    }
}
