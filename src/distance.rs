//! Distance functions for multi-vector embeddings
//!
//! Per-vector distances are combined into one scalar by a position-matched
//! weighted sum, rounded once to [`DIST_DECIMALS`] places.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Number of decimal places kept on aggregated distances
pub const DIST_DECIMALS: usize = 6;

/// Distance metric for brute-force scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Euclidean,
    Cosine,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Euclidean, Metric::Cosine];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Cosine => "cosine",
        }
    }

    /// Distance between two equal-length vectors
    #[inline]
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Metric::Euclidean => euclidean_distance(a, b),
            Metric::Cosine => cosine_distance(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            "cosine" => Ok(Metric::Cosine),
            other => Err(Error::configuration(format!(
                "unsupported distance metric: {}",
                other
            ))),
        }
    }
}

/// Euclidean (L2) distance
///
/// Falls back to a rescaled sum when the squared terms overflow, so finite
/// inputs only yield `inf` when the true distance exceeds `f64::MAX`.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    let sum: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    if sum.is_finite() {
        return sum.sqrt();
    }

    let scale = max_abs(a).max(max_abs(b));
    let scaled: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x / scale - y / scale).powi(2))
        .sum();
    scaled.sqrt() * scale
}

/// Cosine distance, `1 - cos(a, b)`.
///
/// A zero-norm vector on either side yields `1.0`. Inputs whose dot product
/// or norms overflow or underflow are rescaled to unit max-abs first.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let (dot, sq_a, sq_b) = dot_and_squares(a, b, 1.0, 1.0);
    let (norm_a, norm_b) = (sq_a.sqrt(), sq_b.sqrt());
    if dot.is_finite() && norm_a.is_finite() && norm_b.is_finite() && norm_a > 0.0 && norm_b > 0.0 {
        return 1.0 - dot / (norm_a * norm_b);
    }

    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    if scale_a == 0.0 || scale_b == 0.0 {
        return 1.0;
    }

    // Scaled squares are bounded by the dimension, so their product is finite
    let (dot, sq_a, sq_b) = dot_and_squares(a, b, scale_a, scale_b);
    1.0 - dot / (sq_a * sq_b).sqrt()
}

fn dot_and_squares(a: &[f64], b: &[f64], scale_a: f64, scale_b: f64) -> (f64, f64, f64) {
    let mut dot = 0.0;
    let mut sq_a = 0.0;
    let mut sq_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (x / scale_a, y / scale_b);
        dot += x * y;
        sq_a += x * x;
        sq_b += y * y;
    }
    (dot, sq_a, sq_b)
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

/// Uniform weights over `num_vectors` positions
pub fn uniform_weights(num_vectors: usize) -> Vec<f64> {
    vec![1.0 / num_vectors as f64; num_vectors]
}

/// Weighted sum of per-position distances, rounded to [`DIST_DECIMALS`] places.
///
/// `emb_a`, `emb_b` and `weights` must have the same length; the caller
/// guarantees this. A sum that overflows saturates to `f64::MAX`, so the
/// result is always finite for finite inputs.
pub fn aggregate(emb_a: &[Vec<f64>], emb_b: &[Vec<f64>], weights: &[f64], metric: Metric) -> f64 {
    let total: f64 = weights
        .iter()
        .zip(emb_a.iter().zip(emb_b.iter()))
        .map(|(w, (a, b))| w * metric.distance(a, b))
        .sum();
    if !total.is_finite() {
        return f64::MAX;
    }
    round_dist(total)
}

/// Round to [`DIST_DECIMALS`] places using the exact decimal expansion.
///
/// A result of negative zero is returned as `0.0`.
pub fn round_dist(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let rounded: f64 = format!("{:.*}", DIST_DECIMALS, value)
        .parse()
        .unwrap_or(value);
    rounded + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_basic() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.5, -2.0, 7.0], &[1.5, -2.0, 7.0]), 0.0);
    }

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        assert_eq!(cosine_distance(&[3.0, 4.0], &[3.0, 4.0]), 0.0);
        assert_eq!(cosine_distance(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]), 2.0);
    }

    #[test]
    fn test_cosine_zero_norm_either_side() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 2.0]), 1.0);
        assert_eq!(cosine_distance(&[1.0, 2.0], &[0.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_uniform_weights() {
        assert_eq!(uniform_weights(4), vec![0.25; 4]);
        assert_eq!(uniform_weights(1), vec![1.0]);
    }

    #[test]
    fn test_aggregate_weighted_sum() {
        let a = vec![vec![0.0, 0.0], vec![1.0, 0.0]];
        let b = vec![vec![3.0, 4.0], vec![1.0, 0.0]];

        // 0.5 * 5 + 0.5 * 0
        assert_eq!(aggregate(&a, &b, &uniform_weights(2), Metric::Euclidean), 2.5);
        // 0.5 * 1 (zero norm) + 0.5 * 0
        assert_eq!(aggregate(&a, &b, &uniform_weights(2), Metric::Cosine), 0.5);
    }

    #[test]
    fn test_aggregate_position_matched_reordering() {
        let a = vec![vec![1.0, 2.0], vec![0.0, 5.0], vec![2.0, 2.0]];
        let b = vec![vec![4.0, 6.0], vec![0.0, 1.0], vec![2.0, 3.0]];
        let w = vec![0.5, 0.25, 0.25];
        let order = [2, 0, 1];

        let a2: Vec<_> = order.iter().map(|&i| a[i].clone()).collect();
        let b2: Vec<_> = order.iter().map(|&i| b[i].clone()).collect();
        let w2: Vec<_> = order.iter().map(|&i| w[i]).collect();

        for metric in Metric::ALL {
            assert_eq!(aggregate(&a, &b, &w, metric), aggregate(&a2, &b2, &w2, metric));
        }
    }

    #[test]
    fn test_aggregate_rounds_to_six_places() {
        let a = vec![vec![0.0], vec![0.0], vec![0.0]];
        let b = vec![vec![1.0], vec![0.0], vec![0.0]];
        let dist = aggregate(&a, &b, &uniform_weights(3), Metric::Euclidean);
        assert_eq!(dist, 0.333333);

        let text = dist.to_string();
        let decimals = text.split('.').nth(1).map(str::len).unwrap_or(0);
        assert!(decimals <= DIST_DECIMALS);
    }

    #[test]
    fn test_round_dist() {
        assert_eq!(round_dist(0.1234564), 0.123456);
        assert_eq!(round_dist(0.1234566), 0.123457);
        assert_eq!(round_dist(2.0), 2.0);
        assert!(round_dist(f64::NAN).is_nan());
        assert!(round_dist(-1e-12).is_sign_positive());
    }

    #[test]
    fn test_large_magnitudes_stay_finite() {
        let big = [1e200, 1e200];
        assert_eq!(cosine_distance(&big, &big), 0.0);
        assert_eq!(cosine_distance(&big, &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_distance(&[1e200, 0.0], &[0.0, 1e200]), 1.0);

        let d = euclidean_distance(&[0.0, 0.0], &[3e200, 4e200]);
        assert!((d / 5e200 - 1.0).abs() < 1e-12);
        assert!(euclidean_distance(&big, &[-1e200, -1e200]).is_finite());
    }

    #[test]
    fn test_tiny_magnitudes_are_not_zero_norm() {
        let tiny = [1e-200, 1e-200];
        assert_eq!(cosine_distance(&tiny, &tiny), 0.0);
        assert_eq!(cosine_distance(&tiny, &[-1.0, -1.0]), 2.0);
    }

    #[test]
    fn test_aggregate_saturates_on_overflow() {
        let a = vec![vec![f64::MAX, f64::MAX]];
        let b = vec![vec![-f64::MAX, -f64::MAX]];
        assert_eq!(aggregate(&a, &b, &uniform_weights(1), Metric::Euclidean), f64::MAX);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("L2".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert!("dot".parse::<Metric>().is_err());
    }
}
