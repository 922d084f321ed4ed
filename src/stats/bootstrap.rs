//! Percentile bootstrap for the mean of a sample.
//!
//! Resampling is seeded by default so that repeated runs over the same data
//! produce identical intervals.

use super::descriptive::{mean, percentile_sorted};
use crate::error::{AnalysisError, Result};
use rand::prelude::*;
use rand::SeedableRng;
use serde::Serialize;

/// Seed used when none is configured explicitly.
pub const DEFAULT_SEED: u64 = 4096;

/// Configuration for bootstrap interval estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    /// Number of resamples to draw.
    pub n_resamples: usize,
    /// Random seed (None draws from entropy and is not reproducible).
    pub seed: Option<u64>,
    /// Two-sided confidence level, e.g. 0.95.
    pub confidence: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_resamples: 10_000,
            seed: Some(DEFAULT_SEED),
            confidence: 0.95,
        }
    }
}

impl BootstrapConfig {
    /// Create a config drawing `n_resamples` resamples.
    pub fn new(n_resamples: usize) -> Self {
        Self {
            n_resamples,
            ..Default::default()
        }
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Two-sided interval around a point estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

/// Draw `n` values with replacement.
fn resample(values: &[f64], rng: &mut impl Rng) -> Vec<f64> {
    let n = values.len();
    (0..n).map(|_| values[rng.gen_range(0..n)]).collect()
}

/// Percentile bootstrap interval for the sample mean.
///
/// The interval bounds are the `(1 - confidence) / 2` and
/// `(1 + confidence) / 2` quantiles of the resampled means, linearly
/// interpolated.
///
/// # Example
/// ```
/// use dreamshift::stats::{bootstrap_mean_ci, BootstrapConfig};
///
/// let flags = [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
/// let ci = bootstrap_mean_ci(&flags, &BootstrapConfig::new(2000)).unwrap();
/// assert!(ci.lower <= 0.3 && 0.3 <= ci.upper);
/// ```
pub fn bootstrap_mean_ci(values: &[f64], config: &BootstrapConfig) -> Result<ConfidenceInterval> {
    if values.is_empty() {
        return Err(AnalysisError::InsufficientData { needed: 1, got: 0 });
    }
    if config.n_resamples == 0 {
        return Err(AnalysisError::InvalidParameter(
            "bootstrap needs at least one resample".to_string(),
        ));
    }
    if !(config.confidence > 0.0 && config.confidence < 1.0) {
        return Err(AnalysisError::InvalidParameter(format!(
            "confidence level must lie in (0, 1), got {}",
            config.confidence
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidParameter(
            "bootstrap sample contains missing values".to_string(),
        ));
    }

    let mut rng = config.rng();
    let mut means: Vec<f64> = (0..config.n_resamples)
        .map(|_| mean(&resample(values, &mut rng)))
        .collect();
    means.sort_by(f64::total_cmp);

    let tail = (1.0 - config.confidence) / 2.0 * 100.0;
    Ok(ConfidenceInterval {
        estimate: mean(values),
        lower: percentile_sorted(&means, tail),
        upper: percentile_sorted(&means, 100.0 - tail),
        level: config.confidence,
    })
}
