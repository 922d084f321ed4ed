//! Spearman rank correlation with Fisher-z intervals.

use super::descriptive::{average_ranks, mean};
use crate::error::{AnalysisError, Result};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Smallest sample for which the Fisher-z interval is defined.
pub const MIN_CORRELATION_SAMPLES: usize = 4;

/// Correlation coefficient with its significance and interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    /// Always `"spearman"`; reported as the `method` column.
    pub method: &'static str,
    pub n: usize,
    pub r: f64,
    /// Lower bound of the 95% confidence interval.
    pub ci_lower: f64,
    /// Upper bound of the 95% confidence interval.
    pub ci_upper: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Spearman rank correlation.
///
/// Both inputs must be equal length with no missing values; the join step
/// upstream is expected to have removed incomplete rows.
///
/// # Example
/// ```
/// use dreamshift::stats::spearman;
///
/// let x = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let result = spearman(&x, &x).unwrap();
/// assert!((result.r - 1.0).abs() < 1e-12);
/// ```
pub fn spearman(x: &[f64], y: &[f64]) -> Result<CorrelationResult> {
    validate(x, y)?;
    let rx = average_ranks(x);
    let ry = average_ranks(y);
    let r = pearson_r(&rx, &ry)?;
    package("spearman", x.len(), r)
}

fn validate(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(AnalysisError::InvalidParameter(format!(
            "correlation inputs differ in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < MIN_CORRELATION_SAMPLES {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_CORRELATION_SAMPLES,
            got: x.len(),
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidParameter(
            "correlation inputs contain missing values".to_string(),
        ));
    }
    Ok(())
}

fn pearson_r(x: &[f64], y: &[f64]) -> Result<f64> {
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return Err(AnalysisError::InvalidParameter(
            "correlation is undefined for a constant input".to_string(),
        ));
    }
    Ok((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

fn package(method: &'static str, n: usize, r: f64) -> Result<CorrelationResult> {
    let df = (n - 2) as f64;
    let p_value = if 1.0 - r * r <= 0.0 {
        0.0
    } else {
        let t = r * (df / (1.0 - r * r)).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;
        (2.0 * dist.sf(t.abs())).min(1.0)
    };

    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;
    let crit = normal.inverse_cdf(0.975);
    let z = r.atanh();
    let se = 1.0 / ((n - 3) as f64).sqrt();

    Ok(CorrelationResult {
        method,
        n,
        r,
        ci_lower: (z - crit * se).tanh(),
        ci_upper: (z + crit * se).tanh(),
        p_value,
    })
}
