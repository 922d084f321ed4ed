//! Ordinary least squares and segmented (interrupted time-series) regression.
//!
//! The linear algebra sits behind the [`LeastSquares`] trait so the solver
//! can be swapped; [`CholeskySolver`] solves the normal equations directly.
//! Inference (standard errors, p-values, confidence bands) is computed from
//! the solver's `(X'X)^-1` with Student-t quantiles from `statrs`.

use crate::core::{BucketWidth, Series};
use crate::error::{AnalysisError, Result};
use crate::temporal::Window;
use chrono::{DateTime, Utc};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

/// Smallest number of observations any regression fit accepts.
pub const MIN_REGRESSION_POINTS: usize = 4;

/// Column-major design matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    rows: usize,
}

impl DesignMatrix {
    /// Design matrix holding only an `Intercept` column of ones.
    pub fn with_intercept(rows: usize) -> Self {
        Self {
            names: vec!["Intercept".to_string()],
            columns: vec![vec![1.0; rows]],
            rows,
        }
    }

    /// Append a regressor column.
    pub fn push(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        if values.len() != self.rows {
            return Err(AnalysisError::InvalidParameter(format!(
                "regressor has {} rows, design has {}",
                values.len(),
                self.rows
            )));
        }
        self.names.push(name.into());
        self.columns.push(values);
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Row `i` across all columns.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[i]).collect()
    }

    /// Keep the rows selected by `keep`, in order.
    pub fn select_rows(&self, keep: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| keep.iter().map(|&i| c[i]).collect())
                .collect(),
            rows: keep.len(),
        }
    }

    /// Keep the named columns, in the given order.
    pub fn select_columns(&self, names: &[&str]) -> Result<Self> {
        let mut out = Self {
            names: Vec::with_capacity(names.len()),
            columns: Vec::with_capacity(names.len()),
            rows: self.rows,
        };
        for name in names {
            let col = self.column(name).ok_or_else(|| {
                AnalysisError::InvalidParameter(format!("design has no column '{}'", name))
            })?;
            out.names.push(name.to_string());
            out.columns.push(col.to_vec());
        }
        Ok(out)
    }
}

/// Coefficients and unscaled covariance `(X'X)^-1` of a least-squares solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresSolution {
    pub coefficients: Vec<f64>,
    pub xtx_inverse: Vec<Vec<f64>>,
}

/// Numerical backend for least squares.
pub trait LeastSquares {
    /// Solve `min ||y - X b||`.
    ///
    /// # Errors
    /// [`AnalysisError::CollinearRegressors`] when `X'X` is singular.
    fn solve(&self, design: &DesignMatrix, y: &[f64]) -> Result<LeastSquaresSolution>;
}

/// Normal equations solved with a Cholesky factorisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CholeskySolver {
    /// Relative pivot threshold below which `X'X` is treated as singular.
    pub tolerance: f64,
}

impl Default for CholeskySolver {
    fn default() -> Self {
        Self { tolerance: 1e-10 }
    }
}

impl LeastSquares for CholeskySolver {
    fn solve(&self, design: &DesignMatrix, y: &[f64]) -> Result<LeastSquaresSolution> {
        let p = design.cols();
        let cols = &design.columns;

        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        for i in 0..p {
            for j in 0..=i {
                let s: f64 = cols[i].iter().zip(&cols[j]).map(|(a, b)| a * b).sum();
                xtx[i][j] = s;
                xtx[j][i] = s;
            }
            xty[i] = cols[i].iter().zip(y).map(|(a, b)| a * b).sum();
        }

        let l = cholesky(&xtx, self.tolerance).ok_or_else(|| {
            AnalysisError::CollinearRegressors(design.names().join(", "))
        })?;

        let coefficients = cholesky_solve(&l, &xty);
        // Symmetric, so solving for each unit vector yields its rows.
        let xtx_inverse = (0..p)
            .map(|j| {
                let mut e = vec![0.0; p];
                e[j] = 1.0;
                cholesky_solve(&l, &e)
            })
            .collect();

        Ok(LeastSquaresSolution {
            coefficients,
            xtx_inverse,
        })
    }
}

/// Lower-triangular `L` with `A = L L'`, or `None` if `A` is not
/// numerically positive definite.
fn cholesky(a: &[Vec<f64>], tolerance: f64) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= tolerance * a[i][i].abs().max(f64::MIN_POSITIVE) {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L L' x = b` by forward then backward substitution.
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }
    x
}

/// Estimate for one model term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermEstimate {
    pub name: String,
    pub coefficient: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Fitted mean with its standard error and confidence band at one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionRow {
    pub mean: f64,
    pub mean_se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// A fitted linear model with classical OLS inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub terms: Vec<TermEstimate>,
    pub n: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Residual variance estimate.
    pub sigma2: f64,
    /// Significance level used for the intervals.
    pub alpha: f64,
    #[serde(skip)]
    covariance: Vec<Vec<f64>>,
}

impl LinearFit {
    pub fn term(&self, name: &str) -> Option<&TermEstimate> {
        self.terms.iter().find(|t| t.name == name)
    }

    pub fn coefficients(&self) -> Vec<f64> {
        self.terms.iter().map(|t| t.coefficient).collect()
    }

    /// Point predictions; `design` must carry this model's columns.
    pub fn predict(&self, design: &DesignMatrix) -> Result<Vec<f64>> {
        let design = self.align(design)?;
        let beta = self.coefficients();
        Ok((0..design.rows())
            .map(|i| design.row(i).iter().zip(&beta).map(|(x, b)| x * b).sum())
            .collect())
    }

    /// Fitted mean, its standard error and `1 - alpha` band per row.
    pub fn prediction_band(&self, design: &DesignMatrix) -> Result<Vec<PredictionRow>> {
        let design = self.align(design)?;
        let beta = self.coefficients();
        let crit = t_critical(self.df_resid, self.alpha)?;

        Ok((0..design.rows())
            .map(|i| {
                let x = design.row(i);
                let mean: f64 = x.iter().zip(&beta).map(|(a, b)| a * b).sum();
                let var: f64 = x
                    .iter()
                    .enumerate()
                    .map(|(r, xr)| {
                        xr * x
                            .iter()
                            .enumerate()
                            .map(|(c, xc)| self.covariance[r][c] * xc)
                            .sum::<f64>()
                    })
                    .sum();
                let mean_se = var.max(0.0).sqrt();
                PredictionRow {
                    mean,
                    mean_se,
                    ci_lower: mean - crit * mean_se,
                    ci_upper: mean + crit * mean_se,
                }
            })
            .collect())
    }

    /// Plain-text regression table.
    pub fn summary(&self, dependent: &str) -> String {
        let mut out = String::new();
        let rule = "=".repeat(78);
        let thin = "-".repeat(78);

        out.push_str(&format!("{:^78}\n", "OLS Regression Results"));
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17.3}\n",
            "Dep. Variable:", dependent, "R-squared:", self.r_squared
        ));
        out.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17.3}\n",
            "No. Observations:", self.n, "Adj. R-squared:", self.adj_r_squared
        ));
        out.push_str(&format!(
            "{:<20}{:>18}   {:<20}{:>17.4e}\n",
            "Df Residuals:", self.df_resid, "Sigma^2:", self.sigma2
        ));
        out.push_str(&rule);
        out.push('\n');

        let lo = format!("[{}", self.alpha / 2.0);
        let hi = format!("{}]", 1.0 - self.alpha / 2.0);
        out.push_str(&format!(
            "{:<14}{:>10}{:>11}{:>10}{:>9}{:>12}{:>12}\n",
            "", "coef", "std err", "t", "P>|t|", lo, hi
        ));
        out.push_str(&thin);
        out.push('\n');
        for term in &self.terms {
            out.push_str(&format!(
                "{:<14}{:>10.4}{:>11.3}{:>10.3}{:>9.3}{:>12.3}{:>12.3}\n",
                term.name,
                term.coefficient,
                term.std_error,
                term.t_value,
                term.p_value,
                term.ci_lower,
                term.ci_upper
            ));
        }
        out.push_str(&rule);
        out.push('\n');
        out
    }

    fn align(&self, design: &DesignMatrix) -> Result<DesignMatrix> {
        let names: Vec<&str> = self.terms.iter().map(|t| t.name.as_str()).collect();
        design.select_columns(&names)
    }
}

fn t_critical(df: usize, alpha: f64) -> Result<f64> {
    let dist = StudentsT::new(0.0, 1.0, df as f64)
        .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;
    Ok(dist.inverse_cdf(1.0 - alpha / 2.0))
}

/// Fit `y ~ design` and compute standard OLS inference.
///
/// # Errors
/// - [`AnalysisError::InsufficientData`] with fewer than
///   `max(4, columns + 1)` rows.
/// - [`AnalysisError::CollinearRegressors`] from the solver.
pub fn fit_ols<S: LeastSquares + ?Sized>(
    design: &DesignMatrix,
    y: &[f64],
    solver: &S,
    alpha: f64,
) -> Result<LinearFit> {
    let n = design.rows();
    let p = design.cols();
    if y.len() != n {
        return Err(AnalysisError::InvalidParameter(format!(
            "response has {} rows, design has {}",
            y.len(),
            n
        )));
    }
    let needed = MIN_REGRESSION_POINTS.max(p + 1);
    if n < needed {
        return Err(AnalysisError::InsufficientData { needed, got: n });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidParameter(
            "regression response contains missing values".to_string(),
        ));
    }

    let solution = solver.solve(design, y)?;
    let beta = &solution.coefficients;

    let fitted: Vec<f64> = (0..n)
        .map(|i| design.row(i).iter().zip(beta).map(|(x, b)| x * b).sum())
        .collect();
    let ssr: f64 = y.iter().zip(&fitted).map(|(a, f)| (a - f).powi(2)).sum();
    let y_mean = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();

    let df_resid = n - p;
    let sigma2 = ssr / df_resid as f64;
    let covariance: Vec<Vec<f64>> = solution
        .xtx_inverse
        .iter()
        .map(|row| row.iter().map(|v| v * sigma2).collect())
        .collect();

    let dist = StudentsT::new(0.0, 1.0, df_resid as f64)
        .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;
    let crit = dist.inverse_cdf(1.0 - alpha / 2.0);

    let terms = design
        .names()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let coefficient = beta[j];
            let std_error = covariance[j][j].max(0.0).sqrt();
            let t_value = coefficient / std_error;
            let p_value = if t_value.is_finite() {
                (2.0 * dist.sf(t_value.abs())).min(1.0)
            } else if coefficient == 0.0 {
                1.0
            } else {
                0.0
            };
            TermEstimate {
                name: name.clone(),
                coefficient,
                std_error,
                t_value,
                p_value,
                ci_lower: coefficient - crit * std_error,
                ci_upper: coefficient + crit * std_error,
            }
        })
        .collect();

    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;

    Ok(LinearFit {
        terms,
        n,
        df_resid,
        r_squared,
        adj_r_squared,
        sigma2,
        alpha,
        covariance,
    })
}

/// Regressor names of the segmented model.
pub const TIME: &str = "Time";
pub const INTERVENTION: &str = "Covid";
pub const TIME_SINCE_INTERVENTION: &str = "TimeCovid";

/// `Intercept, Time, Covid, TimeCovid` for bucket starts around `anchor`.
///
/// Regressors count elapsed buckets on the calendar grid, so a missing
/// bucket leaves a gap instead of compressing time. `Time` is 1 at `origin`,
/// `Covid` is 1 strictly after the anchor, and `TimeCovid` is the number of
/// buckets since the anchor's bucket (0 up to it).
pub fn segmented_design(
    dates: &[DateTime<Utc>],
    width: BucketWidth,
    origin: DateTime<Utc>,
    anchor: DateTime<Utc>,
) -> DesignMatrix {
    let n = dates.len();
    let origin = width.floor(origin);
    let anchor_bucket = width.floor(anchor);
    let time: Vec<f64> = dates
        .iter()
        .map(|d| (width.steps_between(origin, *d) + 1) as f64)
        .collect();
    let post: Vec<f64> = dates
        .iter()
        .map(|d| if *d > anchor { 1.0 } else { 0.0 })
        .collect();
    let since: Vec<f64> = dates
        .iter()
        .zip(&post)
        .map(|(d, p)| p * width.steps_between(anchor_bucket, *d) as f64)
        .collect();

    DesignMatrix {
        names: ["Intercept", TIME, INTERVENTION, TIME_SINCE_INTERVENTION]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        columns: vec![vec![1.0; n], time, post, since],
        rows: n,
    }
}

/// Full-window segmented fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedFit {
    pub model: LinearFit,
    pub dates: Vec<DateTime<Utc>>,
    pub observed: Vec<f64>,
    pub band: Vec<PredictionRow>,
}

/// Pre-anchor trend extrapolated over the post-anchor rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterfactual {
    pub model: LinearFit,
    pub dates: Vec<DateTime<Utc>>,
    pub predicted: Vec<f64>,
}

/// Interrupted time-series regression around an anchor.
#[derive(Debug, Clone)]
pub struct SegmentedRegression<S: LeastSquares = CholeskySolver> {
    solver: S,
    alpha: f64,
}

impl Default for SegmentedRegression<CholeskySolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentedRegression<CholeskySolver> {
    pub fn new() -> Self {
        Self {
            solver: CholeskySolver::default(),
            alpha: 0.05,
        }
    }
}

impl<S: LeastSquares> SegmentedRegression<S> {
    pub fn with_solver<T: LeastSquares>(self, solver: T) -> SegmentedRegression<T> {
        SegmentedRegression {
            solver,
            alpha: self.alpha,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Fit `y ~ Time + Covid + TimeCovid` over every bucket of `series`,
    /// counting time from the start of `window`.
    pub fn fit(&self, series: &Series, window: &Window) -> Result<SegmentedFit> {
        let dates = series.timestamps();
        let observed = series.values();
        let design = segmented_design(&dates, series.width(), window.start(), window.anchor());

        let model = fit_ols(&design, &observed, &self.solver, self.alpha)?;
        let band = model.prediction_band(&design)?;
        debug!(n = model.n, r_squared = model.r_squared, "segmented fit");

        Ok(SegmentedFit {
            model,
            dates,
            observed,
            band,
        })
    }

    /// Fit `y ~ Time` on buckets up to and including the anchor and
    /// predict every bucket from the anchor on.
    ///
    /// The intervention regressors are constant zero before the anchor, so
    /// only the intercept and time trend are estimable there.
    pub fn counterfactual(&self, series: &Series, window: &Window) -> Result<Counterfactual> {
        let anchor = window.anchor();
        let dates = series.timestamps();
        let values = series.values();
        let design = segmented_design(&dates, series.width(), window.start(), anchor)
            .select_columns(&["Intercept", TIME])?;

        let pre: Vec<usize> = (0..dates.len()).filter(|&i| dates[i] <= anchor).collect();
        let post: Vec<usize> = (0..dates.len()).filter(|&i| dates[i] >= anchor).collect();

        let pre_y: Vec<f64> = pre.iter().map(|&i| values[i]).collect();
        let model = fit_ols(&design.select_rows(&pre), &pre_y, &self.solver, self.alpha)?;
        let predicted = model.predict(&design.select_rows(&post))?;
        debug!(pre = pre.len(), post = post.len(), "counterfactual fit");

        Ok(Counterfactual {
            model,
            dates: post.iter().map(|&i| dates[i]).collect(),
            predicted,
        })
    }
}
