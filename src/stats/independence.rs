//! Chi-square independence tests on a 2x2 contingency table.
//!
//! Rows are a binary group label (e.g. pre/post anchor), columns a binary
//! outcome. Every member of the Cressie-Read power-divergence family is
//! reported; the Pearson statistic is the `lambda = 1` member. No
//! continuity correction is applied.

use crate::error::{AnalysisError, Result};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Named members of the power-divergence family and their `lambda`.
pub const POWER_DIVERGENCE_TESTS: [(&str, f64); 6] = [
    ("pearson", 1.0),
    ("cressie-read", 2.0 / 3.0),
    ("log-likelihood", 0.0),
    ("freeman-tukey", -0.5),
    ("mod-log-likelihood", -1.0),
    ("neyman", -2.0),
];

/// Observed 2x2 counts, `counts[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub counts: [[u64; 2]; 2],
}

impl ContingencyTable {
    pub fn new(counts: [[u64; 2]; 2]) -> Self {
        Self { counts }
    }

    /// Cross-tabulate `(row, col)` label pairs; `false` indexes 0.
    pub fn from_labels(pairs: impl IntoIterator<Item = (bool, bool)>) -> Self {
        let mut counts = [[0u64; 2]; 2];
        for (row, col) in pairs {
            counts[usize::from(row)][usize::from(col)] += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn row_totals(&self) -> [u64; 2] {
        [
            self.counts[0][0] + self.counts[0][1],
            self.counts[1][0] + self.counts[1][1],
        ]
    }

    pub fn col_totals(&self) -> [u64; 2] {
        [
            self.counts[0][0] + self.counts[1][0],
            self.counts[0][1] + self.counts[1][1],
        ]
    }

    /// Expected counts under independence.
    pub fn expected(&self) -> [[f64; 2]; 2] {
        let n = self.total() as f64;
        let rows = self.row_totals();
        let cols = self.col_totals();
        let mut out = [[0.0; 2]; 2];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = rows[r] as f64 * cols[c] as f64 / n;
            }
        }
        out
    }
}

/// One power-divergence statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerDivergence {
    pub test: &'static str,
    pub lambda: f64,
    pub chi2: f64,
    pub dof: usize,
    pub p_value: f64,
    pub cramer_v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndependenceResult {
    pub observed: ContingencyTable,
    pub expected: [[f64; 2]; 2],
    pub tests: Vec<PowerDivergence>,
}

impl IndependenceResult {
    /// The Pearson chi-square row.
    pub fn pearson(&self) -> &PowerDivergence {
        &self.tests[0]
    }

    pub fn test(&self, name: &str) -> Option<&PowerDivergence> {
        self.tests.iter().find(|t| t.test == name)
    }
}

/// Chi-square test of independence for a 2x2 table.
///
/// # Errors
/// [`AnalysisError::InvalidParameter`] when a row or column is empty, i.e.
/// some expected frequency is zero.
///
/// # Example
/// ```
/// use dreamshift::stats::{chi2_independence, ContingencyTable};
///
/// let table = ContingencyTable::new([[40, 60], [10, 90]]);
/// let result = chi2_independence(&table).unwrap();
/// assert!((result.pearson().chi2 - 24.0).abs() < 1e-9);
/// ```
pub fn chi2_independence(table: &ContingencyTable) -> Result<IndependenceResult> {
    let expected = table.expected();
    if expected.iter().flatten().any(|e| e.is_nan() || *e <= 0.0) {
        return Err(AnalysisError::InvalidParameter(format!(
            "contingency table {:?} has an empty row or column",
            table.counts
        )));
    }

    let dof = 1;
    let dist = ChiSquared::new(dof as f64)
        .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;
    let n = table.total() as f64;

    let tests = POWER_DIVERGENCE_TESTS
        .iter()
        .map(|&(test, lambda)| {
            let chi2 = power_divergence(&table.counts, &expected, lambda).max(0.0);
            let p_value = if chi2.is_finite() { dist.sf(chi2) } else { 0.0 };
            PowerDivergence {
                test,
                lambda,
                chi2,
                dof,
                p_value,
                cramer_v: (chi2 / n).sqrt(),
            }
        })
        .collect();

    Ok(IndependenceResult {
        observed: *table,
        expected,
        tests,
    })
}

/// Cressie-Read statistic `2 / (l (l + 1)) * sum o ((o / e)^l - 1)`.
fn power_divergence(observed: &[[u64; 2]; 2], expected: &[[f64; 2]; 2], lambda: f64) -> f64 {
    let cells = observed
        .iter()
        .flatten()
        .map(|&o| o as f64)
        .zip(expected.iter().flatten().copied());

    if lambda == 0.0 {
        // Limit as lambda -> 0: G-test.
        2.0 * cells
            .map(|(o, e)| if o == 0.0 { 0.0 } else { o * (o / e).ln() })
            .sum::<f64>()
    } else if lambda == -1.0 {
        // Limit as lambda -> -1: modified log-likelihood.
        2.0 * cells
            .map(|(o, e)| if o == 0.0 { f64::INFINITY } else { e * (e / o).ln() })
            .sum::<f64>()
    } else {
        let scale = 2.0 / (lambda * (lambda + 1.0));
        scale
            * cells
                .map(|(o, e)| {
                    if o == 0.0 {
                        // o * (o/e)^l vanishes only for l > -1.
                        if lambda > -1.0 {
                            0.0
                        } else {
                            f64::INFINITY
                        }
                    } else {
                        o * ((o / e).powf(lambda) - 1.0)
                    }
                })
                .sum::<f64>()
    }
}
