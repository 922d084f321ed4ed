//! Statistical evaluation: correlation, regression, independence tests.
//!
//! Distribution functions come from `statrs`; this module shapes the input
//! and packages the output.

pub mod bootstrap;
pub mod correlation;
pub mod descriptive;
pub mod independence;
pub mod regression;

pub use bootstrap::{bootstrap_mean_ci, BootstrapConfig, ConfidenceInterval};
pub use correlation::{spearman, CorrelationResult};
pub use independence::{
    chi2_independence, ContingencyTable, IndependenceResult, PowerDivergence,
};
pub use regression::{
    fit_ols, segmented_design, CholeskySolver, Counterfactual, DesignMatrix, LeastSquares,
    LinearFit, PredictionRow, SegmentedFit, SegmentedRegression, TermEstimate,
};
