//! # dreamshift
//!
//! Windowed time-series aggregation and lag-shifted statistical comparison
//! of news and dream-report corpora around the March 11, 2020 pandemic
//! declaration.
//!
//! Every analysis is a linear batch job over LIWC-scored CSV tables:
//! filter records, normalise timestamps to UTC, bucket them daily or
//! weekly, align series by lag, evaluate a statistic and emit TSV reports.
//! The five analyses live in [`pipeline`]; the building blocks are usable
//! on their own.

#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod aggregate;
pub mod align;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod io;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod temporal;
pub mod transform;

pub use error::{AnalysisError, Result};

pub mod prelude {
    pub use crate::aggregate::{aggregate, Observation, Reduction};
    pub use crate::align::{inner_join, pct_change, shift, shift_on_grid};
    pub use crate::config::Settings;
    pub use crate::core::{BucketWidth, Record, Series, TextColumn};
    pub use crate::error::{AnalysisError, Result};
    pub use crate::filter::{CategoryFilter, PostCategory, RecordFilter};
    pub use crate::pipeline::Analysis;
    pub use crate::temporal::{anchor_for_year, Period, Window};
}
