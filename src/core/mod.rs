//! Core data structures: records read from disk and bucketed series.

mod record;
mod series;

pub use record::{Record, TextColumn};
pub use series::{Bucket, BucketWidth, Series};
