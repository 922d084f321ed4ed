//! Series transformations applied before reporting.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use dreamshift::core::{BucketWidth, Series};
//! use dreamshift::transform::rolling_mean;
//!
//! let start = Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap();
//! let series = Series::from_points(
//!     "emo_anx",
//!     BucketWidth::Daily,
//!     (0..7).map(|d| (start + Duration::days(d), d as f64)),
//! )
//! .unwrap();
//!
//! // Only the middle day has three complete days on each side.
//! let smooth = rolling_mean(&series, 7).unwrap();
//! assert_eq!(smooth.values(), vec![3.0]);
//! ```

pub mod window;

pub use window::rolling_mean;
