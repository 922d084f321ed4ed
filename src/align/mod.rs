//! Lag shifting, percent change and inner joins between series.
//!
//! [`shift`] and [`pct_change`] are positional: they step over the buckets a
//! series actually holds, in time order. An omitted bucket is therefore not
//! a row at all, and a series restricted to the rows shared with another
//! series (see [`restrict_to`]) shifts over exactly those shared rows.
//! [`shift_on_grid`] instead moves values along the calendar grid, so an
//! omitted bucket stays a gap.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use dreamshift::align::{inner_join, pct_change, shift};
//! use dreamshift::core::{BucketWidth, Series};
//!
//! let monday = Utc.with_ymd_and_hms(2020, 3, 9, 0, 0, 0).unwrap();
//! let weeks: Vec<_> = (0..4).map(|i| monday + Duration::weeks(i)).collect();
//! let news = Series::from_points("news", BucketWidth::Weekly,
//!     weeks.iter().copied().zip([1.0, 2.0, 4.0, 2.0])).unwrap();
//! let dreams = Series::from_points("Dreams", BucketWidth::Weekly,
//!     weeks.iter().copied().zip([0.3, 0.3, 0.6, 0.9])).unwrap();
//!
//! let next = shift(&dreams, 1).renamed("nextDreams");
//! let joined = inner_join(&pct_change(&news), &pct_change(&next)).unwrap();
//! assert_eq!(joined.len(), 2);
//! ```

use crate::core::{Bucket, Series};
use chrono::Duration;
use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

/// Delay a series by `lag` rows: row `i` takes the value of row `i - lag`.
///
/// A positive lag pairs each bucket with an earlier value, a negative lag
/// with a later one. Rows whose source falls outside the series are
/// dropped.
pub fn shift(series: &Series, lag: i64) -> Series {
    let buckets = series.buckets();
    let n = buckets.len() as i64;

    let shifted: Vec<Bucket> = (0..n)
        .filter_map(|i| {
            let source = i.checked_sub(lag)?;
            if source < 0 || source >= n {
                return None;
            }
            let from = &buckets[source as usize];
            Some(Bucket {
                start: buckets[i as usize].start,
                value: from.value,
                count: from.count,
            })
        })
        .collect();

    Series::from_sorted(series.name().to_string(), series.width(), shifted)
}

/// Delay a series by `lag` buckets of calendar time: the bucket starting at
/// `t` takes the value of the bucket starting at `t - lag * width`.
///
/// Buckets whose source is absent are absent from the result.
///
/// # Errors
/// [`AnalysisError::InvalidParameter`] when the offset leaves the
/// representable date range.
pub fn shift_on_grid(series: &Series, lag: i64) -> Result<Series> {
    let out_of_range = || {
        AnalysisError::InvalidParameter(format!(
            "shift of {} {} buckets is out of range",
            lag,
            series.width()
        ))
    };
    let offset = lag
        .checked_mul(series.width().duration().num_days())
        .and_then(Duration::try_days)
        .ok_or_else(out_of_range)?;

    let shifted = series
        .buckets()
        .iter()
        .map(|b| {
            let start = b.start.checked_add_signed(offset).ok_or_else(out_of_range)?;
            Ok(Bucket { start, ..*b })
        })
        .collect::<Result<Vec<Bucket>>>()?;

    Ok(Series::from_sorted(
        series.name().to_string(),
        series.width(),
        shifted,
    ))
}

/// Relative change from the preceding row.
///
/// The first row has no predecessor and is always missing. A row is also
/// missing when its predecessor is zero.
pub fn pct_change(series: &Series) -> Series {
    let changes: Vec<Bucket> = series
        .buckets()
        .windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (pair[0], pair[1]);
            if prev.value == 0.0 {
                return None;
            }
            let change = (cur.value - prev.value) / prev.value;
            change.is_finite().then_some(Bucket {
                start: cur.start,
                value: change,
                count: cur.count,
            })
        })
        .collect();

    Series::from_sorted(
        format!("{}_pctchange", series.name()),
        series.width(),
        changes,
    )
}

/// Keep only buckets whose start is in `timestamps`.
pub fn restrict_to(series: &Series, timestamps: &[DateTime<Utc>]) -> Series {
    let keep: BTreeSet<DateTime<Utc>> = timestamps.iter().copied().collect();
    series.filtered(|b| keep.contains(&b.start))
}

/// Rows present in both series of an inner join.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    left_name: String,
    right_name: String,
    timestamps: Vec<DateTime<Utc>>,
    left: Vec<f64>,
    right: Vec<f64>,
    dropped_left: usize,
    dropped_right: usize,
}

impl Joined {
    /// Effective sample size after dropping unmatched rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn left_name(&self) -> &str {
        &self.left_name
    }

    pub fn right_name(&self) -> &str {
        &self.right_name
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn left(&self) -> &[f64] {
        &self.left
    }

    pub fn right(&self) -> &[f64] {
        &self.right
    }

    /// Left rows with no partner on the right.
    pub fn dropped_left(&self) -> usize {
        self.dropped_left
    }

    /// Right rows with no partner on the left.
    pub fn dropped_right(&self) -> usize {
        self.dropped_right
    }
}

/// Inner join on bucket start.
///
/// # Errors
/// [`AnalysisError::EmptyJoin`] when no bucket start is shared.
pub fn inner_join(left: &Series, right: &Series) -> Result<Joined> {
    if left.width() != right.width() {
        return Err(AnalysisError::InvalidParameter(format!(
            "cannot join a {} series with a {} series",
            left.width(),
            right.width()
        )));
    }

    let mut timestamps = Vec::new();
    let mut lv = Vec::new();
    let mut rv = Vec::new();

    let (lb, rb) = (left.buckets(), right.buckets());
    let (mut i, mut j) = (0, 0);
    while i < lb.len() && j < rb.len() {
        match lb[i].start.cmp(&rb[j].start) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                timestamps.push(lb[i].start);
                lv.push(lb[i].value);
                rv.push(rb[j].value);
                i += 1;
                j += 1;
            }
        }
    }

    let joined = Joined {
        left_name: left.name().to_string(),
        right_name: right.name().to_string(),
        dropped_left: lb.len() - timestamps.len(),
        dropped_right: rb.len() - timestamps.len(),
        timestamps,
        left: lv,
        right: rv,
    };

    debug!(
        left = joined.left_name(),
        right = joined.right_name(),
        rows = joined.len(),
        dropped_left = joined.dropped_left(),
        dropped_right = joined.dropped_right(),
        "inner join"
    );

    if joined.is_empty() {
        return Err(AnalysisError::EmptyJoin {
            left: joined.left_name,
            right: joined.right_name,
        });
    }
    Ok(joined)
}
