//! Calendar-aligned bucketing of point observations.
//!
//! Observations are grouped by key, floored onto a daily or weekly grid and
//! reduced per bucket. Intervals without a contributing observation produce
//! no bucket at all.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use dreamshift::aggregate::{aggregate, Observation, Reduction};
//! use dreamshift::core::BucketWidth;
//!
//! let t = Utc.with_ymd_and_hms(2020, 3, 11, 8, 0, 0).unwrap();
//! let obs = vec![
//!     Observation::new(t, "Dreams", 0.2),
//!     Observation::new(t, "Dreams", 0.4),
//! ];
//! let series = aggregate(&obs, BucketWidth::Daily, Reduction::Mean);
//! assert_eq!(series["Dreams"].len(), 1);
//! ```

use crate::core::{Bucket, BucketWidth, Series};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-bucket reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    /// Arithmetic mean of the values.
    #[default]
    Mean,
    /// Number of contributing observations.
    Count,
    /// Share of values strictly greater than zero.
    Proportion,
}

impl Reduction {
    fn reduce(self, values: &[f64]) -> f64 {
        let n = values.len() as f64;
        match self {
            Reduction::Mean => values.iter().sum::<f64>() / n,
            Reduction::Count => n,
            Reduction::Proportion => values.iter().filter(|v| **v > 0.0).count() as f64 / n,
        }
    }
}

/// One `(timestamp, group, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub group: String,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, group: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp,
            group: group.into(),
            value,
        }
    }
}

/// Bucket observations into one series per group.
///
/// Non-finite values do not contribute. The result is independent of the
/// order of `observations`.
pub fn aggregate(
    observations: &[Observation],
    width: BucketWidth,
    reduction: Reduction,
) -> BTreeMap<String, Series> {
    let mut by_group: BTreeMap<&str, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
    for obs in observations.iter().filter(|o| o.value.is_finite()) {
        by_group
            .entry(obs.group.as_str())
            .or_default()
            .push((obs.timestamp, obs.value));
    }

    by_group
        .into_iter()
        .map(|(group, points)| {
            let series = reduce_points(group.to_string(), points, width, reduction);
            debug!(
                group,
                buckets = series.len(),
                width = %width,
                "aggregated group"
            );
            (group.to_string(), series)
        })
        .collect()
}

/// Bucket a single group of `(timestamp, value)` points.
pub fn aggregate_points(
    name: impl Into<String>,
    points: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    width: BucketWidth,
    reduction: Reduction,
) -> Series {
    let points: Vec<_> = points.into_iter().filter(|(_, v)| v.is_finite()).collect();
    reduce_points(name.into(), points, width, reduction)
}

fn reduce_points(
    name: String,
    mut points: Vec<(DateTime<Utc>, f64)>,
    width: BucketWidth,
    reduction: Reduction,
) -> Series {
    // Sorting on value as well as time keeps floating-point sums stable
    // under any permutation of the input.
    points.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut buckets = Vec::new();
    let mut current: Option<DateTime<Utc>> = None;
    let mut values: Vec<f64> = Vec::new();

    for (timestamp, value) in points {
        let start = width.floor(timestamp);
        if current != Some(start) {
            if let Some(open) = current {
                buckets.push(close_bucket(open, &values, reduction));
                values.clear();
            }
            current = Some(start);
        }
        values.push(value);
    }
    if let Some(open) = current {
        buckets.push(close_bucket(open, &values, reduction));
    }

    Series::from_sorted(name, width, buckets)
}

fn close_bucket(start: DateTime<Utc>, values: &[f64], reduction: Reduction) -> Bucket {
    Bucket {
        start,
        value: reduction.reduce(values),
        count: values.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn daily_mean_over_two_groups_of_three_days() {
        let values = [1.0, 2.0, 3.0, 1.0, 2.0, 3.0];
        let obs: Vec<Observation> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let group = if i < 3 { "a" } else { "b" };
                Observation::new(at(2, 1 + (i % 3) as u32), group, v)
            })
            .collect();

        let series = aggregate(&obs, BucketWidth::Daily, Reduction::Mean);
        assert_eq!(series.len(), 2);
        for s in series.values() {
            assert_eq!(s.len(), 1);
            assert_relative_eq!(s.values()[0], 2.0, epsilon = 1e-12);
            assert_eq!(s.buckets()[0].count, 3);
        }
    }

    #[test]
    fn empty_intervals_are_omitted() {
        let obs = vec![
            Observation::new(at(1, 5), "g", 1.0),
            Observation::new(at(4, 5), "g", 4.0),
        ];
        let series = aggregate(&obs, BucketWidth::Daily, Reduction::Mean);
        let g = &series["g"];

        assert_eq!(g.len(), 2);
        assert_eq!(g.timestamps(), vec![at(1, 0), at(4, 0)]);
    }

    #[test]
    fn weekly_buckets_close_on_sunday() {
        // Sunday 2020-03-15 23:00 and Monday 2020-03-16 01:00 straddle a boundary.
        let sunday = Utc.with_ymd_and_hms(2020, 3, 15, 23, 0, 0).unwrap();
        let obs = vec![
            Observation::new(sunday, "g", 1.0),
            Observation::new(sunday + Duration::hours(2), "g", 3.0),
        ];
        let series = aggregate(&obs, BucketWidth::Weekly, Reduction::Mean);
        assert_eq!(series["g"].len(), 2);
    }

    #[test]
    fn count_and_proportion_reductions() {
        let obs = vec![
            Observation::new(at(1, 1), "g", 0.0),
            Observation::new(at(1, 2), "g", 2.0),
            Observation::new(at(1, 3), "g", 5.0),
            Observation::new(at(1, 4), "g", 0.0),
        ];

        let counts = aggregate(&obs, BucketWidth::Daily, Reduction::Count);
        assert_relative_eq!(counts["g"].values()[0], 4.0);

        let props = aggregate(&obs, BucketWidth::Daily, Reduction::Proportion);
        assert_relative_eq!(props["g"].values()[0], 0.5);
    }

    #[test]
    fn non_finite_values_do_not_contribute() {
        let obs = vec![
            Observation::new(at(1, 1), "g", f64::NAN),
            Observation::new(at(2, 1), "g", 2.0),
        ];
        let series = aggregate(&obs, BucketWidth::Daily, Reduction::Mean);
        assert_eq!(series["g"].len(), 1);
        assert_eq!(series["g"].timestamps(), vec![at(2, 0)]);
    }
}
