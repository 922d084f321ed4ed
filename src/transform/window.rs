//! Rolling window statistics over bucketed series.
//!
//! Windows are laid on the bucket grid, not on the stored rows: a window
//! that covers an omitted bucket is incomplete and yields no value.

use crate::core::{Bucket, Series};
use crate::error::{AnalysisError, Result};

/// Compute a centered rolling mean.
///
/// The window around a bucket spans `window / 2` grid steps on each side
/// (for even `window` the extra step falls before the bucket). Buckets
/// whose window is not fully populated are omitted from the result.
///
/// # Arguments
/// * `series` - Input series
/// * `window` - Window size in buckets
pub fn rolling_mean(series: &Series, window: usize) -> Result<Series> {
    if window == 0 {
        return Err(AnalysisError::InvalidParameter(
            "rolling window must span at least one bucket".to_string(),
        ));
    }

    let buckets = series.buckets();
    let step = series.width().duration();
    let before = (window / 2) as i32;
    let after = (window - 1) as i32 - before;

    let mut smoothed = Vec::with_capacity(buckets.len());
    for (i, bucket) in buckets.iter().enumerate() {
        if i < before as usize || i + after as usize >= buckets.len() {
            continue;
        }
        let lo = i - before as usize;
        let hi = i + after as usize;
        // Rows are strictly increasing and grid-aligned, so the slice is
        // complete exactly when it spans the expected grid distance.
        if buckets[hi].start - buckets[lo].start != step * (window as i32 - 1) {
            continue;
        }
        let segment = &buckets[lo..=hi];
        let sum: f64 = segment.iter().map(|b| b.value).sum();
        smoothed.push(Bucket {
            start: bucket.start,
            value: sum / window as f64,
            count: segment.iter().map(|b| b.count).sum(),
        });
    }

    Ok(Series::from_sorted(
        series.name().to_string(),
        series.width(),
        smoothed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BucketWidth;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn series(points: &[(i64, f64)]) -> Series {
        Series::from_points(
            "emo_anx",
            BucketWidth::Daily,
            points.iter().map(|&(d, v)| (day(d), v)),
        )
        .unwrap()
    }

    #[test]
    fn rolling_mean_centered() {
        let s = series(&[(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0), (4, 5.0)]);
        let result = rolling_mean(&s, 3).unwrap();

        // Centered window: [1,2,3], [2,3,4], [3,4,5] at days 1, 2, 3
        assert_eq!(result.timestamps(), vec![day(1), day(2), day(3)]);
        assert_relative_eq!(result.values()[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(result.values()[1], 3.0, epsilon = 1e-10);
        assert_relative_eq!(result.values()[2], 4.0, epsilon = 1e-10);
    }

    #[test]
    fn seven_day_window_needs_three_days_each_side() {
        let points: Vec<(i64, f64)> = (0..10).map(|d| (d, d as f64)).collect();
        let result = rolling_mean(&series(&points), 7).unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(result.timestamps()[0], day(3));
        assert_relative_eq!(result.values()[0], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn gap_in_grid_breaks_the_window() {
        // Day 2 is missing, so no 3-wide window touching it is complete.
        let s = series(&[(0, 1.0), (1, 1.0), (3, 1.0), (4, 1.0), (5, 1.0)]);
        let result = rolling_mean(&s, 3).unwrap();
        assert_eq!(result.timestamps(), vec![day(4)]);
    }

    #[test]
    fn rolling_mean_window_1() {
        let s = series(&[(0, 1.0), (2, 2.0)]);
        assert_eq!(rolling_mean(&s, 1).unwrap().values(), s.values());
        assert!(rolling_mean(&s, 0).is_err());
    }
}
