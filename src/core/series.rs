//! Bucketed series on a calendar-aligned grid.

use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width of an aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketWidth {
    /// Midnight-to-midnight UTC.
    #[default]
    Daily,
    /// Monday 00:00 UTC to the following Monday; weeks close on Sunday.
    Weekly,
}

impl BucketWidth {
    pub fn duration(self) -> Duration {
        match self {
            BucketWidth::Daily => Duration::days(1),
            BucketWidth::Weekly => Duration::days(7),
        }
    }

    /// Start of the bucket containing `t`.
    pub fn floor(self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = t.date_naive();
        let date = match self {
            BucketWidth::Daily => date,
            BucketWidth::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
        };
        date.and_time(NaiveTime::MIN).and_utc()
    }

    /// True if `t` is a bucket boundary of this width.
    pub fn is_aligned(self, t: DateTime<Utc>) -> bool {
        self.floor(t) == t
    }

    /// Calendar date a bucket is reported under.
    ///
    /// Daily buckets report their own day; weekly buckets report the Sunday
    /// that closes them.
    pub fn label(self, start: DateTime<Utc>) -> NaiveDate {
        match self {
            BucketWidth::Daily => start.date_naive(),
            BucketWidth::Weekly => (start + Duration::days(6)).date_naive(),
        }
    }

    /// Number of whole buckets between two aligned starts.
    pub fn steps_between(self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        (to - from).num_days() / self.duration().num_days()
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketWidth::Daily => write!(f, "daily"),
            BucketWidth::Weekly => write!(f, "weekly"),
        }
    }
}

impl FromStr for BucketWidth {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "d" | "day" => Ok(BucketWidth::Daily),
            "weekly" | "w" | "week" => Ok(BucketWidth::Weekly),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown bucket width '{}' (expected daily or weekly)",
                other
            ))),
        }
    }
}

/// One populated interval `[start, start + width)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub value: f64,
    /// Number of observations reduced into `value`.
    pub count: usize,
}

/// Ordered buckets of one group on a single grid.
///
/// Empty intervals are simply absent; a missing bucket is never stored as
/// zero or NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    width: BucketWidth,
    buckets: Vec<Bucket>,
}

impl Series {
    /// Create a series, validating grid alignment and ordering.
    pub fn new(name: impl Into<String>, width: BucketWidth, buckets: Vec<Bucket>) -> Result<Self> {
        for bucket in &buckets {
            if !width.is_aligned(bucket.start) {
                return Err(AnalysisError::InvalidParameter(format!(
                    "bucket start {} is not aligned to a {} grid",
                    bucket.start, width
                )));
            }
            if !bucket.value.is_finite() {
                return Err(AnalysisError::InvalidParameter(format!(
                    "bucket at {} holds a non-finite value",
                    bucket.start
                )));
            }
        }
        for pair in buckets.windows(2) {
            if pair[1].start <= pair[0].start {
                return Err(AnalysisError::InvalidParameter(
                    "bucket starts must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            name: name.into(),
            width,
            buckets,
        })
    }

    /// Build a series from `(start, value)` pairs, each counted once.
    pub fn from_points(
        name: impl Into<String>,
        width: BucketWidth,
        points: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Result<Self> {
        let buckets = points
            .into_iter()
            .map(|(start, value)| Bucket {
                start,
                value,
                count: 1,
            })
            .collect();
        Self::new(name, width, buckets)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> BucketWidth {
        self.width
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.buckets.iter().map(|b| b.start).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.value).collect()
    }

    /// Value of the bucket starting at `start`.
    pub fn get(&self, start: DateTime<Utc>) -> Option<f64> {
        self.buckets
            .binary_search_by_key(&start, |b| b.start)
            .ok()
            .map(|i| self.buckets[i].value)
    }

    /// Same buckets under a new name.
    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Buckets whose start lies in the closed range `[from, to]`.
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Series {
        Series {
            name: self.name.clone(),
            width: self.width,
            buckets: self
                .buckets
                .iter()
                .filter(|b| b.start >= from && b.start <= to)
                .copied()
                .collect(),
        }
    }

    /// Keep only buckets accepted by `keep`.
    pub(crate) fn filtered(&self, keep: impl Fn(&Bucket) -> bool) -> Series {
        Series {
            name: self.name.clone(),
            width: self.width,
            buckets: self.buckets.iter().filter(|b| keep(b)).copied().collect(),
        }
    }

    /// Construct without re-validating; callers guarantee the invariants.
    pub(crate) fn from_sorted(name: String, width: BucketWidth, buckets: Vec<Bucket>) -> Series {
        Series {
            name,
            width,
            buckets,
        }
    }
}
