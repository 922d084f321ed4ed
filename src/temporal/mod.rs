//! Timestamp normalization and pre/post window classification.
//!
//! All instants are UTC. A [`Window`] is a closed interval around an anchor
//! date; [`Window::classify`] splits it into a pre-anchor and a post-anchor
//! period.
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use dreamshift::temporal::{anchor_for_year, Period, Window};
//!
//! let anchor = anchor_for_year(2020)?;
//! let window = Window::around(anchor, Duration::days(30), Duration::days(30))?;
//!
//! assert_eq!(window.classify(anchor), Period::Post);
//! assert_eq!(window.classify(anchor - Duration::nanoseconds(1)), Period::Pre);
//! # Ok::<(), dreamshift::AnalysisError>(())
//! ```

use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::fmt;

/// Month and day of the pandemic declaration used as the default anchor.
pub const ANCHOR_MONTH: u32 = 3;
pub const ANCHOR_DAY: u32 = 11;

/// Convert epoch seconds to a UTC instant.
pub fn epoch_to_utc(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AnalysisError::MalformedInput(format!("epoch {} out of range", secs)))
}

/// Parse an epoch-seconds cell that may be written as an integer or a float.
pub fn parse_epoch(text: &str) -> Result<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(secs) = trimmed.parse::<i64>() {
        return epoch_to_utc(secs);
    }

    let secs: f64 = trimmed.parse().map_err(|_| {
        AnalysisError::MalformedInput(format!("unparseable timestamp '{}'", trimmed))
    })?;
    if !secs.is_finite() {
        return Err(AnalysisError::MalformedInput(format!(
            "unparseable timestamp '{}'",
            trimmed
        )));
    }

    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
        .single()
        .ok_or_else(|| AnalysisError::MalformedInput(format!("epoch {} out of range", trimmed)))
}

/// Midnight UTC of a calendar date.
pub fn midnight(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            AnalysisError::InvalidParameter(format!(
                "invalid date {:04}-{:02}-{:02}",
                year, month, day
            ))
        })
}

/// Declaration anchor (March 11, 00:00 UTC) for a given year.
pub fn anchor_for_year(year: i32) -> Result<DateTime<Utc>> {
    midnight(year, ANCHOR_MONTH, ANCHOR_DAY)
}

/// Side of the anchor a timestamp falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Pre,
    Post,
}

impl Period {
    pub fn is_post(self) -> bool {
        matches!(self, Period::Post)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Pre => write!(f, "Pre"),
            Period::Post => write!(f, "Post"),
        }
    }
}

/// Which period owns the anchor instant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorBoundary {
    /// `t >= anchor` is post.
    #[default]
    PostInclusive,
    /// `t > anchor` is post.
    PostExclusive,
}

/// Closed analysis interval `[start, end]` with an anchor inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    anchor: DateTime<Utc>,
    end: DateTime<Utc>,
    boundary: AnchorBoundary,
}

impl Window {
    /// `[anchor - before, anchor + after]`.
    ///
    /// # Errors
    /// [`AnalysisError::InvalidParameter`] for a negative span or bounds
    /// outside the representable date range.
    pub fn around(anchor: DateTime<Utc>, before: Duration, after: Duration) -> Result<Self> {
        if before < Duration::zero() || after < Duration::zero() {
            return Err(AnalysisError::InvalidParameter(format!(
                "window spans must be non-negative (got {} before, {} after)",
                before, after
            )));
        }
        let out_of_range =
            || AnalysisError::InvalidParameter(format!("window around {} is out of range", anchor));
        Ok(Self {
            start: anchor.checked_sub_signed(before).ok_or_else(out_of_range)?,
            anchor,
            end: anchor.checked_add_signed(after).ok_or_else(out_of_range)?,
            boundary: AnchorBoundary::default(),
        })
    }

    /// Explicit bounds; the anchor need not be inside them.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>, anchor: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(AnalysisError::InvalidParameter(format!(
                "window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self {
            start,
            anchor,
            end,
            boundary: AnchorBoundary::default(),
        })
    }

    pub fn with_boundary(mut self, boundary: AnchorBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn boundary(&self) -> AnchorBoundary {
        self.boundary
    }

    /// Closed-interval membership.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    /// Pre/post classification relative to the anchor.
    pub fn classify(&self, t: DateTime<Utc>) -> Period {
        let post = match self.boundary {
            AnchorBoundary::PostInclusive => t >= self.anchor,
            AnchorBoundary::PostExclusive => t > self.anchor,
        };
        if post {
            Period::Post
        } else {
            Period::Pre
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_conversion_is_utc() {
        let t = epoch_to_utc(1_583_884_800).unwrap();
        assert_eq!(t, anchor_for_year(2020).unwrap());
    }

    #[test]
    fn parse_epoch_accepts_float_text() {
        let t = parse_epoch("1583884800.0").unwrap();
        assert_eq!(t, anchor_for_year(2020).unwrap());
        let t = parse_epoch(" 1583884800 ").unwrap();
        assert_eq!(t, anchor_for_year(2020).unwrap());
    }

    #[test]
    fn parse_epoch_rejects_garbage() {
        assert!(matches!(
            parse_epoch("yesterday"),
            Err(AnalysisError::MalformedInput(_))
        ));
        assert!(parse_epoch("inf").is_err());
    }

    #[test]
    fn anchor_instant_is_post_by_default() {
        let anchor = anchor_for_year(2020).unwrap();
        let window = Window::around(anchor, Duration::days(30), Duration::days(30)).unwrap();

        assert_eq!(window.classify(anchor), Period::Post);
        assert_eq!(window.classify(anchor - Duration::nanoseconds(1)), Period::Pre);
    }

    #[test]
    fn exclusive_boundary_moves_anchor_to_pre() {
        let anchor = anchor_for_year(2020).unwrap();
        let window = Window::around(anchor, Duration::days(30), Duration::days(30))
            .unwrap()
            .with_boundary(AnchorBoundary::PostExclusive);

        assert_eq!(window.classify(anchor), Period::Pre);
        assert_eq!(window.classify(anchor + Duration::nanoseconds(1)), Period::Post);
    }

    #[test]
    fn window_is_closed_on_both_ends() {
        let anchor = anchor_for_year(2019).unwrap();
        let window = Window::around(anchor, Duration::days(30), Duration::days(30)).unwrap();

        assert!(window.contains(window.start()));
        assert!(window.contains(window.end()));
        assert!(!window.contains(window.end() + Duration::nanoseconds(1)));
        assert!(!window.contains(window.start() - Duration::nanoseconds(1)));
    }

    #[test]
    fn negative_or_huge_spans_are_rejected() {
        let anchor = anchor_for_year(2020).unwrap();
        let day = Duration::days(1);
        assert!(Window::around(anchor, -day, day).is_err());
        assert!(Window::around(anchor, day, -day).is_err());
        assert!(matches!(
            Window::around(anchor, Duration::days(1_000_000_000), day),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(Window::around(anchor, Duration::zero(), Duration::zero()).is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let anchor = anchor_for_year(2020).unwrap();
        assert!(Window::between(anchor, anchor - Duration::days(1), anchor).is_err());
    }
}
