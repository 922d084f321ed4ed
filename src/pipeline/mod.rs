//! The study's analyses, each wired from input tables to a [`Report`].
//!
//! Every analysis is a plain parameter struct implementing [`Analysis`].
//! [`Analysis::compute`] loads its tables and builds the complete report in
//! memory; [`Analysis::run`] additionally writes it into the derivatives
//! directory. The `analyze` method on each struct takes already-loaded
//! records and is what the tests drive.
//!
//! # Example
//!
//! ```no_run
//! use dreamshift::config::Settings;
//! use dreamshift::pipeline::{Analysis, Independence};
//!
//! let settings = Settings::load(None)?;
//! let written = Independence::default().run(&settings)?;
//! println!("wrote {} files", written.len());
//! # Ok::<(), dreamshift::AnalysisError>(())
//! ```

mod correlate;
mod independence;
mod inspect;
mod regress;
mod samplesize;

pub use correlate::Correlate;
pub use independence::Independence;
pub use inspect::Inspect;
pub use regress::Regress;
pub use samplesize::SampleSize;

use crate::aggregate::Observation;
use crate::config::Settings;
use crate::core::Record;
use crate::error::{AnalysisError, Result};
use crate::report::Report;
use crate::temporal::{anchor_for_year, Window};
use chrono::Duration;
use std::path::PathBuf;

/// Default analysis year.
pub const DEFAULT_YEAR: i32 = 2020;
/// Default days on each side of the anchor.
pub const DEFAULT_HALF_WIDTH_DAYS: i64 = 30;

/// One batch analysis.
///
/// This trait is object-safe and can be used with `Box<dyn Analysis>`.
pub trait Analysis {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Load inputs and compute every artifact without writing anything.
    fn compute(&self, settings: &Settings) -> Result<Report>;

    /// Compute, then write all artifacts into the derivatives directory.
    fn run(&self, settings: &Settings) -> Result<Vec<PathBuf>> {
        let report = self.compute(settings)?;
        report.emit(settings.derivatives_dir())
    }
}

/// Type alias for boxed analysis trait objects.
pub type BoxedAnalysis = Box<dyn Analysis>;

/// `[anchor - days, anchor + days]` around March 11 of `year`.
///
/// # Errors
/// [`AnalysisError::InvalidParameter`] for a negative or out-of-range width.
pub fn symmetric_window(year: i32, half_width_days: i64) -> Result<Window> {
    if half_width_days < 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "half-width must be non-negative, got {} days",
            half_width_days
        )));
    }
    let anchor = anchor_for_year(year)?;
    let half = Duration::try_days(half_width_days).ok_or_else(|| {
        AnalysisError::InvalidParameter(format!(
            "half-width of {} days is out of range",
            half_width_days
        ))
    })?;
    Window::around(anchor, half, half)
}

/// Records created inside the window, in input order.
pub(crate) fn within<'a>(records: &'a [Record], window: &Window) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| window.contains(r.created))
        .collect()
}

/// One observation per record carrying `score`.
pub(crate) fn observations<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    group: &str,
    score: impl Fn(&Record) -> Option<f64>,
) -> Vec<Observation> {
    records
        .into_iter()
        .filter_map(|r| score(r).map(|v| Observation::new(r.created, group, v)))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::Record;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 11, 0, 0, 0).unwrap()
    }

    /// A dream post `days` after the anchor (plus `hour` hours).
    pub fn dream(id: &str, days: i64, hour: i64, emo_anx: f64) -> Record {
        Record::new(id, anchor() + Duration::days(days) + Duration::hours(hour))
            .with_flair("Medium Dream")
            .with_title(format!("title {}", id))
            .with_selftext(format!("dream text {}", id))
            .with_word_count(50.0)
            .with_score("emo_anx", emo_anx)
    }
}
