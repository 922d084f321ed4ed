//! Daily post-count descriptives around the declaration.

use super::{symmetric_window, Analysis, DEFAULT_HALF_WIDTH_DAYS, DEFAULT_YEAR};
use crate::aggregate::{aggregate, Observation, Reduction};
use crate::config::Settings;
use crate::core::{BucketWidth, Record, TextColumn};
use crate::error::{AnalysisError, Result};
use crate::filter::{consolidate_flair, preprocess, DREAM_FLAIRS, OTHER_FLAIR};
use crate::io::load_records;
use crate::report::{Cell, Frame, Report};
use crate::stats::descriptive::{max, mean, min, round_to};
use crate::temporal::Period;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

const TOTAL: &str = "total";
const DREAM: &str = "dream";

/// Count, range, mean and sum of daily post counts per flair, before and
/// after the anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSize {
    pub year: i32,
    pub half_width_days: i64,
}

impl Default for SampleSize {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            half_width_days: DEFAULT_HALF_WIDTH_DAYS,
        }
    }
}

/// Daily counts keyed by column name, one entry per day with any post.
type DailyCounts = BTreeMap<DateTime<Utc>, BTreeMap<&'static str, f64>>;

fn daily_counts(records: &[Record]) -> DailyCounts {
    let obs: Vec<Observation> = records
        .iter()
        .map(|r| Observation::new(r.created, consolidate_flair(r.flair.as_deref()), 1.0))
        .collect();
    let series = aggregate(&obs, BucketWidth::Daily, Reduction::Count);
    let days: BTreeSet<DateTime<Utc>> = series.values().flat_map(|s| s.timestamps()).collect();

    let flairs: Vec<&'static str> = DREAM_FLAIRS.iter().copied().chain([OTHER_FLAIR]).collect();
    days.into_iter()
        .map(|day| {
            let mut row: BTreeMap<&'static str, f64> = flairs
                .iter()
                .map(|f| (*f, series.get(*f).and_then(|s| s.get(day)).unwrap_or(0.0)))
                .collect();
            let total: f64 = row.values().sum();
            let dream: f64 = DREAM_FLAIRS.iter().map(|f| row[f]).sum();
            row.insert(TOTAL, total);
            row.insert(DREAM, dream);
            (day, row)
        })
        .collect()
}

impl SampleSize {
    fn file_name(&self) -> String {
        format!("{}_samplesize-desc.tsv", self.year)
    }

    /// Build the report from the raw scrape.
    pub fn analyze(&self, raw_posts: &[Record]) -> Result<Report> {
        let window = symmetric_window(self.year, self.half_width_days)?;
        let records = preprocess(raw_posts, TextColumn::Selftext);
        let daily = daily_counts(&records);

        let mut groups: BTreeMap<Period, Vec<&BTreeMap<&'static str, f64>>> = BTreeMap::new();
        for (day, row) in daily.iter().filter(|(day, _)| window.contains(**day)) {
            groups.entry(window.classify(*day)).or_default().push(row);
        }
        if groups.is_empty() {
            return Err(AnalysisError::InsufficientData { needed: 1, got: 0 });
        }
        info!(
            posts = records.len(),
            pre_days = groups.get(&Period::Pre).map_or(0, Vec::len),
            post_days = groups.get(&Period::Post).map_or(0, Vec::len),
            "daily post counts"
        );

        let mut window_col = Vec::new();
        let mut flair_col = Vec::new();
        let mut stats: [Vec<Cell>; 5] = Default::default();
        // Pre before Post, then columns in descending byte order.
        for (period, rows) in &groups {
            let mut columns: Vec<&'static str> = rows[0].keys().copied().collect();
            columns.sort_unstable_by(|a, b| b.cmp(a));
            for column in columns {
                let values: Vec<f64> = rows.iter().map(|r| r[column]).collect();
                window_col.push(Cell::text(period.to_string()));
                flair_col.push(Cell::text(column));
                stats[0].push(Cell::from(values.len()));
                stats[1].push(Cell::number(round_to(min(&values), 2)));
                stats[2].push(Cell::number(round_to(max(&values), 2)));
                stats[3].push(Cell::number(round_to(mean(&values), 2)));
                stats[4].push(Cell::number(round_to(values.iter().sum(), 2)));
            }
        }

        let [count, lo, hi, avg, sum] = stats;
        let desc = Frame::new()
            .with_index("Window", window_col)?
            .with_index("Dream flair", flair_col)?
            .with_column("count", count)?
            .with_column("min", lo)?
            .with_column("max", hi)?
            .with_column("mean", avg)?
            .with_column("sum", sum)?;

        let mut report = Report::new(self.name());
        report.add_table(self.file_name(), &desc)?;
        Ok(report)
    }
}

impl Analysis for SampleSize {
    fn name(&self) -> &str {
        "samplesize"
    }

    fn compute(&self, settings: &Settings) -> Result<Report> {
        let raw = load_records(settings.raw_posts_table())?;
        info!(posts = raw.len(), "loaded table");
        self.analyze(&raw)
    }
}
