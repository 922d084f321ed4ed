//! Interrupted time-series regression of daily dream anxiety.

use super::{symmetric_window, Analysis, DEFAULT_HALF_WIDTH_DAYS, DEFAULT_YEAR};
use crate::aggregate::{aggregate_points, Reduction};
use crate::align::shift_on_grid;
use crate::config::Settings;
use crate::core::{BucketWidth, Record, TextColumn};
use crate::error::Result;
use crate::filter::{CategoryFilter, PostCategory, RecordFilter};
use crate::io::load_records;
use crate::report::{Cell, Frame, Report};
use crate::stats::{LinearFit, SegmentedRegression};
use crate::transform::rolling_mean;
use serde::Serialize;
use tracing::info;

const SCORE: &str = "emo_anx";

/// Segmented regression of daily mean `emo_anx` around the declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Regress {
    pub year: i32,
    pub posts: PostCategory,
    /// Day shift applied to the daily means; -1 pairs each day with the
    /// next day's posts, which describe that night's dreams.
    pub lag: i64,
    pub half_width_days: i64,
    /// Width of the centered smoothing window, in days.
    pub smoothing_window: usize,
    /// Significance level for coefficient and band intervals.
    pub alpha: f64,
}

impl Default for Regress {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            posts: PostCategory::default(),
            lag: -1,
            half_width_days: DEFAULT_HALF_WIDTH_DAYS,
            smoothing_window: 7,
            alpha: 0.05,
        }
    }
}

#[derive(Serialize)]
struct Models<'a> {
    dependent: &'a str,
    segmented: &'a LinearFit,
    counterfactual: &'a LinearFit,
}

impl Regress {
    fn prefix(&self) -> String {
        format!("{}_{}_anxiety_regr", self.year, self.posts)
    }

    /// Build the report from the loaded post table.
    pub fn analyze(&self, posts: &[Record]) -> Result<Report> {
        let window = symmetric_window(self.year, self.half_width_days)?;

        let records = RecordFilter::new(TextColumn::Selftext)
            .with_category(CategoryFilter::for_posts(self.posts))
            .apply(posts);

        let daily = aggregate_points(
            SCORE,
            records.iter().filter_map(|r| r.score(SCORE).map(|v| (r.created, v))),
            BucketWidth::Daily,
            Reduction::Mean,
        );
        let shifted = shift_on_grid(&daily, self.lag)?;
        let smooth = rolling_mean(&shifted, self.smoothing_window)?;
        let in_window = shifted.between(window.start(), window.end());
        info!(
            records = records.len(),
            days = daily.len(),
            window_days = in_window.len(),
            "daily series"
        );

        let regression = SegmentedRegression::new().with_alpha(self.alpha);
        let fit = regression.fit(&in_window, &window)?;
        let counterfactual = regression.counterfactual(&in_window, &window)?;
        if let Some(covid) = fit.model.term("Covid") {
            info!(
                beta = covid.coefficient,
                p = covid.p_value,
                r_squared = fit.model.r_squared,
                "segmented regression"
            );
        }

        let dates = &fit.dates;
        let band = &fit.band;
        let predicted = |i: usize| {
            counterfactual
                .dates
                .iter()
                .position(|d| *d == dates[i])
                .map(|j| counterfactual.predicted[j])
        };
        let vals = Frame::new()
            .with_index(
                "date",
                dates.iter().map(|d| Cell::from(d.date_naive())).collect(),
            )?
            .with_column("obs", band.iter().map(|b| Cell::number(b.mean)).collect())?
            .with_column("obs_se", band.iter().map(|b| Cell::number(b.mean_se)).collect())?
            .with_column(
                "obs_ci_lower",
                band.iter().map(|b| Cell::number(b.ci_lower)).collect(),
            )?
            .with_column(
                "obs_ci_upper",
                band.iter().map(|b| Cell::number(b.ci_upper)).collect(),
            )?
            .with_column(
                "pred",
                (0..dates.len()).map(|i| Cell::optional(predicted(i))).collect(),
            )?
            .with_column("data", fit.observed.iter().map(|v| Cell::number(*v)).collect())?
            .with_column(
                "datasmooth",
                dates.iter().map(|d| Cell::optional(smooth.get(*d))).collect(),
            )?;

        let terms = &fit.model.terms;
        let stat = Frame::new()
            .with_index("term", terms.iter().map(|t| Cell::text(t.name.clone())).collect())?
            .with_column("coef", terms.iter().map(|t| Cell::number(t.coefficient)).collect())?
            .with_column("std_err", terms.iter().map(|t| Cell::number(t.std_error)).collect())?
            .with_column("t", terms.iter().map(|t| Cell::number(t.t_value)).collect())?
            .with_column("p_value", terms.iter().map(|t| Cell::number(t.p_value)).collect())?
            .with_column("ci_lower", terms.iter().map(|t| Cell::number(t.ci_lower)).collect())?
            .with_column("ci_upper", terms.iter().map(|t| Cell::number(t.ci_upper)).collect())?;

        let prefix = self.prefix();
        let mut report = Report::new(self.name());
        report.add_table(format!("{}-vals.tsv", prefix), &vals)?;
        report.add_table(format!("{}-stat.tsv", prefix), &stat)?;
        report.add_text(format!("{}-stat.txt", prefix), fit.model.summary(SCORE));
        report.add_json(
            format!("{}-modl.json", prefix),
            &Models {
                dependent: SCORE,
                segmented: &fit.model,
                counterfactual: &counterfactual.model,
            },
        )?;
        Ok(report)
    }
}

impl Analysis for Regress {
    fn name(&self) -> &str {
        "regress"
    }

    fn compute(&self, settings: &Settings) -> Result<Report> {
        let posts = load_records(settings.posts_table())?;
        info!(posts = posts.len(), "loaded table");
        self.analyze(&posts)
    }
}
