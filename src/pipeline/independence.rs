//! Nightmare frequency before and after the declaration (chi-square).

use super::{symmetric_window, within, Analysis, DEFAULT_HALF_WIDTH_DAYS, DEFAULT_YEAR};
use crate::config::Settings;
use crate::core::{Record, TextColumn};
use crate::error::Result;
use crate::filter::{CategoryFilter, PostCategory, RecordFilter};
use crate::io::load_records;
use crate::report::{Cell, Frame, Report};
use crate::stats::{bootstrap_mean_ci, chi2_independence, BootstrapConfig, ContingencyTable};
use tracing::info;

const SCORE: &str = "nightmare";

/// Chi-square test of nightmare titles against the pre/post window label,
/// with bootstrap intervals on the nightmare percentage of each group.
#[derive(Debug, Clone, PartialEq)]
pub struct Independence {
    pub year: i32,
    pub posts: PostCategory,
    pub half_width_days: i64,
    pub bootstrap: BootstrapConfig,
}

impl Default for Independence {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            posts: PostCategory::default(),
            half_width_days: DEFAULT_HALF_WIDTH_DAYS,
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl Independence {
    fn prefix(&self) -> String {
        format!("{}_{}_nightmares_chi2", self.year, self.posts)
    }

    /// Build the report from the loaded title table.
    ///
    /// A title without a nightmare score counts as no nightmare. The anchor
    /// day itself belongs to the post group.
    pub fn analyze(&self, titles: &[Record]) -> Result<Report> {
        let window = symmetric_window(self.year, self.half_width_days)?;
        let records = RecordFilter::new(TextColumn::Title)
            .with_category(CategoryFilter::for_posts(self.posts))
            .apply(titles);
        let in_window = within(&records, &window);

        let labels: Vec<(bool, bool)> = in_window
            .iter()
            .map(|r| {
                let nightmare = r.binary_score(SCORE).unwrap_or(0.0) > 0.0;
                (window.classify(r.created).is_post(), nightmare)
            })
            .collect();
        let table = ContingencyTable::from_labels(labels.iter().copied());
        let result = chi2_independence(&table)?;
        info!(
            titles = in_window.len(),
            chi2 = result.pearson().chi2,
            p = result.pearson().p_value,
            "chi-square independence"
        );

        let mut intervals = Vec::with_capacity(2);
        for group in [false, true] {
            let flags: Vec<f64> = labels
                .iter()
                .filter(|(post, _)| *post == group)
                .map(|(_, nightmare)| if *nightmare { 1.0 } else { 0.0 })
                .collect();
            intervals.push(bootstrap_mean_ci(&flags, &self.bootstrap)?);
        }

        let observed = table.counts;
        let expected = result.expected;
        let totals = table.row_totals();
        let rows = [0, 1];
        let desc = Frame::new()
            .with_index("PostCovid", vec![Cell::Bool(false), Cell::Bool(true)])?
            .with_column("0_exp", rows.iter().map(|&r| Cell::number(expected[r][0])).collect())?
            .with_column("1_exp", rows.iter().map(|&r| Cell::number(expected[r][1])).collect())?
            .with_column("0_obs", rows.iter().map(|&r| Cell::Integer(observed[r][0] as i64)).collect())?
            .with_column("1_obs", rows.iter().map(|&r| Cell::Integer(observed[r][1] as i64)).collect())?
            .with_column("total", rows.iter().map(|&r| Cell::Integer(totals[r] as i64)).collect())?
            .with_column(
                "nm_pct",
                rows.iter()
                    .map(|&r| Cell::number(100.0 * observed[r][1] as f64 / totals[r] as f64))
                    .collect(),
            )?
            .with_column(
                "nm_ci_lo",
                intervals.iter().map(|ci| Cell::number(100.0 * ci.lower)).collect(),
            )?
            .with_column(
                "nm_ci_hi",
                intervals.iter().map(|ci| Cell::number(100.0 * ci.upper)).collect(),
            )?;

        let tests = &result.tests;
        let n = table.total() as i64;
        let stat = Frame::new()
            .with_column("test", tests.iter().map(|t| Cell::text(t.test)).collect())?
            .with_column("lambda", tests.iter().map(|t| Cell::number(t.lambda)).collect())?
            .with_column("chi2", tests.iter().map(|t| Cell::number(t.chi2)).collect())?
            .with_column("dof", tests.iter().map(|t| Cell::from(t.dof)).collect())?
            .with_column("pval", tests.iter().map(|t| Cell::number(t.p_value)).collect())?
            .with_column("cramer", tests.iter().map(|t| Cell::number(t.cramer_v)).collect())?
            .with_column("n", tests.iter().map(|_| Cell::Integer(n)).collect())?;

        let prefix = self.prefix();
        let mut report = Report::new(self.name());
        report.add_table(format!("{}-desc.tsv", prefix), &desc)?;
        report.add_table(format!("{}-stat.tsv", prefix), &stat)?;
        Ok(report)
    }
}

impl Analysis for Independence {
    fn name(&self) -> &str {
        "independence"
    }

    fn compute(&self, settings: &Settings) -> Result<Report> {
        let titles = load_records(settings.titles_table())?;
        info!(titles = titles.len(), "loaded table");
        self.analyze(&titles)
    }
}
