//! News coverage vs. next-week dream anxiety (weekly rank correlation).

use super::{observations, Analysis, DEFAULT_YEAR};
use crate::aggregate::{aggregate, Reduction};
use crate::align::{inner_join, pct_change, restrict_to, shift};
use crate::config::Settings;
use crate::core::{BucketWidth, Record, Series, TextColumn};
use crate::error::{AnalysisError, Result};
use crate::filter::{CategoryFilter, PostCategory, RecordFilter};
use crate::io::load_records;
use crate::report::{Cell, Frame, Report};
use crate::stats::spearman;
use crate::temporal::{midnight, Window};
use tracing::info;

const DREAMS: &str = "Dreams";
const NEWS: &str = "news";
const NEXT_DREAMS: &str = "nextDreams";

/// Spearman correlation between week-over-week change in COVID headline
/// share and in (lagged) dream anxiety.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlate {
    pub year: i32,
    pub posts: PostCategory,
    /// Buckets by which dream anxiety trails the news.
    pub lag: i64,
    pub bucket: BucketWidth,
}

impl Default for Correlate {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            posts: PostCategory::default(),
            lag: 1,
            bucket: BucketWidth::Weekly,
        }
    }
}

impl Correlate {
    fn prefix(&self) -> String {
        format!("{}_{}_anxiety_corr", self.year, self.posts)
    }

    /// March 12 through September 1, both at midnight.
    ///
    /// The window opens the day after the declaration; before it, news
    /// coverage is near zero and percent changes explode.
    pub fn window(&self) -> Result<Window> {
        Window::between(
            midnight(self.year, 3, 12)?,
            midnight(self.year, 9, 1)?,
            midnight(self.year, 3, 11)?,
        )
    }

    /// Build the report from loaded post and headline tables.
    pub fn analyze(&self, dream_posts: &[Record], news_titles: &[Record]) -> Result<Report> {
        let window = self.window()?;

        let dreams = RecordFilter::new(TextColumn::Selftext)
            .with_category(CategoryFilter::for_posts(self.posts))
            .apply(dream_posts);
        let news = RecordFilter::new(TextColumn::Title).apply(news_titles);

        let dreams: Vec<&Record> = dreams.iter().filter(|r| window.contains(r.created)).collect();
        let news: Vec<&Record> = news.iter().filter(|r| window.contains(r.created)).collect();
        info!(dreams = dreams.len(), news = news.len(), "records in window");

        let mut obs = observations(dreams.iter().copied(), DREAMS, |r| r.score("emo_anx"));
        obs.extend(observations(news.iter().copied(), NEWS, |r| r.binary_score("covid")));
        let mut series = aggregate(&obs, self.bucket, Reduction::Mean);
        let (Some(news_weekly), Some(dreams_weekly)) = (series.remove(NEWS), series.remove(DREAMS))
        else {
            return Err(AnalysisError::EmptyJoin {
                left: NEWS.to_string(),
                right: DREAMS.to_string(),
            });
        };

        // Keep only buckets where both sources posted.
        let mutual = inner_join(&news_weekly, &dreams_weekly)?;
        let news_weekly = restrict_to(&news_weekly, mutual.timestamps());
        let dreams_weekly = restrict_to(&dreams_weekly, mutual.timestamps());
        let next_dreams = shift(&dreams_weekly, self.lag).renamed(NEXT_DREAMS);

        let news_pct = pct_change(&news_weekly);
        let dreams_pct = pct_change(&dreams_weekly);
        let next_pct = pct_change(&next_dreams);

        let joined = inner_join(&news_pct, &next_pct)?;
        let result = spearman(joined.left(), joined.right())?;
        info!(
            weeks = mutual.len(),
            n = result.n,
            r = result.r,
            p = result.p_value,
            "spearman correlation"
        );

        let rows = mutual.timestamps();
        let cells = |s: &Series| -> Vec<Cell> {
            rows.iter().map(|t| Cell::optional(s.get(*t))).collect()
        };
        let vals = Frame::new()
            .with_index(
                "week",
                rows.iter().map(|t| Cell::from(self.bucket.label(*t))).collect(),
            )?
            .with_column(NEWS, cells(&news_weekly))?
            .with_column(DREAMS, cells(&dreams_weekly))?
            .with_column(NEXT_DREAMS, cells(&next_dreams))?
            .with_column(news_pct.name(), cells(&news_pct))?
            .with_column(dreams_pct.name(), cells(&dreams_pct))?
            .with_column(next_pct.name(), cells(&next_pct))?
            .with_column("week_number", (0..rows.len()).map(Cell::from).collect())?;

        let stat = Frame::new()
            .with_index("method", vec![Cell::text(result.method)])?
            .with_column("n", vec![Cell::from(result.n)])?
            .with_column("r", vec![Cell::number(result.r)])?
            .with_column("CI95%_lower", vec![Cell::number(result.ci_lower)])?
            .with_column("CI95%_upper", vec![Cell::number(result.ci_upper)])?
            .with_column("p-val", vec![Cell::number(result.p_value)])?
            .with_column("n_rdreams", vec![Cell::from(dreams.len())])?
            .with_column("n_news", vec![Cell::from(news.len())])?;

        let prefix = self.prefix();
        let mut report = Report::new(self.name());
        report.add_table(format!("{}-vals.tsv", prefix), &vals)?;
        report.add_table(format!("{}-stat.tsv", prefix), &stat)?;
        Ok(report)
    }
}

impl Analysis for Correlate {
    fn name(&self) -> &str {
        "correlate"
    }

    fn compute(&self, settings: &Settings) -> Result<Report> {
        let posts = load_records(settings.posts_table())?;
        let news = load_records(settings.news_table())?;
        info!(posts = posts.len(), news = news.len(), "loaded tables");
        self.analyze(&posts, &news)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{anchor, dream};
    use chrono::Duration;

    fn headline(id: &str, days: i64, covid: f64) -> Record {
        Record::new(id, anchor() + Duration::days(days) + Duration::hours(6))
            .with_title(format!("headline {}", id))
            .with_word_count(8.0)
            .with_score("covid", covid)
    }

    /// Ten weeks of posts from the first Monday after the anchor.
    fn tables() -> (Vec<Record>, Vec<Record>) {
        // 2020-03-16 is a Monday, five days after the anchor.
        let news_share = [0.2, 0.4, 0.6, 0.5, 0.8, 0.3, 0.6, 0.9, 0.45, 0.7];
        let anxiety = [0.30, 0.32, 0.36, 0.42, 0.39, 0.50, 0.31, 0.40, 0.55, 0.41];

        let mut dreams = Vec::new();
        let mut news = Vec::new();
        for (week, (&share, &anx)) in news_share.iter().zip(&anxiety).enumerate() {
            let day = 5 + 7 * week as i64;
            for i in 0..10 {
                let covid = if (i as f64) < share * 10.0 { 2.0 } else { 0.0 };
                news.push(headline(&format!("n{}-{}", week, i), day + i % 7, covid));
            }
            dreams.push(dream(&format!("d{}a", week), day, 1, anx - 0.05));
            dreams.push(dream(&format!("d{}b", week), day + 2, 1, anx + 0.05));
        }
        (dreams, news)
    }

    #[test]
    fn correlate_produces_vals_and_stat() {
        let (dreams, news) = tables();
        let report = Correlate::default().analyze(&dreams, &news).unwrap();

        assert_eq!(
            report.file_names(),
            vec![
                "2020_dreams_anxiety_corr-vals.tsv",
                "2020_dreams_anxiety_corr-stat.tsv"
            ]
        );

        let vals = report.contents("2020_dreams_anxiety_corr-vals.tsv").unwrap();
        let mut lines = vals.lines();
        assert_eq!(
            lines.next().unwrap(),
            "week\tnews\tDreams\tnextDreams\tnews_pctchange\tDreams_pctchange\tnextDreams_pctchange\tweek_number"
        );
        // First week is labelled by its closing Sunday; lag and pct are missing.
        let first: Vec<&str> = lines.next().unwrap().split('\t').collect();
        assert_eq!(first[0], "2020-03-22");
        assert_eq!(first[3], "NA");
        assert_eq!(first[4], "NA");
        assert_eq!(vals.lines().count(), 11);

        let stat = report.contents("2020_dreams_anxiety_corr-stat.tsv").unwrap();
        let row: Vec<&str> = stat.lines().nth(1).unwrap().split('\t').collect();
        assert_eq!(row[0], "spearman");
        // 10 weeks, minus one for the lag and one for the first change.
        assert_eq!(row[1], "8");
        assert_eq!(row[6], "20");
        assert_eq!(row[7], "100");
    }

    #[test]
    fn records_outside_window_are_ignored() {
        let (mut dreams, news) = tables();
        dreams.push(dream("early", -20, 0, 9.0));
        let baseline = Correlate::default().analyze(&tables().0, &news).unwrap();
        let report = Correlate::default().analyze(&dreams, &news).unwrap();
        assert_eq!(
            report.contents("2020_dreams_anxiety_corr-vals.tsv"),
            baseline.contents("2020_dreams_anxiety_corr-vals.tsv")
        );
    }

    #[test]
    fn no_overlap_is_an_empty_join() {
        let (dreams, _) = tables();
        let err = Correlate::default().analyze(&dreams, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyJoin { .. }));
    }

    #[test]
    fn too_few_weeks_is_insufficient() {
        let (dreams, news) = tables();
        let short: Vec<Record> = dreams
            .into_iter()
            .filter(|r| r.created < anchor() + Duration::days(5 + 7 * 4))
            .collect();
        let err = Correlate::default().analyze(&short, &news).unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
