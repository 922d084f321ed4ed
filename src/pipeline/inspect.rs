//! Post-level view for reading the highest-anxiety dreams by hand.

use super::{symmetric_window, within, Analysis, DEFAULT_HALF_WIDTH_DAYS, DEFAULT_YEAR};
use crate::config::Settings;
use crate::core::{Record, TextColumn};
use crate::error::Result;
use crate::filter::{CategoryFilter, PostCategory, RecordFilter};
use crate::io::load_records;
use crate::report::{Cell, Frame, Report};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::info;

const FILE_NAME: &str = "example_view.tsv";

/// Dream posts in the window with their anxiety and title nightmare scores,
/// most anxious first.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspect {
    pub year: i32,
    pub half_width_days: i64,
}

impl Default for Inspect {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            half_width_days: DEFAULT_HALF_WIDTH_DAYS,
        }
    }
}

/// Descending, with unscored posts last.
fn by_anxiety_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Inspect {
    /// Build the report from the loaded post and title tables.
    ///
    /// Posts are matched to titles by `id`; a post whose title was filtered
    /// out keeps a missing nightmare score.
    pub fn analyze(&self, posts: &[Record], titles: &[Record]) -> Result<Report> {
        let window = symmetric_window(self.year, self.half_width_days)?;
        let dreams = CategoryFilter::for_posts(PostCategory::Dreams);
        let posts = RecordFilter::new(TextColumn::Selftext)
            .with_category(dreams.clone())
            .apply(posts);
        let titles = RecordFilter::new(TextColumn::Title)
            .with_category(dreams)
            .apply(titles);

        let mut nightmares: HashMap<&str, Option<f64>> = HashMap::with_capacity(titles.len());
        for title in &titles {
            nightmares
                .entry(title.id.as_str())
                .or_insert_with(|| title.score("nightmare"));
        }

        let mut rows = within(&posts, &window);
        rows.sort_by(|a, b| by_anxiety_desc(a.score("emo_anx"), b.score("emo_anx")));
        info!(
            posts = rows.len(),
            matched = rows
                .iter()
                .filter(|r| nightmares.contains_key(r.id.as_str()))
                .count(),
            "example view"
        );

        let text = |v: Option<&str>| v.map_or(Cell::Missing, Cell::text);
        let view = Frame::new()
            .with_column(
                "emo_anx",
                rows.iter().map(|r| Cell::optional(r.score("emo_anx"))).collect(),
            )?
            .with_column(
                "nightmare",
                rows.iter()
                    .map(|r| Cell::optional(nightmares.get(r.id.as_str()).copied().flatten()))
                    .collect(),
            )?
            .with_column("title", rows.iter().map(|r| text(r.title.as_deref())).collect())?
            .with_column(
                "selftext",
                rows.iter().map(|r| text(r.selftext.as_deref())).collect(),
            )?;

        let mut report = Report::new(self.name());
        report.add_table(FILE_NAME, &view)?;
        Ok(report)
    }
}

impl Analysis for Inspect {
    fn name(&self) -> &str {
        "inspect"
    }

    fn compute(&self, settings: &Settings) -> Result<Report> {
        let posts = load_records(settings.posts_table())?;
        let titles = load_records(settings.titles_table())?;
        info!(posts = posts.len(), titles = titles.len(), "loaded tables");
        self.analyze(&posts, &titles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{anchor, dream};

    fn title_row(id: &str, nightmare: f64) -> Record {
        Record::new(id, anchor())
            .with_flair("Medium Dream")
            .with_title(format!("title {}", id))
            .with_word_count(2.0)
            .with_score("nightmare", nightmare)
    }

    #[test]
    fn view_is_sorted_by_anxiety_with_titles_joined() {
        let mut unscored = dream("u", 3, 0, 0.0);
        unscored.scores.clear();
        let posts = vec![
            dream("low", -5, 0, 0.1),
            dream("high", 2, 0, 0.9),
            unscored,
            dream("mid", 0, 0, 0.5),
            dream("far", 45, 0, 5.0),
        ];
        let titles = vec![title_row("high", 2.5), title_row("low", 0.0)];

        let report = Inspect::default().analyze(&posts, &titles).unwrap();
        assert_eq!(report.file_names(), vec![FILE_NAME]);
        let tsv = report.contents(FILE_NAME).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "emo_anx\tnightmare\ttitle\tselftext");
        assert_eq!(lines[1], "0.9\t2.5\ttitle high\tdream text high");
        assert_eq!(lines[2], "0.5\tNA\ttitle mid\tdream text mid");
        assert_eq!(lines[3], "0.1\t0.0\ttitle low\tdream text low");
        assert_eq!(lines[4], "NA\tNA\ttitle u\tdream text u");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn wake_posts_are_left_out() {
        let mut wake = dream("w", 1, 0, 0.8);
        wake.flair = Some("Discussion".to_string());
        let report = Inspect::default()
            .analyze(&[wake, dream("d", 1, 0, 0.2)], &[])
            .unwrap();
        let tsv = report.contents(FILE_NAME).unwrap();
        assert_eq!(tsv.lines().count(), 2);
        assert!(tsv.contains("dream text d"));
    }

    #[test]
    fn empty_window_still_writes_a_header() {
        let far = dream("far", -100, 0, 0.3);
        let report = Inspect::default().analyze(&[far], &[]).unwrap();
        let tsv = report.contents(FILE_NAME).unwrap();
        assert_eq!(tsv, "emo_anx\tnightmare\ttitle\tselftext\n");
    }

    #[test]
    fn anxiety_ordering_puts_missing_last() {
        assert_eq!(by_anxiety_desc(Some(1.0), Some(2.0)), Ordering::Greater);
        assert_eq!(by_anxiety_desc(Some(1.0), None), Ordering::Less);
        assert_eq!(by_anxiety_desc(Some(f64::MAX), None), Ordering::Less);
    }
}
