//! A single scraped post (or post title) with its linguistic scores.

use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Which text field carries the content of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextColumn {
    /// Post body.
    #[default]
    Selftext,
    /// Post title.
    Title,
}

impl TextColumn {
    /// Column header used in the input tables.
    pub fn column_name(self) -> &'static str {
        match self {
            TextColumn::Selftext => "selftext",
            TextColumn::Title => "title",
        }
    }
}

impl FromStr for TextColumn {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "selftext" => Ok(TextColumn::Selftext),
            "title" => Ok(TextColumn::Title),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown text column '{}' (expected selftext or title)",
                other
            ))),
        }
    }
}

/// One post. Records are immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Unique post identifier.
    pub id: String,
    /// Creation instant, normalized to UTC.
    pub created: DateTime<Utc>,
    /// Post-type flair used for category filtering.
    pub flair: Option<String>,
    pub title: Option<String>,
    pub selftext: Option<String>,
    /// LIWC word count (`WC`), when the table was scored.
    pub word_count: Option<f64>,
    /// Every other numeric column keyed by header.
    pub scores: BTreeMap<String, f64>,
}

impl Record {
    pub fn new(id: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created,
            flair: None,
            title: None,
            selftext: None,
            word_count: None,
            scores: BTreeMap::new(),
        }
    }

    pub fn with_flair(mut self, flair: impl Into<String>) -> Self {
        self.flair = Some(flair.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_selftext(mut self, selftext: impl Into<String>) -> Self {
        self.selftext = Some(selftext.into());
        self
    }

    pub fn with_word_count(mut self, wc: f64) -> Self {
        self.word_count = Some(wc);
        self
    }

    pub fn with_score(mut self, name: impl Into<String>, value: f64) -> Self {
        self.scores.insert(name.into(), value);
        self
    }

    /// Text of the selected column.
    pub fn text(&self, column: TextColumn) -> Option<&str> {
        match column {
            TextColumn::Selftext => self.selftext.as_deref(),
            TextColumn::Title => self.title.as_deref(),
        }
    }

    /// Named score, if present and finite.
    pub fn score(&self, name: &str) -> Option<f64> {
        self.scores.get(name).copied().filter(|v| v.is_finite())
    }

    /// Named score with any positive value mapped to 1 and the rest to 0.
    pub fn binary_score(&self, name: &str) -> Option<f64> {
        self.score(name).map(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn text_column_selects_field() {
        let ts = Utc.with_ymd_and_hms(2020, 3, 11, 0, 0, 0).unwrap();
        let record = Record::new("a1", ts)
            .with_title("flying")
            .with_selftext("I was flying over the sea");

        assert_eq!(record.text(TextColumn::Title), Some("flying"));
        assert_eq!(
            record.text(TextColumn::Selftext),
            Some("I was flying over the sea")
        );
    }

    #[test]
    fn binary_score_thresholds_at_zero() {
        let ts = Utc.with_ymd_and_hms(2020, 3, 11, 0, 0, 0).unwrap();
        let record = Record::new("a1", ts)
            .with_score("covid", 2.5)
            .with_score("nightmare", 0.0)
            .with_score("broken", f64::NAN);

        assert_eq!(record.binary_score("covid"), Some(1.0));
        assert_eq!(record.binary_score("nightmare"), Some(0.0));
        assert_eq!(record.binary_score("broken"), None);
        assert_eq!(record.binary_score("absent"), None);
    }

    #[test]
    fn text_column_parses() {
        assert_eq!("title".parse::<TextColumn>().unwrap(), TextColumn::Title);
        assert!("body".parse::<TextColumn>().is_err());
    }
}
