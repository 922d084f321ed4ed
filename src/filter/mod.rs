//! Record selection: validity, deduplication and category membership.
//!
//! Validity and deduplication run over the whole input before the category
//! test, so an `Include` pass and an `Exclude` pass over the same category
//! set split the valid records into two disjoint halves.

use crate::core::{Record, TextColumn};
use crate::error::{AnalysisError, Result};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Flairs that mark a post as a dream report.
pub const DREAM_FLAIRS: [&str; 3] = ["Short Dream", "Medium Dream", "Long Dream"];

/// Placeholder bodies left behind by deleted or moderated posts.
pub const DELETION_SENTINELS: [&str; 2] = ["[deleted]", "[removed]"];

/// Label used for every flair outside [`DREAM_FLAIRS`].
pub const OTHER_FLAIR: &str = "None";

/// Whether the category set selects or rejects records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMode {
    Include,
    Exclude,
}

impl FromStr for CategoryMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "include" => Ok(CategoryMode::Include),
            "exclude" => Ok(CategoryMode::Exclude),
            other => Err(AnalysisError::InvalidCategory(other.to_string())),
        }
    }
}

/// Post group under study: dream reports or the wake-post control group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostCategory {
    #[default]
    Dreams,
    Wake,
}

impl PostCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PostCategory::Dreams => "dreams",
            PostCategory::Wake => "wake",
        }
    }
}

impl fmt::Display for PostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostCategory {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dreams" => Ok(PostCategory::Dreams),
            "wake" => Ok(PostCategory::Wake),
            other => Err(AnalysisError::InvalidCategory(other.to_string())),
        }
    }
}

/// Category membership test over record flairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    categories: BTreeSet<String>,
    mode: CategoryMode,
}

impl CategoryFilter {
    pub fn new<I, S>(categories: I, mode: CategoryMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    /// Parse a textual mode (`include`/`exclude`) for a category set.
    pub fn parse<I, S>(mode: &str, categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(categories, mode.parse()?))
    }

    /// Dream flairs included for [`PostCategory::Dreams`], excluded for wake posts.
    pub fn for_posts(posts: PostCategory) -> Self {
        let mode = match posts {
            PostCategory::Dreams => CategoryMode::Include,
            PostCategory::Wake => CategoryMode::Exclude,
        };
        Self::new(DREAM_FLAIRS, mode)
    }

    /// Same category set with the opposite mode.
    pub fn complement(&self) -> Self {
        let mode = match self.mode {
            CategoryMode::Include => CategoryMode::Exclude,
            CategoryMode::Exclude => CategoryMode::Include,
        };
        Self {
            categories: self.categories.clone(),
            mode,
        }
    }

    pub fn mode(&self) -> CategoryMode {
        self.mode
    }

    /// A record without flair is never a member of the set.
    pub fn matches(&self, record: &Record) -> bool {
        let member = record
            .flair
            .as_deref()
            .is_some_and(|f| self.categories.contains(f));
        match self.mode {
            CategoryMode::Include => member,
            CategoryMode::Exclude => !member,
        }
    }
}

/// Validity, deduplication and (optionally) category selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    column: TextColumn,
    category: Option<CategoryFilter>,
}

impl RecordFilter {
    pub fn new(column: TextColumn) -> Self {
        Self {
            column,
            category: None,
        }
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = Some(category);
        self
    }

    /// Return the selected records in input order.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        let valid = preprocess(records, self.column);
        let Some(category) = &self.category else {
            return valid;
        };

        let selected: Vec<Record> = valid.into_iter().filter(|r| category.matches(r)).collect();
        debug!(
            kept = selected.len(),
            mode = ?category.mode(),
            "applied category filter"
        );
        selected
    }
}

/// Drop placeholder and missing texts, then duplicates, then wordless posts.
///
/// The first record carrying a given text is kept. The text must be
/// non-empty, and a LIWC word count, when present, at least one.
pub fn preprocess(records: &[Record], column: TextColumn) -> Vec<Record> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        let Some(text) = record.text(column) else {
            continue;
        };
        if DELETION_SENTINELS.contains(&text) || !seen.insert(text) {
            continue;
        }
        let has_words = !text.is_empty() && record.word_count.map_or(true, |wc| wc >= 1.0);
        if has_words {
            kept.push(record.clone());
        }
    }

    debug!(
        column = column.column_name(),
        input = records.len(),
        kept = kept.len(),
        "preprocessed records"
    );
    kept
}

/// Map a flair to itself if it is a dream flair, otherwise to [`OTHER_FLAIR`].
pub fn consolidate_flair(flair: Option<&str>) -> &'static str {
    flair
        .and_then(|f| DREAM_FLAIRS.iter().find(|d| **d == f).copied())
        .unwrap_or(OTHER_FLAIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: &str, flair: Option<&str>, text: Option<&str>) -> Record {
        let ts = Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap();
        let mut r = Record::new(id, ts);
        r.flair = flair.map(String::from);
        r.selftext = text.map(String::from);
        r
    }

    #[test]
    fn unknown_modes_are_invalid_category() {
        assert_eq!(
            "sleep".parse::<PostCategory>(),
            Err(AnalysisError::InvalidCategory("sleep".to_string()))
        );
        assert!(matches!(
            CategoryFilter::parse("maybe", DREAM_FLAIRS),
            Err(AnalysisError::InvalidCategory(_))
        ));
    }

    #[test]
    fn sentinels_missing_and_duplicates_are_dropped() {
        let records = vec![
            post("1", Some("Short Dream"), Some("a dream")),
            post("2", Some("Short Dream"), Some("[deleted]")),
            post("3", Some("Short Dream"), Some("[removed]")),
            post("4", Some("Short Dream"), None),
            post("5", Some("Long Dream"), Some("a dream")),
            post("6", Some("Long Dream"), Some("")),
        ];

        let kept = preprocess(&records, TextColumn::Selftext);
        let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn zero_word_count_drops_punctuation_only_posts() {
        let records = vec![
            post("1", None, Some("...")).with_word_count(0.0),
            post("2", None, Some("words here")).with_word_count(2.0),
        ];

        let kept = preprocess(&records, TextColumn::Selftext);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "2");
    }

    #[test]
    fn wake_posts_include_unflaired() {
        let records = vec![
            post("1", Some("Medium Dream"), Some("one")),
            post("2", Some("Question"), Some("two")),
            post("3", None, Some("three")),
        ];

        let dreams = RecordFilter::new(TextColumn::Selftext)
            .with_category(CategoryFilter::for_posts(PostCategory::Dreams))
            .apply(&records);
        let wake = RecordFilter::new(TextColumn::Selftext)
            .with_category(CategoryFilter::for_posts(PostCategory::Wake))
            .apply(&records);

        assert_eq!(dreams.len(), 1);
        assert_eq!(wake.len(), 2);
        assert_eq!(
            CategoryFilter::for_posts(PostCategory::Dreams).complement(),
            CategoryFilter::for_posts(PostCategory::Wake)
        );
    }

    #[test]
    fn flairs_consolidate_to_dream_labels_or_none() {
        assert_eq!(consolidate_flair(Some("Long Dream")), "Long Dream");
        assert_eq!(consolidate_flair(Some("Discussion")), "None");
        assert_eq!(consolidate_flair(None), "None");
    }
}
