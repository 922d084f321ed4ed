//! Loading post tables (raw scrapes and LIWC output) into [`Record`]s.
//!
//! Tables are comma-separated with a header row. Text cells may be quoted
//! and span several lines. Only `id` and `created_utc` are required; every
//! other numeric column becomes a named score on the record.
//!
//! # Example
//!
//! ```
//! use dreamshift::io::parse_records;
//!
//! let table = "id,created_utc,link_flair_text,selftext,WC,emo_anx\n\
//!              a1,1583884800,Short Dream,\"I was late, again\",4,0.25\n";
//! let records = parse_records(table.as_bytes()).unwrap();
//!
//! assert_eq!(records[0].flair.as_deref(), Some("Short Dream"));
//! assert_eq!(records[0].score("emo_anx"), Some(0.25));
//! ```

use crate::core::Record;
use crate::error::{AnalysisError, Result};
use crate::temporal::parse_epoch;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cell contents treated as missing; the usual spreadsheet and dataframe
/// null spellings.
pub const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const ID: &str = "id";
const CREATED: &str = "created_utc";
/// Known text column that is neither filtered on nor scored.
const SUBREDDIT: &str = "subreddit";
const FLAIR: &str = "link_flair_text";
const TITLE: &str = "title";
const SELFTEXT: &str = "selftext";
const WORD_COUNT: &str = "WC";

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

fn present(cell: &str) -> Option<String> {
    (!is_missing(cell)).then(|| cell.to_string())
}

/// Header positions of the columns the loader understands.
struct Layout {
    id: usize,
    created: usize,
    flair: Option<usize>,
    title: Option<usize>,
    selftext: Option<usize>,
    word_count: Option<usize>,
    scores: Vec<(usize, String)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let find = |name: &str| names.iter().position(|h| *h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                AnalysisError::MalformedInput(format!("missing column '{}'", name))
            })
        };

        let known = [ID, CREATED, SUBREDDIT, FLAIR, TITLE, SELFTEXT, WORD_COUNT];
        let scores = names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty() && !known.contains(*name))
            .map(|(i, name)| (i, name.to_string()))
            .collect();

        Ok(Self {
            id: require(ID)?,
            created: require(CREATED)?,
            flair: find(FLAIR),
            title: find(TITLE),
            selftext: find(SELFTEXT),
            word_count: find(WORD_COUNT),
            scores,
        })
    }

    fn record(&self, row: &csv::StringRecord, line: u64) -> Result<Record> {
        let cell = |i: usize| row.get(i).unwrap_or("");
        let optional = |i: Option<usize>| i.and_then(|i| present(cell(i)));

        let id = cell(self.id);
        if is_missing(id) {
            return Err(AnalysisError::MalformedInput(format!(
                "row {} has no id",
                line
            )));
        }
        let created = parse_epoch(cell(self.created)).map_err(|e| match e {
            AnalysisError::MalformedInput(msg) => {
                AnalysisError::MalformedInput(format!("row {}: {}", line, msg))
            }
            other => other,
        })?;

        let word_count = match self.word_count.map(cell) {
            Some(wc) if !is_missing(wc) => Some(wc.trim().parse::<f64>().map_err(|_| {
                AnalysisError::MalformedInput(format!("row {}: unparseable WC '{}'", line, wc))
            })?),
            _ => None,
        };

        let mut record = Record::new(id, created);
        record.flair = optional(self.flair);
        record.title = optional(self.title);
        record.selftext = optional(self.selftext);
        record.word_count = word_count;
        // Non-numeric cells in score columns (author names, flags) are skipped.
        record.scores = self
            .scores
            .iter()
            .filter_map(|(i, name)| {
                let value = cell(*i).trim().parse::<f64>().ok()?;
                Some((name.clone(), value))
            })
            .collect();
        Ok(record)
    }
}

/// Parse records from any CSV source.
///
/// # Errors
/// [`AnalysisError::MalformedInput`] when a required column is missing, a
/// row has no id, or a timestamp or word count does not parse.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let layout = Layout::from_headers(csv_reader.headers()?)?;

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let row = row?;
        let line = row.position().map_or(i as u64 + 2, |p| p.line());
        records.push(layout.record(&row, line)?);
    }

    debug!(
        records = records.len(),
        scores = layout.scores.len(),
        "parsed table"
    );
    Ok(records)
}

/// Load records from a CSV file.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| AnalysisError::Io(format!("{}: {}", path.display(), e)))?;
    let records = parse_records(file)?;
    debug!(path = %path.display(), records = records.len(), "loaded table");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parses_quoted_multiline_text() {
        let table = "id,created_utc,title,selftext,WC,emo_anx,nightmare\n\
                     p1,1583884800,Falling,\"line one\nline two, with comma\",6,0.5,0\n\
                     p2,1583971200.0,NA,[deleted],1,NA,1.2\n";
        let records = parse_records(table.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].selftext.as_deref(),
            Some("line one\nline two, with comma")
        );
        assert_eq!(records[0].word_count, Some(6.0));
        assert_eq!(
            records[0].created,
            Utc.with_ymd_and_hms(2020, 3, 11, 0, 0, 0).unwrap()
        );

        assert_eq!(records[1].title, None);
        assert_eq!(records[1].selftext.as_deref(), Some("[deleted]"));
        assert_eq!(records[1].score("emo_anx"), None);
        assert_eq!(records[1].score("nightmare"), Some(1.2));
    }

    #[test]
    fn null_spellings_are_missing_text() {
        let mut table = String::from("id,created_utc,title,selftext\n");
        for (i, marker) in ["N/A", "n/a", "NULL", "null", "None", "#N/A", "<NA>", "-NaN"]
            .iter()
            .enumerate()
        {
            table.push_str(&format!("p{},1583884800,{},{}\n", i, marker, marker));
        }
        table.push_str("q,1583884800,Nonesuch,nullable dream\n");
        let records = parse_records(table.as_bytes()).unwrap();

        assert_eq!(records.len(), 9);
        for record in &records[..8] {
            assert_eq!(record.title, None, "{}", record.id);
            assert_eq!(record.selftext, None, "{}", record.id);
        }
        assert_eq!(records[8].title.as_deref(), Some("Nonesuch"));
        assert_eq!(records[8].selftext.as_deref(), Some("nullable dream"));
    }

    #[test]
    fn byte_order_mark_is_stripped_from_headers() {
        let table = "\u{feff}created,created_utc,id,author,selftext\n\
                     1.5e9,1583884800,x9,someone,hello\n";
        let records = parse_records(table.as_bytes()).unwrap();
        assert_eq!(records[0].id, "x9");
        assert!(!records[0].scores.contains_key("author"));
        assert_eq!(records[0].score("created"), Some(1.5e9));
    }

    #[test]
    fn missing_required_column_is_malformed() {
        let err = parse_records("id,title\na,b\n".as_bytes()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MalformedInput("missing column 'created_utc'".to_string())
        );
    }

    #[test]
    fn bad_timestamp_is_malformed() {
        let err = parse_records("id,created_utc\na,yesterday\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedInput(ref m) if m.contains("row 2")));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_records("/nonexistent/r-dreams.csv").unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }
}
