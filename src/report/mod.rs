//! Report assembly and emission.
//!
//! A [`Report`] holds every artifact of one analysis run fully rendered in
//! memory. Nothing touches the filesystem until [`Report::emit`], so a run
//! that fails while computing leaves no partial output behind. `emit` itself
//! stages every file under a temporary name and only renames them into place
//! once all of them are written.
//!
//! # Example
//!
//! ```
//! use dreamshift::report::{Cell, Frame, Report};
//!
//! let frame = Frame::new()
//!     .with_index("test", vec![Cell::text("pearson")])
//!     .unwrap()
//!     .with_column("chi2", vec![Cell::number(24.0)])
//!     .unwrap();
//!
//! let mut report = Report::new("nightmares");
//! report.add_table("2020_dreams_nightmares_chi2-stat.tsv", &frame).unwrap();
//! assert_eq!(report.file_names(), vec!["2020_dreams_nightmares_chi2-stat.tsv"]);
//! ```

mod frame;

pub use frame::{Cell, Frame, MISSING};

use crate::error::{AnalysisError, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Rendered contents of every file one run produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    name: String,
    files: Vec<(String, String)>,
}

impl Report {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a table, rendered as TSV.
    pub fn add_table(&mut self, file_name: impl Into<String>, frame: &Frame) -> Result<()> {
        let contents = frame.to_tsv()?;
        self.add_text(file_name, contents);
        Ok(())
    }

    /// Add a plain-text artifact.
    pub fn add_text(&mut self, file_name: impl Into<String>, contents: impl Into<String>) {
        self.files.push((file_name.into(), contents.into()));
    }

    /// Add a value serialised as pretty JSON.
    pub fn add_json<T: Serialize>(&mut self, file_name: impl Into<String>, value: &T) -> Result<()> {
        let contents = serde_json::to_string_pretty(value)
            .map_err(|e| AnalysisError::InvalidParameter(format!("cannot serialise: {}", e)))?;
        self.add_text(file_name, contents + "\n");
        Ok(())
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Rendered contents of one artifact.
    pub fn contents(&self, file_name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, contents)| contents.as_str())
    }

    /// Write every artifact into `dir`, returning the written paths.
    ///
    /// The directory must already exist. If any file cannot be written, the
    /// staged files are removed and no artifact appears under its final name.
    pub fn emit(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AnalysisError::Io(format!(
                "output directory {} does not exist",
                dir.display()
            )));
        }

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.files.len());
        for (name, contents) in &self.files {
            let tmp_path = dir.join(format!(".{}.tmp", name));
            if let Err(e) = fs::write(&tmp_path, contents) {
                discard(&staged);
                return Err(AnalysisError::Io(format!("{}: {}", tmp_path.display(), e)));
            }
            staged.push((tmp_path, dir.join(name)));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (tmp_path, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp_path, path) {
                discard(&staged[i..]);
                return Err(AnalysisError::Io(format!("{}: {}", path.display(), e)));
            }
            written.push(path.clone());
        }

        info!(
            report = %self.name,
            files = written.len(),
            dir = %dir.display(),
            "wrote report"
        );
        Ok(written)
    }
}

/// Best-effort removal of staged files after a failed emit.
fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp_path, _) in staged {
        if let Err(e) = fs::remove_file(tmp_path) {
            warn!(path = %tmp_path.display(), error = %e, "could not remove staged file");
        }
    }
}
