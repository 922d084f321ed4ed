//! Typed tables serialised as tab-separated text.

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use std::fmt;

/// Marker written for missing cells.
pub const MISSING: &str = "NA";

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Integer(i64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Missing,
}

impl Cell {
    /// `Number` for finite values, `Missing` for NaN.
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Cell::Missing
        } else {
            Cell::Number(value)
        }
    }

    pub fn optional(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::number)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole floats keep a trailing ".0" so numeric columns stay
            // recognisably floating point.
            Cell::Number(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            Cell::Number(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "inf" } else { "-inf" })
            }
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Integer(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Missing => f.write_str(MISSING),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::number(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Integer(value as i64)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    cells: Vec<Cell>,
}

/// Column-ordered table with zero or more leading index columns.
///
/// Columns are written in insertion order, index columns first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    index: Vec<Column>,
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an index column.
    pub fn with_index(mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<Self> {
        let column = self.checked(name.into(), cells)?;
        self.index.push(column);
        Ok(self)
    }

    /// Add a data column.
    pub fn with_column(mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<Self> {
        self.push_column(name, cells)?;
        Ok(self)
    }

    pub fn push_column(&mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<()> {
        let column = self.checked(name.into(), cells)?;
        self.columns.push(column);
        Ok(())
    }

    fn checked(&self, name: String, cells: Vec<Cell>) -> Result<Column> {
        if let Some(first) = self.index.iter().chain(&self.columns).next() {
            if first.cells.len() != cells.len() {
                return Err(AnalysisError::InvalidParameter(format!(
                    "column '{}' has {} rows, frame has {}",
                    name,
                    cells.len(),
                    first.cells.len()
                )));
            }
        }
        Ok(Column { name, cells })
    }

    pub fn n_rows(&self) -> usize {
        self.index
            .iter()
            .chain(&self.columns)
            .next()
            .map_or(0, |c| c.cells.len())
    }

    /// Header names, index columns first.
    pub fn headers(&self) -> Vec<&str> {
        self.index
            .iter()
            .chain(&self.columns)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Cells of a named index or data column.
    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.index
            .iter()
            .chain(&self.columns)
            .find(|c| c.name == name)
            .map(|c| c.cells.as_slice())
    }

    /// Serialise as tab-separated text with a header row.
    pub fn to_tsv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(Vec::new());

        writer.write_record(self.headers())?;
        let all: Vec<&Column> = self.index.iter().chain(&self.columns).collect();
        for row in 0..self.n_rows() {
            writer.write_record(all.iter().map(|c| c.cells[row].to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AnalysisError::Io(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AnalysisError::Io(e.to_string()))
    }
}
