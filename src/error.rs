//! Error types for the dreamshift pipeline.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can abort an analysis run.
///
/// Every variant is fatal to the run that raised it: no report files are
/// written once one of these surfaces.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Unrecognized category filter mode.
    #[error("invalid category mode '{0}' (expected one of: dreams, wake, include, exclude)")]
    InvalidCategory(String),

    /// Too few points for a statistical fit.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Regressors are linearly dependent, so the fit is not identifiable.
    #[error("insufficient data: collinear regressors ({0})")]
    CollinearRegressors(String),

    /// A lag/percent-change join left nothing to test.
    #[error("join of '{left}' and '{right}' produced no overlapping rows")]
    EmptyJoin { left: String, right: String },

    /// Required column missing or value unparseable.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Reading or writing a table failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl AnalysisError {
    /// True for the "not enough usable data" family, including collinearity.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            AnalysisError::InsufficientData { .. } | AnalysisError::CollinearRegressors(_)
        )
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => AnalysisError::Io(err.to_string()),
            _ => AnalysisError::MalformedInput(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = AnalysisError::InvalidCategory("sleep".to_string());
        assert_eq!(
            err.to_string(),
            "invalid category mode 'sleep' (expected one of: dreams, wake, include, exclude)"
        );

        let err = AnalysisError::InsufficientData { needed: 4, got: 2 };
        assert_eq!(err.to_string(), "insufficient data: need at least 4, got 2");

        let err = AnalysisError::EmptyJoin {
            left: "news_pctchange".to_string(),
            right: "nextDreams_pctchange".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "join of 'news_pctchange' and 'nextDreams_pctchange' produced no overlapping rows"
        );

        let err = AnalysisError::MalformedInput("missing column 'created_utc'".to_string());
        assert_eq!(
            err.to_string(),
            "malformed input: missing column 'created_utc'"
        );
    }

    #[test]
    fn collinearity_counts_as_insufficient_data() {
        assert!(AnalysisError::CollinearRegressors("Covid".into()).is_insufficient_data());
        assert!(AnalysisError::InsufficientData { needed: 4, got: 1 }.is_insufficient_data());
        assert!(!AnalysisError::InvalidParameter("x".into()).is_insufficient_data());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: AnalysisError = io.into();
        assert!(matches!(err, AnalysisError::Io(ref m) if m.contains("no such file")));
    }
}
