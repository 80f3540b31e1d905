use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(
        "the specified CSV file was not found: {}. Please check the file path.",
        .0.display()
    )]
    InputNotFound(PathBuf),
    #[error("no file name")]
    NoFileName,
    #[error("invalid file name")]
    InvalidFileName,
    #[error("No file extension")]
    NoFileExtension,
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("incomplete file, line {0} has {1} fields but the header has {2}")]
    IncompleteFile(usize, usize, usize),
    #[error("empty file")]
    EmptyFile,
    #[error("unterminated quoted field on line {0}")]
    UnterminatedQuote(usize),
    #[error("unequal column lengths")]
    UnequalColumnLengths,
    #[error("duplicate column name {0}")]
    DuplicateColumnName(String),
    #[error("column index {0} out of bounds")]
    ColumnIndexOutOfBounds(usize),
    #[error("column name {0} not found")]
    ColumnNameNotFound(String),
    #[error("column {0} is not numeric")]
    NotNumeric(String),
    #[error("sample lengths do not match ({0} vs {1})")]
    LengthMismatch(usize, usize),
    #[error("sub-frames have different column counts (baseline {baseline}, after {after})")]
    ColumnCountMismatch { baseline: usize, after: usize },
    #[error("not enough observations ({0}) for {1}")]
    NotEnoughObservations(usize, &'static str),
    #[error("selection is invalid: {}", .0.join("; "))]
    InvalidSelection(Vec<String>),
    #[error("unknown report {0}, expected one of eda, wilcoxon, combined-heatmap, separate-heatmaps")]
    UnknownReport(String),
    #[error("distribution error: {0}")]
    Distribution(String),
    #[error("plot error: {0}")]
    Plot(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for Error {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        Error::Plot(err.to_string())
    }
}

impl Error {
    /// Whether the error happened while reading the input, as opposed to during analysis.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::InputNotFound(_)
                | Error::NoFileName
                | Error::InvalidFileName
                | Error::NoFileExtension
                | Error::UnsupportedFileType(_)
                | Error::IncompleteFile(..)
                | Error::EmptyFile
                | Error::UnterminatedQuote(_)
                | Error::DuplicateColumnName(_)
        )
    }
}
