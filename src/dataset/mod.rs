//! Dataset loading, CSV I/O, stratified splitting and the prepare pipeline.

pub mod california;
pub mod csv_io;
pub mod prepare;
pub mod split;
pub mod synthetic;
mod table;

use std::path::PathBuf;

use thiserror::Error;

pub use table::Table;

/// Something that can produce a full in-memory [`Table`].
pub trait DatasetSource {
    /// Short human-readable name used in log lines.
    fn name(&self) -> &str;

    /// Load every record.
    fn load(&self) -> Result<Table, DatasetError>;
}

/// Errors raised while loading, parsing or writing tabular data.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} has no header row")]
    MissingHeader { path: PathBuf },
    #[error("column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("invalid number '{value}' in {path} at row {row}, column '{column}'")]
    ParseValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
    #[error("{path} line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("table shape mismatch: {0}")]
    Shape(String),
    #[error("{path} contains no data rows")]
    Empty { path: PathBuf },
    #[error("archive {archive} has no member named {member}")]
    MissingArchiveMember { archive: PathBuf, member: String },
    #[error("dataset not cached at {path} and downloads are disabled")]
    NotCached { path: PathBuf },
    #[error("invalid dataset URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("SHA-256 mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("app dirs error: {0}")]
    AppDirs(#[from] crate::app_dirs::AppDirError),
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
