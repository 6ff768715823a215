//! Error types shared by the loader, the column selection and the map builder.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for station-mapper.
#[derive(Error, Debug)]
pub enum MapError {
    /// File system errors (reading CSVs, reading icons, writing maps).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV could not be split into consistent records with this separator.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bytes are not valid in the requested encoding.
    #[error("cannot decode file as {encoding}: {reason}")]
    Decode { encoding: String, reason: String },

    /// A record has more fields than the header row.
    #[error("line {line}: expected at most {expected} fields, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("separator '{0}' is not a single ASCII character")]
    InvalidSeparator(char),

    #[error("unknown encoding label '{0}'")]
    UnknownEncoding(String),

    #[error("file {0:?} is empty")]
    EmptyFile(PathBuf),

    /// Every separator/encoding combination failed.
    #[error("no separator/encoding combination could load {0:?}")]
    NoUsableConfiguration(PathBuf),

    #[error("invalid column specification '{0}'")]
    InvalidColumnSpec(String),

    #[error("column index {index} is out of range for a table with {width} columns")]
    ColumnOutOfRange { index: usize, width: usize },

    #[error("zoom {0} is outside the accepted range 1-16")]
    InvalidZoom(u8),

    #[error("icon file not found: {0:?}")]
    IconNotFound(PathBuf),
}

/// Result type alias for station-mapper operations
pub type Result<T> = std::result::Result<T, MapError>;

impl MapError {
    pub fn decode(encoding: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            encoding: encoding.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether retrying with another encoding could help.
    pub fn is_encoding_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Whether retrying with another separator could help.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Csv(_) | Self::TooManyFields { .. })
    }
}
