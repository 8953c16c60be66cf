use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Fatal failures that stop a conversion pass.
///
/// Per-cell data problems are not represented here; they surface as
/// [`ConversionWarning`](crate::convert::ConversionWarning)s instead.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Wrapper for IO failures such as a missing file or directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when a CSV sheet cannot be tokenised.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a column declares a type the converter does not know.
    #[error("Unrecognised type: \"{0}\"")]
    UnrecognisedType(String),

    /// Raised when the configured main sheet is absent from the input.
    #[error("Main sheet \"{name}\" not found in {container}.")]
    MainSheetNotFound {
        name: String,
        container: &'static str,
    },

    /// Raised when a sub-sheet requested by name is absent from the workbook.
    #[error("sheet \"{0}\" not found in workbook")]
    MissingSheet(String),

    /// Raised when no main sheet was named and the input holds no sheets.
    #[error("no sheets found in {0}")]
    EmptyInput(String),

    /// Raised when the timezone name is not a known IANA identifier.
    #[error("unknown timezone \"{0}\"")]
    UnknownTimezone(String),

    /// Raised when the CSV encoding label is not recognised.
    #[error("unknown encoding \"{0}\"")]
    UnknownEncoding(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
