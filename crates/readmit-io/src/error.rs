//! I/O error types for readmit-io.

use std::path::PathBuf;

/// Errors from file I/O, CSV parsing, cleaning, and request validation.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a column the model needs is absent from the header.
    #[error("missing column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the absent column.
        column: String,
    },

    /// Returned when a numeric or age cell cannot be interpreted.
    #[error("invalid value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    InvalidValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Column holding the offending cell.
        column: String,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when a scoring request field is outside its allowed values.
    #[error("invalid request field \"{field}\": \"{value}\"")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// Returned when a scoring request is not well-formed JSON.
    #[error("malformed scoring request")]
    RequestParse {
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a JSON report cannot be encoded.
    #[error("failed to encode JSON for {path}")]
    Encode {
        /// Destination path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when an output file cannot be written.
    #[error("failed to write {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
