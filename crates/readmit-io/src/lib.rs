//! File I/O, cleaning, and request validation for readmission scoring.
//!
//! Training data and scoring requests pass through the same cleaning rules
//! so the model sees identically shaped records in both paths.

mod clean;
mod error;
mod reader;
mod request;
mod writer;

pub use clean::{LABEL_COLUMN, age_midpoint, clean_text, is_missing, readmission_label};
pub use error::IoError;
pub use reader::{DatasetReader, TrainingSet};
pub use request::ScoringRequest;
pub use writer::write_json;
