//! CSV reader for the hospital encounter dataset.

use std::path::{Path, PathBuf};

use readmit_features::{CATEGORICAL_ATTRIBUTES, NUMERIC_ATTRIBUTES, RawValue, Record};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::clean::{LABEL_COLUMN, age_value, categorical_value, numeric_value, readmission_label};

/// Cleaned training records with their binary readmission labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    /// One cleaned record per encounter, in file order.
    pub records: Vec<Record>,
    /// `1` for readmission within 30 days, `0` otherwise; aligned with `records`.
    pub labels: Vec<usize>,
}

impl TrainingSet {
    /// Return the number of encounters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return `true` if the set holds no encounters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Return the number of positive labels.
    #[must_use]
    pub fn n_positive(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}

/// Where each model column lives in the CSV header.
struct ColumnLayout {
    numeric: Vec<(&'static str, usize)>,
    categorical: Vec<(&'static str, usize)>,
    label: usize,
}

/// Reads and cleans the hospital encounter CSV.
///
/// Expected CSV format: a header row naming at least the eight numeric
/// attributes, the categorical attributes, and `readmitted`. Other columns
/// (identifiers, sparsely filled fields) are ignored.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record or ragged row |
/// | [`IoError::MissingColumn`] | A model column is absent from the header |
/// | [`IoError::InvalidValue`] | Numeric cell or age bucket cannot be interpreted |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and clean the CSV file, returning a [`TrainingSet`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<TrainingSet, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let layout = self.layout(header)?;
        debug!(columns = header.len(), "read CSV header");

        let mut set = TrainingSet::default();
        for (row_index, result) in rdr.records().enumerate() {
            let row = result.map_err(|e| self.csv_error(e))?;
            let (record, label) = self.clean_row(&layout, &row, row_index)?;
            set.records.push(record);
            set.labels.push(label);
        }

        if set.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_records = set.len(),
            n_positive = set.n_positive(),
            "dataset loaded"
        );
        Ok(set)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn layout(&self, header: &csv::StringRecord) -> Result<ColumnLayout, IoError> {
        let find = |column: &str| {
            header
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| IoError::MissingColumn {
                    path: self.path.clone(),
                    column: column.to_string(),
                })
        };
        let numeric = NUMERIC_ATTRIBUTES
            .iter()
            .map(|&name| find(name).map(|idx| (name, idx)))
            .collect::<Result<Vec<_>, _>>()?;
        let categorical = CATEGORICAL_ATTRIBUTES
            .iter()
            .map(|&name| find(name).map(|idx| (name, idx)))
            .collect::<Result<Vec<_>, _>>()?;
        let label = find(LABEL_COLUMN)?;
        Ok(ColumnLayout {
            numeric,
            categorical,
            label,
        })
    }

    fn clean_row(
        &self,
        layout: &ColumnLayout,
        row: &csv::StringRecord,
        row_index: usize,
    ) -> Result<(Record, usize), IoError> {
        let invalid = |column: &str, raw: &str| IoError::InvalidValue {
            path: self.path.clone(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        };

        let mut fields: Vec<(&str, RawValue)> =
            Vec::with_capacity(layout.numeric.len() + layout.categorical.len());

        for &(name, idx) in &layout.numeric {
            let raw = row.get(idx).unwrap_or("");
            let value = numeric_value(raw).ok_or_else(|| invalid(name, raw))?;
            fields.push((name, value));
        }

        for &(name, idx) in &layout.categorical {
            let raw = row.get(idx);
            let value = if name == "age" {
                age_value(raw).ok_or_else(|| invalid(name, raw.unwrap_or("")))?
            } else {
                categorical_value(raw)
            };
            fields.push((name, value));
        }

        let label = readmission_label(row.get(layout.label).unwrap_or(""));
        Ok((fields.into_iter().collect(), label))
    }
}
