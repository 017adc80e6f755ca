//! Cleaning rules shared by CSV ingestion and request validation.

use readmit_features::{MISSING_MARKER, RawValue};

/// Column holding the readmission outcome in the hospital CSV.
pub const LABEL_COLUMN: &str = "readmitted";

/// Raw outcome value that marks an early readmission.
const EARLY_READMISSION: &str = "<30";

/// Return `true` for a cell the source marks as unknown (`?` or empty).
#[must_use]
pub fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw == "?"
}

/// Normalize categorical text: lower-case, spaces replaced by `_`.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    raw.to_lowercase().replace(' ', "_")
}

/// Map an age bucket such as `[70-80)` to its midpoint.
///
/// Only the ten decade buckets from `[0-10)` to `[90-100)` are recognized.
#[must_use]
pub fn age_midpoint(bucket: &str) -> Option<f64> {
    let (low, high) = bucket
        .strip_prefix('[')?
        .strip_suffix(')')?
        .split_once('-')?;
    let low: u32 = low.parse().ok()?;
    let high: u32 = high.parse().ok()?;
    if low % 10 != 0 || low > 90 || high != low + 10 {
        return None;
    }
    Some(f64::from(low + 5))
}

/// Binary readmission label: 1 for `<30`, 0 for anything else.
#[must_use]
pub fn readmission_label(raw: &str) -> usize {
    usize::from(raw == EARLY_READMISSION)
}

/// Clean a categorical cell. Absent or unknown values become [`MISSING_MARKER`].
pub(crate) fn categorical_value(raw: Option<&str>) -> RawValue {
    match raw {
        Some(s) if !is_missing(s) => RawValue::Text(clean_text(s)),
        _ => RawValue::Text(MISSING_MARKER.to_string()),
    }
}

/// Clean a numeric cell. Unknown values count as zero; `None` means unparseable.
pub(crate) fn numeric_value(raw: &str) -> Option<RawValue> {
    if is_missing(raw) {
        return Some(RawValue::Number(0.0));
    }
    let value: f64 = raw.trim().parse().ok()?;
    value.is_finite().then_some(RawValue::Number(value))
}

/// Clean an age cell. Unknown ages stay missing; `None` means an unrecognized bucket.
pub(crate) fn age_value(raw: Option<&str>) -> Option<RawValue> {
    match raw {
        Some(s) if !is_missing(s) => age_midpoint(s).map(RawValue::Number),
        _ => Some(RawValue::Missing),
    }
}
