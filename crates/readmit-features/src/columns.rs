//! Attribute and feature names shared by training, serving, and cleaning.

/// Marker written by the cleaning step for a missing categorical value.
pub const MISSING_MARKER: &str = "NA";

/// Numeric attributes every record is expected to carry.
pub const NUMERIC_ATTRIBUTES: [&str; 8] = [
    "time_in_hospital",
    "num_lab_procedures",
    "num_procedures",
    "num_medications",
    "number_outpatient",
    "number_emergency",
    "number_inpatient",
    "number_diagnoses",
];

/// The eighteen diabetes medication status fields.
pub const MEDICATIONS: [&str; 18] = [
    "metformin",
    "repaglinide",
    "nateglinide",
    "chlorpropamide",
    "glimepiride",
    "acetohexamide",
    "glipizide",
    "glyburide",
    "tolbutamide",
    "pioglitazone",
    "rosiglitazone",
    "acarbose",
    "miglitol",
    "troglitazone",
    "tolazamide",
    "examide",
    "citoglipton",
    "insulin",
];

/// Categorical attributes used by the model.
///
/// `age` is listed here but the cleaning step maps its bucket to a numeric
/// midpoint, so it reaches the vectorizer as a number.
pub const CATEGORICAL_ATTRIBUTES: [&str; 31] = [
    "race",
    "gender",
    "age",
    "diag_1",
    "diag_2",
    "diag_3",
    "metformin",
    "repaglinide",
    "nateglinide",
    "chlorpropamide",
    "glimepiride",
    "acetohexamide",
    "glipizide",
    "glyburide",
    "tolbutamide",
    "pioglitazone",
    "rosiglitazone",
    "acarbose",
    "miglitol",
    "troglitazone",
    "tolazamide",
    "examide",
    "citoglipton",
    "insulin",
    "glyburide-metformin",
    "glipizide-metformin",
    "glimepiride-pioglitazone",
    "metformin-rosiglitazone",
    "metformin-pioglitazone",
    "change",
    "diabetesMed",
];

/// Features appended by [`transform`](crate::transform), in derivation order.
pub const DERIVED_FEATURES: [&str; 8] = [
    "total_previous_visits",
    "had_previous_inpatient",
    "avg_medications_per_day",
    "procedure_to_lab_ratio",
    "num_medications_used",
    "num_adjusted_medications",
    "any_medication_change",
    "on_insulin",
];
