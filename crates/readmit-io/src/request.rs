//! Validation of single-patient scoring requests.

use readmit_features::{CATEGORICAL_ATTRIBUTES, RawValue, Record};
use serde::{Deserialize, Serialize};

use crate::IoError;
use crate::clean::{age_midpoint, age_value, categorical_value};

const RACES: [&str; 5] = ["Caucasian", "AfricanAmerican", "Asian", "Hispanic", "Other"];
const GENDERS: [&str; 3] = ["Male", "Female", "Unknown/Invalid"];
const MEDICATION_STATUSES: [&str; 4] = ["No", "Steady", "Up", "Down"];

/// A scoring request for one patient encounter.
///
/// The eight visit counters are required. Demographics, diagnoses, and
/// medication statuses are optional; an absent value is treated exactly
/// like an unknown cell in the training CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub time_in_hospital: u32,
    pub num_lab_procedures: u32,
    pub num_procedures: u32,
    pub num_medications: u32,
    pub number_outpatient: u32,
    pub number_emergency: u32,
    pub number_inpatient: u32,
    pub number_diagnoses: u32,

    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Decade bucket such as `[70-80)`.
    #[serde(default)]
    pub age: Option<String>,

    /// ICD-9 diagnosis codes, e.g. `250.83`, `V57`, `E888`.
    #[serde(default)]
    pub diag_1: Option<String>,
    #[serde(default)]
    pub diag_2: Option<String>,
    #[serde(default)]
    pub diag_3: Option<String>,

    #[serde(default)]
    pub metformin: Option<String>,
    #[serde(default)]
    pub repaglinide: Option<String>,
    #[serde(default)]
    pub nateglinide: Option<String>,
    #[serde(default)]
    pub chlorpropamide: Option<String>,
    #[serde(default)]
    pub glimepiride: Option<String>,
    #[serde(default)]
    pub acetohexamide: Option<String>,
    #[serde(default)]
    pub glipizide: Option<String>,
    #[serde(default)]
    pub glyburide: Option<String>,
    #[serde(default)]
    pub tolbutamide: Option<String>,
    #[serde(default)]
    pub pioglitazone: Option<String>,
    #[serde(default)]
    pub rosiglitazone: Option<String>,
    #[serde(default)]
    pub acarbose: Option<String>,
    #[serde(default)]
    pub miglitol: Option<String>,
    #[serde(default)]
    pub troglitazone: Option<String>,
    #[serde(default)]
    pub tolazamide: Option<String>,
    #[serde(default)]
    pub examide: Option<String>,
    #[serde(default)]
    pub citoglipton: Option<String>,
    #[serde(default)]
    pub insulin: Option<String>,
}

impl ScoringRequest {
    /// Parse a request from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::RequestParse`] for malformed JSON, a missing
    /// counter, or a negative or non-integer counter.
    pub fn from_json(json: &str) -> Result<Self, IoError> {
        serde_json::from_str(json).map_err(|source| IoError::RequestParse { source })
    }

    /// Check every present field against its allowed values.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), IoError> {
        check_one_of("race", self.race.as_deref(), &RACES)?;
        check_one_of("gender", self.gender.as_deref(), &GENDERS)?;
        if let Some(age) = self.age.as_deref() {
            if age_midpoint(age).is_none() {
                return Err(invalid("age", age));
            }
        }
        for (field, code) in [
            ("diag_1", &self.diag_1),
            ("diag_2", &self.diag_2),
            ("diag_3", &self.diag_3),
        ] {
            if let Some(code) = code.as_deref() {
                if !is_icd9_code(code) {
                    return Err(invalid(field, code));
                }
            }
        }
        for (field, status) in self.medications() {
            check_one_of(field, status, &MEDICATION_STATUSES)?;
        }
        Ok(())
    }

    /// Validate the request and clean it into a model-ready [`Record`].
    ///
    /// Categorical attributes the request cannot carry (combination drugs,
    /// `change`, `diabetesMed`) are filled with the missing marker, as the
    /// CSV cleaning does for unknown cells.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Validation`] if any field is out of range.
    pub fn into_record(self) -> Result<Record, IoError> {
        self.validate()?;

        let counters = [
            ("time_in_hospital", self.time_in_hospital),
            ("num_lab_procedures", self.num_lab_procedures),
            ("num_procedures", self.num_procedures),
            ("num_medications", self.num_medications),
            ("number_outpatient", self.number_outpatient),
            ("number_emergency", self.number_emergency),
            ("number_inpatient", self.number_inpatient),
            ("number_diagnoses", self.number_diagnoses),
        ];

        let mut fields: Vec<(&str, RawValue)> = counters
            .into_iter()
            .map(|(name, count)| (name, RawValue::Number(f64::from(count))))
            .collect();

        for &name in &CATEGORICAL_ATTRIBUTES {
            let raw = self.categorical(name);
            let value = if name == "age" {
                // Bucket already validated above.
                age_value(raw).unwrap_or(RawValue::Missing)
            } else {
                categorical_value(raw)
            };
            fields.push((name, value));
        }

        Ok(fields.into_iter().collect())
    }

    fn medications(&self) -> [(&'static str, Option<&str>); 18] {
        [
            ("metformin", self.metformin.as_deref()),
            ("repaglinide", self.repaglinide.as_deref()),
            ("nateglinide", self.nateglinide.as_deref()),
            ("chlorpropamide", self.chlorpropamide.as_deref()),
            ("glimepiride", self.glimepiride.as_deref()),
            ("acetohexamide", self.acetohexamide.as_deref()),
            ("glipizide", self.glipizide.as_deref()),
            ("glyburide", self.glyburide.as_deref()),
            ("tolbutamide", self.tolbutamide.as_deref()),
            ("pioglitazone", self.pioglitazone.as_deref()),
            ("rosiglitazone", self.rosiglitazone.as_deref()),
            ("acarbose", self.acarbose.as_deref()),
            ("miglitol", self.miglitol.as_deref()),
            ("troglitazone", self.troglitazone.as_deref()),
            ("tolazamide", self.tolazamide.as_deref()),
            ("examide", self.examide.as_deref()),
            ("citoglipton", self.citoglipton.as_deref()),
            ("insulin", self.insulin.as_deref()),
        ]
    }

    fn categorical(&self, name: &str) -> Option<&str> {
        match name {
            "race" => self.race.as_deref(),
            "gender" => self.gender.as_deref(),
            "age" => self.age.as_deref(),
            "diag_1" => self.diag_1.as_deref(),
            "diag_2" => self.diag_2.as_deref(),
            "diag_3" => self.diag_3.as_deref(),
            _ => self
                .medications()
                .into_iter()
                .find_map(|(med, status)| (med == name).then_some(status))
                .flatten(),
        }
    }
}

fn invalid(field: &str, value: &str) -> IoError {
    IoError::Validation {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn check_one_of(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<(), IoError> {
    match value {
        Some(v) if !allowed.contains(&v) => Err(invalid(field, v)),
        _ => Ok(()),
    }
}

/// Match `[VE]?digits(.digits)?`.
fn is_icd9_code(code: &str) -> bool {
    let body = code
        .strip_prefix('V')
        .or_else(|| code.strip_prefix('E'))
        .unwrap_or(code);
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match body.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(body),
    }
}
