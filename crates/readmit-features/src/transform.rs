//! Derivation of visit-history and medication features from a clinical record.

use crate::columns::{MEDICATIONS, MISSING_MARKER};
use crate::record::{FeatureMap, RawValue, Record};

/// Transform a raw record into a feature map.
///
/// Every non-missing attribute is copied unchanged, then the derived
/// features listed in [`DERIVED_FEATURES`](crate::DERIVED_FEATURES) are
/// appended. Missing numeric inputs count as zero. The function is pure:
/// the same record always yields the same map.
#[must_use]
pub fn transform(record: &Record) -> FeatureMap {
    let mut map = FeatureMap::new();
    for (name, value) in record.iter() {
        match value {
            RawValue::Number(v) => map.insert_numeric(name, *v),
            RawValue::Text(s) => map.insert_categorical(name, s.as_str()),
            RawValue::Missing => {}
        }
    }

    let num = |name: &str| record.number(name).unwrap_or(0.0);

    // Visit history.
    let inpatient = num("number_inpatient");
    map.insert_numeric(
        "total_previous_visits",
        num("number_outpatient") + num("number_emergency") + inpatient,
    );
    map.insert_numeric("had_previous_inpatient", indicator(inpatient > 0.0));

    // Intensity ratios; the +1 keeps the denominator positive.
    map.insert_numeric(
        "avg_medications_per_day",
        num("num_medications") / (num("time_in_hospital") + 1.0),
    );
    map.insert_numeric(
        "procedure_to_lab_ratio",
        num("num_procedures") / (num("num_lab_procedures") + 1.0),
    );

    // Medication summaries.
    let used = MEDICATIONS
        .iter()
        .filter(|&&med| is_prescribed(record.text(med)))
        .count();
    let adjusted = MEDICATIONS
        .iter()
        .filter(|&&med| matches!(record.text(med), Some("up" | "down")))
        .count();
    map.insert_numeric("num_medications_used", used as f64);
    map.insert_numeric("num_adjusted_medications", adjusted as f64);
    map.insert_numeric("any_medication_change", indicator(adjusted > 0));
    map.insert_numeric("on_insulin", indicator(is_prescribed(record.text("insulin"))));

    map
}

/// A medication is prescribed when its status is known and not `no`.
fn is_prescribed(status: Option<&str>) -> bool {
    matches!(status, Some(s) if s != "no" && s != MISSING_MARKER)
}

fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DERIVED_FEATURES;
    use crate::record::FeatureValue;

    fn numeric(map: &FeatureMap, name: &str) -> f64 {
        match map.get(name) {
            Some(FeatureValue::Numeric(v)) => *v,
            other => panic!("{name} is not numeric: {other:?}"),
        }
    }

    fn sample_record() -> Record {
        [
            ("time_in_hospital", RawValue::Number(3.0)),
            ("num_lab_procedures", RawValue::Number(39.0)),
            ("num_procedures", RawValue::Number(2.0)),
            ("num_medications", RawValue::Number(12.0)),
            ("number_outpatient", RawValue::Number(1.0)),
            ("number_emergency", RawValue::Number(2.0)),
            ("number_inpatient", RawValue::Number(1.0)),
            ("number_diagnoses", RawValue::Number(9.0)),
            ("race", RawValue::Text("caucasian".into())),
            ("metformin", RawValue::Text("steady".into())),
            ("glipizide", RawValue::Text("up".into())),
            ("glyburide", RawValue::Text("no".into())),
            ("insulin", RawValue::Text("down".into())),
            ("diag_3", RawValue::Missing),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn derives_visit_features() {
        let map = transform(&sample_record());
        assert_eq!(numeric(&map, "total_previous_visits"), 4.0);
        assert_eq!(numeric(&map, "had_previous_inpatient"), 1.0);
    }

    #[test]
    fn derives_ratios_with_offset_denominator() {
        let map = transform(&sample_record());
        assert!((numeric(&map, "avg_medications_per_day") - 3.0).abs() < 1e-12);
        assert!((numeric(&map, "procedure_to_lab_ratio") - 0.05).abs() < 1e-12);
    }

    #[test]
    fn derives_medication_summaries() {
        let map = transform(&sample_record());
        assert_eq!(numeric(&map, "num_medications_used"), 3.0);
        assert_eq!(numeric(&map, "num_adjusted_medications"), 2.0);
        assert_eq!(numeric(&map, "any_medication_change"), 1.0);
        assert_eq!(numeric(&map, "on_insulin"), 1.0);
    }

    #[test]
    fn keeps_original_attributes_and_drops_missing() {
        let record = sample_record();
        let map = transform(&record);
        assert_eq!(
            map.get("race"),
            Some(&FeatureValue::Categorical("caucasian".into()))
        );
        assert_eq!(map.get("num_medications"), Some(&FeatureValue::Numeric(12.0)));
        assert!(map.get("diag_3").is_none());
        // 13 present originals + 8 derived.
        assert_eq!(map.len(), 13 + DERIVED_FEATURES.len());
    }

    #[test]
    fn empty_record_yields_zeroed_derivations() {
        let map = transform(&Record::default());
        assert_eq!(map.len(), DERIVED_FEATURES.len());
        for name in DERIVED_FEATURES {
            assert_eq!(numeric(&map, name), 0.0, "{name}");
        }
    }

    #[test]
    fn missing_marker_is_not_a_prescription() {
        let record: Record = [("insulin", RawValue::Text(MISSING_MARKER.into()))]
            .into_iter()
            .collect();
        let map = transform(&record);
        assert_eq!(numeric(&map, "on_insulin"), 0.0);
        assert_eq!(numeric(&map, "num_medications_used"), 0.0);
    }

    #[test]
    fn transform_is_deterministic() {
        let record = sample_record();
        assert_eq!(transform(&record), transform(&record));
    }
}
