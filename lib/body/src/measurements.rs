use crate::ClassifyError;
use serde::{Deserialize, Serialize};
use stylist_core::Gender;

/// Body measurements in one consistent unit.
///
/// `bust_or_chest` is bust for women and chest for men. Every field is
/// required; a missing field is reported, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurements {
    pub gender: Gender,
    #[serde(default)]
    pub shoulder: Option<f64>,
    #[serde(default, alias = "bust", alias = "chest")]
    pub bust_or_chest: Option<f64>,
    #[serde(default)]
    pub waist: Option<f64>,
    #[serde(default)]
    pub hips: Option<f64>,
}

/// The three ratios the decision table is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    pub shoulder_hips: f64,
    pub bust_waist: f64,
    pub waist_hips: f64,
}

fn required(value: Option<f64>, name: &str) -> Result<f64, ClassifyError> {
    match value {
        None => Err(ClassifyError::InvalidMeasurements(format!("{name} is missing"))),
        Some(v) if !v.is_finite() || v <= 0.0 => Err(ClassifyError::InvalidMeasurements(format!(
            "{name} must be a positive number, got {v}"
        ))),
        Some(v) => Ok(v),
    }
}

impl BodyMeasurements {
    pub fn new(gender: Gender, shoulder: f64, bust_or_chest: f64, waist: f64, hips: f64) -> Self {
        Self {
            gender,
            shoulder: Some(shoulder),
            bust_or_chest: Some(bust_or_chest),
            waist: Some(waist),
            hips: Some(hips),
        }
    }

    /// Validate every field and compute the ratios
    pub fn ratios(&self) -> Result<Ratios, ClassifyError> {
        let bust_name = match self.gender {
            Gender::Female => "bust",
            Gender::Male => "chest",
        };
        let shoulder = required(self.shoulder, "shoulder")?;
        let bust = required(self.bust_or_chest, bust_name)?;
        let waist = required(self.waist, "waist")?;
        let hips = required(self.hips, "hips")?;

        Ok(Ratios {
            shoulder_hips: shoulder / hips,
            bust_waist: bust / waist,
            waist_hips: waist / hips,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios() {
        let r = BodyMeasurements::new(Gender::Female, 40.0, 36.0, 28.0, 40.0)
            .ratios()
            .unwrap();
        assert_eq!(r.shoulder_hips, 1.0);
        assert!((r.bust_waist - 36.0 / 28.0).abs() < 1e-12);
        assert_eq!(r.waist_hips, 0.7);
    }

    #[test]
    fn test_invalid_fields() {
        for gender in Gender::ALL {
            let base = BodyMeasurements::new(gender, 40.0, 36.0, 28.0, 40.0);
            for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
                let mut m = base;
                m.waist = Some(bad);
                assert!(matches!(m.ratios(), Err(ClassifyError::InvalidMeasurements(_))));
            }
            let mut missing = base;
            missing.shoulder = None;
            assert!(missing.ratios().is_err());
        }
    }

    #[test]
    fn test_deserialize_alias() {
        let m: BodyMeasurements =
            serde_json::from_str(r#"{"gender":"male","shoulder":46,"chest":100,"waist":84,"hips":96}"#).unwrap();
        assert_eq!(m.bust_or_chest, Some(100.0));

        let partial: BodyMeasurements = serde_json::from_str(r#"{"gender":"female","waist":70}"#).unwrap();
        assert!(partial.ratios().is_err());
    }
}
