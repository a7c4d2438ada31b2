// Ratio banding: each ratio is compared against a configurable [lower, upper]
use crate::{Ratios, TableError};
use serde::{Deserialize, Serialize};
use stylist_core::Gender;

/// Where a numerator/denominator ratio falls relative to its band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// Above the upper bound
    NumeratorDominant,
    Balanced,
    /// Below the lower bound
    DenominatorDominant,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::NumeratorDominant, Band::Balanced, Band::DenominatorDominant];

    pub(crate) fn ordinal(self) -> usize {
        match self {
            Band::NumeratorDominant => 0,
            Band::Balanced => 1,
            Band::DenominatorDominant => 2,
        }
    }
}

/// Inclusive `[lower, upper]` range counted as balanced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBand {
    pub lower: f64,
    pub upper: f64,
}

impl RatioBand {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn classify(&self, ratio: f64) -> Band {
        if ratio > self.upper {
            Band::NumeratorDominant
        } else if ratio < self.lower {
            Band::DenominatorDominant
        } else {
            Band::Balanced
        }
    }

    fn validate(&self, gender: Gender, name: &'static str) -> Result<(), TableError> {
        let ok = self.lower.is_finite() && self.upper.is_finite() && self.lower > 0.0 && self.lower <= self.upper;
        if ok {
            Ok(())
        } else {
            Err(TableError::InvalidBand {
                gender,
                name,
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

/// Bands for one gender's three ratios
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderBands {
    pub shoulder_hips: RatioBand,
    /// Bust/waist for women, chest/waist for men
    pub bust_waist: RatioBand,
    pub waist_hips: RatioBand,
}

/// Banded ratios: the decision table key
pub type BandKey = (Band, Band, Band);

impl GenderBands {
    pub const FEMALE: GenderBands = GenderBands {
        shoulder_hips: RatioBand::new(0.95, 1.05),
        bust_waist: RatioBand::new(0.95, 1.25),
        waist_hips: RatioBand::new(0.80, 1.05),
    };

    pub const MALE: GenderBands = GenderBands {
        shoulder_hips: RatioBand::new(0.95, 1.05),
        bust_waist: RatioBand::new(0.95, 1.10),
        waist_hips: RatioBand::new(0.90, 1.05),
    };

    pub fn classify(&self, ratios: &Ratios) -> BandKey {
        (
            self.shoulder_hips.classify(ratios.shoulder_hips),
            self.bust_waist.classify(ratios.bust_waist),
            self.waist_hips.classify(ratios.waist_hips),
        )
    }

    pub fn validate(&self, gender: Gender) -> Result<(), TableError> {
        self.shoulder_hips.validate(gender, "shoulder_hips")?;
        self.bust_waist.validate(gender, "bust_waist")?;
        self.waist_hips.validate(gender, "waist_hips")
    }
}
