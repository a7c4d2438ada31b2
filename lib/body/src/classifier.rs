use crate::bands::{BandKey, GenderBands};
use crate::table::{DecisionTable, TableRow};
use crate::{BodyMeasurements, ClassifyError, Ratios, ShapeLabel, TableError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use stylist_core::Gender;
use tracing::debug;

/// Bands per gender and optional replacement decision tables.
///
/// The bands and the 27 rows of each table are configurable. The label set
/// each gender may emit is fixed by [`ShapeLabel::labels_for`]; a replacement
/// table using any other label is rejected with
/// [`TableError::LabelNotAllowed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub female: GenderBands,
    pub male: GenderBands,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub female_table: Option<Vec<TableRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub male_table: Option<Vec<TableRow>>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            female: GenderBands::FEMALE,
            male: GenderBands::MALE,
            female_table: None,
            male_table: None,
        }
    }
}

/// Full classification output, for callers that want to show their work
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub gender: Gender,
    pub label: ShapeLabel,
    pub ratios: Ratios,
    pub bands: BandKey,
}

/// Pure, deterministic measurements -> shape label
#[derive(Debug, Clone)]
pub struct BodyShapeClassifier {
    female_bands: GenderBands,
    male_bands: GenderBands,
    female: DecisionTable,
    male: DecisionTable,
}

impl Default for BodyShapeClassifier {
    fn default() -> Self {
        Self {
            female_bands: GenderBands::FEMALE,
            male_bands: GenderBands::MALE,
            female: DecisionTable::builtin(Gender::Female),
            male: DecisionTable::builtin(Gender::Male),
        }
    }
}

impl BodyShapeClassifier {
    /// Validates bands and tables; nothing is classified with a broken table
    pub fn new(config: &ClassifierConfig) -> Result<Self, TableError> {
        config.female.validate(Gender::Female)?;
        config.male.validate(Gender::Male)?;

        let table = |gender: Gender, rows: &Option<Vec<TableRow>>| match rows {
            Some(rows) => DecisionTable::from_rows(gender, rows),
            None => Ok(DecisionTable::builtin(gender)),
        };

        Ok(Self {
            female_bands: config.female,
            male_bands: config.male,
            female: table(Gender::Female, &config.female_table)?,
            male: table(Gender::Male, &config.male_table)?,
        })
    }

    pub fn bands(&self, gender: Gender) -> &GenderBands {
        match gender {
            Gender::Female => &self.female_bands,
            Gender::Male => &self.male_bands,
        }
    }

    pub fn table(&self, gender: Gender) -> &DecisionTable {
        match gender {
            Gender::Female => &self.female,
            Gender::Male => &self.male,
        }
    }

    pub fn classify(&self, measurements: &BodyMeasurements) -> Result<ShapeLabel, ClassifyError> {
        self.classify_detailed(measurements).map(|c| c.label)
    }

    pub fn classify_detailed(&self, measurements: &BodyMeasurements) -> Result<Classification, ClassifyError> {
        let gender = measurements.gender;
        let ratios = measurements.ratios()?;
        let bands = self.bands(gender).classify(&ratios);
        let label = self.table(gender).lookup(bands);

        debug!(%gender, ?ratios, ?bands, %label, "Classified body shape");
        Ok(Classification {
            gender,
            label,
            ratios,
            bands,
        })
    }

    /// Labels `classify` can return for `gender`
    pub fn reachable_labels(&self, gender: Gender) -> BTreeSet<ShapeLabel> {
        self.table(gender).reachable_labels()
    }
}
