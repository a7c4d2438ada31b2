//! Static style advice keyed by (gender, shape)

use crate::{AdviceError, BodyShapeClassifier, ShapeLabel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use stylist_core::Gender;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceRecord {
    pub gender: Gender,
    pub shape: ShapeLabel,
    pub do_list: Vec<String>,
    pub avoid_list: Vec<String>,
}

impl AdviceRecord {
    /// Text query built from the recommended items, for "shop the look"
    pub fn search_query(&self) -> String {
        self.do_list.join(" ")
    }
}

const BUILTIN: &[(Gender, ShapeLabel, &[&str], &[&str])] = &[
    (
        Gender::Female,
        ShapeLabel::Hourglass,
        &["wrap dress", "high-waisted skirt", "belted blazer", "bodycon dress"],
        &["boxy tops", "shapeless tunics", "drop-waist dresses"],
    ),
    (
        Gender::Female,
        ShapeLabel::Pear,
        &["a-line skirt", "boat neck top", "statement necklace", "structured jacket"],
        &["skinny jeans with tight tops", "hip pockets", "tapered trousers"],
    ),
    (
        Gender::Female,
        ShapeLabel::Apple,
        &["v-neck top", "flowy tunic", "straight-leg pants", "empire waist dress"],
        &["tight belts at the waist", "clingy knits", "cropped tops"],
    ),
    (
        Gender::Female,
        ShapeLabel::Rectangle,
        &["peplum top", "ruffled blouse", "a-line dress", "belted coat"],
        &["straight shift dresses", "oversized boxy shirts"],
    ),
    (
        Gender::Female,
        ShapeLabel::InvertedTriangle,
        &["wide-leg pants", "full skirt", "v-neck top", "bright bottoms"],
        &["shoulder pads", "puff sleeves", "boat necklines"],
    ),
    (
        Gender::Male,
        ShapeLabel::Rectangle,
        &["layered jacket", "textured shirt", "chinos", "crew neck sweater"],
        &["baggy oversized shirts", "very skinny trousers"],
    ),
    (
        Gender::Male,
        ShapeLabel::Triangle,
        &["structured blazer", "horizontal stripe shirt", "straight-leg trousers", "padded jacket"],
        &["tight t-shirts", "low-rise trousers", "tapered cargo pants"],
    ),
    (
        Gender::Male,
        ShapeLabel::InvertedTriangle,
        &["straight-leg jeans", "v-neck t-shirt", "relaxed chinos", "bomber jacket"],
        &["shoulder-padded blazers", "skinny jeans", "muscle fit shirts"],
    ),
    (
        Gender::Male,
        ShapeLabel::Oval,
        &["dark single-breasted blazer", "vertical stripe shirt", "straight-leg trousers", "open collar shirt"],
        &["tight polo shirts", "wide belts", "double-breasted jackets"],
    ),
    (
        Gender::Male,
        ShapeLabel::Trapezoid,
        &["slim fit shirt", "fitted polo", "tailored trousers", "crew neck t-shirt"],
        &["baggy hoodies", "boxy jackets"],
    ),
];

#[derive(Debug, Deserialize)]
struct AdviceRow {
    gender: String,
    shape: String,
    #[serde(rename = "do")]
    do_items: String,
    avoid: String,
}

fn split_items(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Immutable advice lookup table
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceTable {
    records: BTreeMap<(Gender, ShapeLabel), AdviceRecord>,
}

impl Default for AdviceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AdviceTable {
    /// Default advice covering every label the default classifier can emit
    pub fn builtin() -> Self {
        let records = BUILTIN
            .iter()
            .map(|(gender, shape, do_list, avoid_list)| {
                let record = AdviceRecord {
                    gender: *gender,
                    shape: *shape,
                    do_list: do_list.iter().map(|s| s.to_string()).collect(),
                    avoid_list: avoid_list.iter().map(|s| s.to_string()).collect(),
                };
                ((*gender, *shape), record)
            })
            .collect();
        Self { records }
    }

    pub fn from_records(records: impl IntoIterator<Item = AdviceRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| ((r.gender, r.shape), r)).collect(),
        }
    }

    /// Load `gender,shape,do,avoid` rows; list items are separated by `;`.
    /// Unlike catalog rows, a bad advice row fails the load.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, AdviceError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = BTreeMap::new();

        for (row, result) in rdr.deserialize::<AdviceRow>().enumerate() {
            let line = row as u64 + 2;
            let raw = result?;
            let gender = Gender::parse_loose(&raw.gender).ok_or_else(|| AdviceError::InvalidRow {
                line,
                reason: format!("unknown gender '{}'", raw.gender),
            })?;
            let shape = ShapeLabel::parse_loose(&raw.shape).ok_or_else(|| AdviceError::InvalidRow {
                line,
                reason: format!("unknown shape '{}'", raw.shape),
            })?;
            if !shape.allowed_for(gender) {
                return Err(AdviceError::InvalidRow {
                    line,
                    reason: format!("{shape} is not a {gender} shape"),
                });
            }
            let do_list = split_items(&raw.do_items);
            if do_list.is_empty() {
                return Err(AdviceError::InvalidRow {
                    line,
                    reason: "empty do list".to_string(),
                });
            }
            let record = AdviceRecord {
                gender,
                shape,
                do_list,
                avoid_list: split_items(&raw.avoid),
            };
            if records.insert((gender, shape), record).is_some() {
                return Err(AdviceError::InvalidRow {
                    line,
                    reason: format!("duplicate entry for {shape} ({gender})"),
                });
            }
        }

        info!(records = records.len(), "Loaded advice table");
        Ok(Self { records })
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, AdviceError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    pub fn lookup(&self, shape: ShapeLabel, gender: Gender) -> Result<&AdviceRecord, AdviceError> {
        self.records.get(&(gender, shape)).ok_or_else(|| {
            error!(%shape, %gender, "Advice table has no entry for a classifier label");
            AdviceError::UnknownShape { gender, label: shape }
        })
    }

    /// Every label the classifier can emit must have advice
    pub fn verify_covers(&self, classifier: &BodyShapeClassifier) -> Result<(), AdviceError> {
        let missing: Vec<String> = Gender::ALL
            .into_iter()
            .flat_map(|gender| {
                classifier
                    .reachable_labels(gender)
                    .into_iter()
                    .filter(move |label| !self.records.contains_key(&(gender, *label)))
                    .map(move |label| format!("{label} ({gender})"))
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            let joined = missing.join(", ");
            error!(missing = %joined, "Advice table does not cover the classifier");
            Err(AdviceError::Coverage(joined))
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &AdviceRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
