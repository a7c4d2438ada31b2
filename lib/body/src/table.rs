//! Decision table from banded ratios to a shape label.
//!
//! The table is data: 27 rows per gender, one per combination of
//! (shoulder/hips, bust/waist, waist/hips) bands. Construction checks that
//! every combination appears exactly once and only the gender's labels are
//! used, so classification is total.

use crate::bands::{Band, BandKey};
use crate::{ShapeLabel, TableError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use stylist_core::Gender;

use Band::{Balanced as Bal, DenominatorDominant as Den, NumeratorDominant as Num};
use ShapeLabel::{Apple, Hourglass, InvertedTriangle, Oval, Pear, Rectangle, Trapezoid, Triangle};

/// One table row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub shoulder_hips: Band,
    pub bust_waist: Band,
    pub waist_hips: Band,
    pub label: ShapeLabel,
}

impl TableRow {
    pub const fn new(shoulder_hips: Band, bust_waist: Band, waist_hips: Band, label: ShapeLabel) -> Self {
        Self {
            shoulder_hips,
            bust_waist,
            waist_hips,
            label,
        }
    }

    pub fn key(&self) -> BandKey {
        (self.shoulder_hips, self.bust_waist, self.waist_hips)
    }
}

const fn row(s: Band, b: Band, w: Band, label: ShapeLabel) -> TableRow {
    TableRow::new(s, b, w, label)
}

/// A thick waist or a bust narrower than the waist reads as Apple; then
/// shoulders against hips decide; a balanced frame with a defined waist is
/// an Hourglass.
pub const FEMALE_ROWS: [TableRow; 27] = [
    row(Num, Num, Num, Apple),
    row(Num, Num, Bal, InvertedTriangle),
    row(Num, Num, Den, InvertedTriangle),
    row(Num, Bal, Num, Apple),
    row(Num, Bal, Bal, InvertedTriangle),
    row(Num, Bal, Den, InvertedTriangle),
    row(Num, Den, Num, Apple),
    row(Num, Den, Bal, Apple),
    row(Num, Den, Den, Apple),
    row(Bal, Num, Num, Apple),
    row(Bal, Num, Bal, Rectangle),
    row(Bal, Num, Den, Hourglass),
    row(Bal, Bal, Num, Apple),
    row(Bal, Bal, Bal, Rectangle),
    row(Bal, Bal, Den, Rectangle),
    row(Bal, Den, Num, Apple),
    row(Bal, Den, Bal, Apple),
    row(Bal, Den, Den, Apple),
    row(Den, Num, Num, Apple),
    row(Den, Num, Bal, Pear),
    row(Den, Num, Den, Pear),
    row(Den, Bal, Num, Apple),
    row(Den, Bal, Bal, Pear),
    row(Den, Bal, Den, Pear),
    row(Den, Den, Num, Apple),
    row(Den, Den, Bal, Apple),
    row(Den, Den, Den, Apple),
];

/// Waist wider than chest or hips reads as Oval; broad shoulders give
/// Inverted Triangle (with a dominant chest) or Trapezoid; narrow shoulders
/// give Triangle.
pub const MALE_ROWS: [TableRow; 27] = [
    row(Num, Num, Num, Oval),
    row(Num, Num, Bal, InvertedTriangle),
    row(Num, Num, Den, InvertedTriangle),
    row(Num, Bal, Num, Oval),
    row(Num, Bal, Bal, Trapezoid),
    row(Num, Bal, Den, Trapezoid),
    row(Num, Den, Num, Oval),
    row(Num, Den, Bal, Oval),
    row(Num, Den, Den, Oval),
    row(Bal, Num, Num, Oval),
    row(Bal, Num, Bal, Trapezoid),
    row(Bal, Num, Den, Trapezoid),
    row(Bal, Bal, Num, Oval),
    row(Bal, Bal, Bal, Rectangle),
    row(Bal, Bal, Den, Rectangle),
    row(Bal, Den, Num, Oval),
    row(Bal, Den, Bal, Oval),
    row(Bal, Den, Den, Oval),
    row(Den, Num, Num, Oval),
    row(Den, Num, Bal, Triangle),
    row(Den, Num, Den, Triangle),
    row(Den, Bal, Num, Oval),
    row(Den, Bal, Bal, Triangle),
    row(Den, Bal, Den, Triangle),
    row(Den, Den, Num, Oval),
    row(Den, Den, Bal, Oval),
    row(Den, Den, Den, Oval),
];

fn slot(key: BandKey) -> usize {
    key.0.ordinal() * 9 + key.1.ordinal() * 3 + key.2.ordinal()
}

fn describe(key: BandKey) -> String {
    format!("{:?}/{:?}/{:?}", key.0, key.1, key.2)
}

/// Validated, dense decision table for one gender
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTable {
    gender: Gender,
    labels: [ShapeLabel; 27],
}

impl DecisionTable {
    pub fn builtin(gender: Gender) -> Self {
        let rows: &[TableRow] = match gender {
            Gender::Female => &FEMALE_ROWS,
            Gender::Male => &MALE_ROWS,
        };
        Self {
            gender,
            labels: std::array::from_fn(|i| rows[i].label),
        }
    }

    /// Build from rows in any order
    pub fn from_rows(gender: Gender, rows: &[TableRow]) -> Result<Self, TableError> {
        let mut slots: [Option<ShapeLabel>; 27] = [None; 27];
        for row in rows {
            if !row.label.allowed_for(gender) {
                return Err(TableError::LabelNotAllowed {
                    gender,
                    label: row.label,
                });
            }
            let entry = &mut slots[slot(row.key())];
            if entry.is_some() {
                return Err(TableError::DuplicateCombination {
                    gender,
                    combination: describe(row.key()),
                });
            }
            *entry = Some(row.label);
        }

        let mut labels = [ShapeLabel::Rectangle; 27];
        for key in all_keys() {
            labels[slot(key)] = slots[slot(key)].ok_or_else(|| TableError::MissingCombination {
                gender,
                combination: describe(key),
            })?;
        }
        Ok(Self { gender, labels })
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn lookup(&self, key: BandKey) -> ShapeLabel {
        self.labels[slot(key)]
    }

    /// Every label some combination maps to
    pub fn reachable_labels(&self) -> BTreeSet<ShapeLabel> {
        self.labels.iter().copied().collect()
    }

    pub fn rows(&self) -> Vec<TableRow> {
        all_keys()
            .map(|key| TableRow::new(key.0, key.1, key.2, self.lookup(key)))
            .collect()
    }
}

/// All 27 band combinations in table order
pub fn all_keys() -> impl Iterator<Item = BandKey> {
    Band::ALL.into_iter().flat_map(|s| {
        Band::ALL
            .into_iter()
            .flat_map(move |b| Band::ALL.into_iter().map(move |w| (s, b, w)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rows_in_slot_order() {
        for (rows, gender) in [(&FEMALE_ROWS, Gender::Female), (&MALE_ROWS, Gender::Male)] {
            for (i, row) in rows.iter().enumerate() {
                assert_eq!(slot(row.key()), i);
            }
            let validated = DecisionTable::from_rows(gender, rows).unwrap();
            assert_eq!(validated, DecisionTable::builtin(gender));
        }
    }

    #[test]
    fn test_exhaustive_over_27_combinations() {
        for gender in Gender::ALL {
            let table = DecisionTable::builtin(gender);
            let keys: Vec<BandKey> = all_keys().collect();
            assert_eq!(keys.len(), 27);
            for key in keys {
                assert!(table.lookup(key).allowed_for(gender));
            }
            let reachable: Vec<ShapeLabel> = table.reachable_labels().into_iter().collect();
            let mut expected = ShapeLabel::labels_for(gender).to_vec();
            expected.sort();
            assert_eq!(reachable, expected);
        }
    }

    #[test]
    fn test_missing_and_duplicate_rows() {
        let short = &FEMALE_ROWS[..26];
        assert!(matches!(
            DecisionTable::from_rows(Gender::Female, short),
            Err(TableError::MissingCombination { .. })
        ));

        let mut doubled = FEMALE_ROWS.to_vec();
        doubled.push(FEMALE_ROWS[0]);
        assert!(matches!(
            DecisionTable::from_rows(Gender::Female, &doubled),
            Err(TableError::DuplicateCombination { .. })
        ));
    }

    #[test]
    fn test_foreign_label_rejected() {
        assert!(matches!(
            DecisionTable::from_rows(Gender::Male, &FEMALE_ROWS),
            Err(TableError::LabelNotAllowed { .. })
        ));
    }

    #[test]
    fn test_rows_round_trip() {
        let table = DecisionTable::builtin(Gender::Male);
        assert_eq!(DecisionTable::from_rows(Gender::Male, &table.rows()).unwrap(), table);
    }
}
