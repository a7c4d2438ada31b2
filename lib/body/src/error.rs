use crate::ShapeLabel;
use stylist_core::Gender;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("Invalid measurements: {0}")]
    InvalidMeasurements(String),
}

/// Classifier configuration that fails validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Band '{name}' for {gender} needs 0 < lower <= upper, got [{lower}, {upper}]")]
    InvalidBand {
        gender: Gender,
        name: &'static str,
        lower: f64,
        upper: f64,
    },

    #[error("Decision table for {gender} has no row for {combination}")]
    MissingCombination { gender: Gender, combination: String },

    #[error("Decision table for {gender} maps {combination} more than once")]
    DuplicateCombination { gender: Gender, combination: String },

    #[error("Label {label} is not a {gender} shape")]
    LabelNotAllowed { gender: Gender, label: ShapeLabel },
}

#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("No advice for {label} ({gender})")]
    UnknownShape { gender: Gender, label: ShapeLabel },

    #[error("Advice table does not cover: {0}")]
    Coverage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid advice row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}
