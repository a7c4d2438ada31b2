//! Body shape classification and style advice.
//!
//! Measurements become three ratios, each ratio is banded against a
//! per-gender `[lower, upper]` range, and the three bands index a 27-entry
//! [`DecisionTable`]. The resulting [`ShapeLabel`] keys an [`AdviceTable`].
//!
//! ```rust
//! use stylist_body::{AdviceTable, BodyMeasurements, BodyShapeClassifier, ShapeLabel};
//! use stylist_core::Gender;
//!
//! let classifier = BodyShapeClassifier::default();
//! let m = BodyMeasurements::new(Gender::Female, 40.0, 36.0, 28.0, 40.0);
//! let shape = classifier.classify(&m).unwrap();
//! assert_eq!(shape, ShapeLabel::Hourglass);
//!
//! let advice = AdviceTable::builtin();
//! assert!(!advice.lookup(shape, Gender::Female).unwrap().do_list.is_empty());
//! ```

pub mod advice;
pub mod bands;
pub mod classifier;
pub mod error;
pub mod measurements;
pub mod shape;
pub mod table;

pub use advice::{AdviceRecord, AdviceTable};
pub use bands::{Band, BandKey, GenderBands, RatioBand};
pub use classifier::{BodyShapeClassifier, Classification, ClassifierConfig};
pub use error::{AdviceError, ClassifyError, TableError};
pub use measurements::{BodyMeasurements, Ratios};
pub use shape::ShapeLabel;
pub use stylist_core::Gender;
pub use table::{DecisionTable, TableRow};
