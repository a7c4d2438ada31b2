use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stylist_core::Gender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeLabel {
    Hourglass,
    Pear,
    Apple,
    Rectangle,
    InvertedTriangle,
    Triangle,
    Oval,
    Trapezoid,
}

/// Labels a female decision table may use. Fixed; only the table rows that
/// choose among them are configurable.
pub const FEMALE_SHAPES: &[ShapeLabel] = &[
    ShapeLabel::Hourglass,
    ShapeLabel::Pear,
    ShapeLabel::Apple,
    ShapeLabel::Rectangle,
    ShapeLabel::InvertedTriangle,
];

pub const MALE_SHAPES: &[ShapeLabel] = &[
    ShapeLabel::Rectangle,
    ShapeLabel::Triangle,
    ShapeLabel::InvertedTriangle,
    ShapeLabel::Oval,
    ShapeLabel::Trapezoid,
];

impl ShapeLabel {
    /// Labels a classifier may emit for `gender`
    pub fn labels_for(gender: Gender) -> &'static [ShapeLabel] {
        match gender {
            Gender::Female => FEMALE_SHAPES,
            Gender::Male => MALE_SHAPES,
        }
    }

    pub fn allowed_for(self, gender: Gender) -> bool {
        Self::labels_for(gender).contains(&self)
    }

    /// Accepts "Inverted Triangle", "inverted_triangle", "InvertedTriangle"
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "hourglass" => Some(ShapeLabel::Hourglass),
            "pear" => Some(ShapeLabel::Pear),
            "apple" => Some(ShapeLabel::Apple),
            "rectangle" => Some(ShapeLabel::Rectangle),
            "invertedtriangle" => Some(ShapeLabel::InvertedTriangle),
            "triangle" => Some(ShapeLabel::Triangle),
            "oval" => Some(ShapeLabel::Oval),
            "trapezoid" => Some(ShapeLabel::Trapezoid),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeLabel::Hourglass => "Hourglass",
            ShapeLabel::Pear => "Pear",
            ShapeLabel::Apple => "Apple",
            ShapeLabel::Rectangle => "Rectangle",
            ShapeLabel::InvertedTriangle => "Inverted Triangle",
            ShapeLabel::Triangle => "Triangle",
            ShapeLabel::Oval => "Oval",
            ShapeLabel::Trapezoid => "Trapezoid",
        }
    }
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_loose(s).ok_or_else(|| format!("unknown body shape '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loose() {
        assert_eq!(ShapeLabel::parse_loose("Inverted Triangle"), Some(ShapeLabel::InvertedTriangle));
        assert_eq!(ShapeLabel::parse_loose("inverted_triangle"), Some(ShapeLabel::InvertedTriangle));
        assert_eq!("OVAL".parse::<ShapeLabel>(), Ok(ShapeLabel::Oval));
        assert!(ShapeLabel::parse_loose("banana").is_none());
    }

    #[test]
    fn test_label_sets() {
        assert!(ShapeLabel::Hourglass.allowed_for(Gender::Female));
        assert!(!ShapeLabel::Hourglass.allowed_for(Gender::Male));
        assert!(ShapeLabel::InvertedTriangle.allowed_for(Gender::Male));
        assert_eq!(FEMALE_SHAPES.len() + MALE_SHAPES.len(), 10);
    }
}
