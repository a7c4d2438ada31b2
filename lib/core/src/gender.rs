use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Customer gender as used for measurements, hints and catalog filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Accepts the spellings found in customer and catalog tables:
    /// "male", "Men", "men's", "M", "female", "Women", "W", ...
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        let lower = lower.trim_end_matches("'s").trim_end_matches('\'');
        match lower {
            "male" | "men" | "man" | "m" | "mens" => Some(Gender::Male),
            "female" | "women" | "woman" | "f" | "w" | "womens" => Some(Gender::Female),
            _ => None,
        }
    }

    /// Word prepended to free-text queries as a soft hint
    pub fn query_hint(self) -> &'static str {
        match self {
            Gender::Male => "Men",
            Gender::Female => "Women",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Gender::parse_loose(s).ok_or_else(|| format!("unrecognised gender '{s}'"))
    }
}
