use serde::{Deserialize, Serialize};
use stylist_core::Gender;

/// Who a product is cut for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderOrientation {
    Men,
    Women,
    Unisex,
}

impl GenderOrientation {
    pub fn parse_loose(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("unisex") {
            return Some(GenderOrientation::Unisex);
        }
        Gender::parse_loose(raw).map(|g| match g {
            Gender::Male => GenderOrientation::Men,
            Gender::Female => GenderOrientation::Women,
        })
    }

    /// Unisex items suit everyone
    pub fn suits(self, gender: Gender) -> bool {
        matches!(
            (self, gender),
            (GenderOrientation::Unisex, _)
                | (GenderOrientation::Men, Gender::Male)
                | (GenderOrientation::Women, Gender::Female)
        )
    }
}

/// A catalog product.
///
/// Records are validated on ingestion: price is finite and non-negative,
/// `discount_pct` lies in `[0, 100]` and name and description are non-blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub discount_pct: f64,
    pub description: String,
    pub image_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<GenderOrientation>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub trending_score: f64,
}

impl Product {
    /// Minimal product with the required fields, for programmatic catalogs
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            brand: String::new(),
            category: category.into(),
            price,
            discount_pct: 0.0,
            description: description.into(),
            image_ref: String::new(),
            gender: None,
            rating: 0.0,
            reviews: 0,
            trending_score: 0.0,
        }
    }

    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    #[must_use]
    pub fn with_discount(mut self, discount_pct: f64) -> Self {
        self.discount_pct = discount_pct;
        self
    }

    #[must_use]
    pub fn with_gender(mut self, gender: GenderOrientation) -> Self {
        self.gender = Some(gender);
        self
    }

    #[must_use]
    pub fn with_popularity(mut self, rating: f64, reviews: u32, trending_score: f64) -> Self {
        self.rating = rating;
        self.reviews = reviews;
        self.trending_score = trending_score;
        self
    }

    #[must_use]
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }

    #[inline]
    pub fn discount_fraction(&self) -> f64 {
        self.discount_pct / 100.0
    }

    /// Weighted trend signal: 0.6 rating + 0.2 review count + 0.2 trending score
    pub fn trend_score(&self) -> f64 {
        0.6 * self.rating + 0.2 * f64::from(self.reviews) + 0.2 * self.trending_score
    }

    /// Products without an orientation are treated as unisex
    pub fn suits(&self, gender: Gender) -> bool {
        self.gender.map_or(true, |o| o.suits(gender))
    }

    /// Field-level checks shared by CSV ingestion and programmatic catalogs
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id is blank".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name is blank".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description is blank".to_string());
        }
        // the embedder tokenizes on alphanumeric runs
        if !has_words(&self.description) {
            return Err(format!("description '{}' has no words", self.description.trim()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("price {} is not a non-negative number", self.price));
        }
        if !(0.0..=100.0).contains(&self.discount_pct) {
            return Err(format!("discount_pct {} outside [0, 100]", self.discount_pct));
        }
        if !self.rating.is_finite() || self.rating < 0.0 {
            return Err(format!("rating {} is negative or not finite", self.rating));
        }
        if !self.trending_score.is_finite() || self.trending_score < 0.0 {
            return Err(format!(
                "trending_score {} is negative or not finite",
                self.trending_score
            ));
        }
        Ok(())
    }
}

/// True when `text` contains at least one letter or digit
pub fn has_words(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}
