// Structured product filters applied after vector search
use crate::Product;
use serde::{Deserialize, Serialize};
use stylist_core::Gender;

pub trait Filter {
    fn matches(&self, product: &Product) -> bool;
}

/// Price range, category and gender restrictions for one query.
/// Every bound is optional; an empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    /// Inclusive lower price bound
    pub min_price: Option<f64>,
    /// Inclusive upper price bound
    pub max_price: Option<f64>,
    /// Case-insensitive category match
    pub category: Option<String>,
    /// Keep products suited to this gender (unisex always passes)
    pub gender: Option<Gender>,
}

impl ProductFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.category.is_none()
            && self.gender.is_none()
    }
}

impl Filter for ProductFilter {
    fn matches(&self, product: &Product) -> bool {
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if let Some(category) = &self.category {
            if !product.category.trim().eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }
        if let Some(gender) = self.gender {
            if !product.suits(gender) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenderOrientation;

    fn shoe(price: f64) -> Product {
        Product::new("s1", "Runner", "Shoes", price, "running shoe")
            .with_gender(GenderOrientation::Women)
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = ProductFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&shoe(10.0)));
    }

    #[test]
    fn test_price_bounds_inclusive() {
        let filter = ProductFilter::new().price_range(Some(10.0), Some(20.0));
        assert!(filter.matches(&shoe(10.0)));
        assert!(filter.matches(&shoe(20.0)));
        assert!(!filter.matches(&shoe(20.01)));
        assert!(!filter.matches(&shoe(9.99)));
    }

    #[test]
    fn test_category_case_insensitive() {
        assert!(ProductFilter::new().category("shoes").matches(&shoe(1.0)));
        assert!(!ProductFilter::new().category("shirts").matches(&shoe(1.0)));
    }

    #[test]
    fn test_gender() {
        assert!(ProductFilter::new().gender(Gender::Female).matches(&shoe(1.0)));
        assert!(!ProductFilter::new().gender(Gender::Male).matches(&shoe(1.0)));

        let unlabelled = Product::new("u", "Cap", "hats", 5.0, "cap");
        assert!(ProductFilter::new().gender(Gender::Male).matches(&unlabelled));
    }
}
