// Customer history tables and the profile derived from them

use crate::ingest::{self, QuarantinedRow};
use crate::{Catalog, IngestError};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use stylist_core::Gender;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Purchase,
    CartAbandon,
    WishlistAdd,
    WishlistRemove,
    Search,
    Click,
}

impl EventKind {
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "purchase" | "order" | "buy" => Some(EventKind::Purchase),
            "cart_abandon" | "abandoned_cart" | "cart" => Some(EventKind::CartAbandon),
            "wishlist_add" | "wishlist" => Some(EventKind::WishlistAdd),
            "wishlist_remove" => Some(EventKind::WishlistRemove),
            "search" | "query" => Some(EventKind::Search),
            "click" | "view" => Some(EventKind::Click),
            _ => None,
        }
    }

    /// Every kind except search refers to a product
    pub fn needs_product(self) -> bool {
        self != EventKind::Search
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Purchase => "purchase",
            EventKind::CartAbandon => "cart_abandon",
            EventKind::WishlistAdd => "wishlist_add",
            EventKind::WishlistRemove => "wishlist_remove",
            EventKind::Search => "search",
            EventKind::Click => "click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerEvent {
    pub customer_id: String,
    pub kind: EventKind,
    pub product_id: Option<String>,
    pub query: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CustomerEvent {
    pub fn product(
        customer_id: impl Into<String>,
        kind: EventKind,
        product_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            kind,
            product_id: Some(product_id.into()),
            query: None,
            timestamp,
        }
    }

    pub fn search(customer_id: impl Into<String>, query: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            customer_id: customer_id.into(),
            kind: EventKind::Search,
            product_id: None,
            query: Some(query.into()),
            timestamp,
        }
    }
}

/// One row of the customers table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub gender: Option<Gender>,
    pub age: Option<u8>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub gender: Option<Gender>,
    pub age_band: Option<String>,
    pub location: Option<String>,
}

fn age_band(age: u8) -> &'static str {
    match age {
        0..=17 => "under-18",
        18..=24 => "18-24",
        25..=34 => "25-34",
        35..=44 => "35-44",
        45..=54 => "45-54",
        _ => "55+",
    }
}

impl From<&CustomerRecord> for Demographics {
    fn from(record: &CustomerRecord) -> Self {
        Self {
            gender: record.gender,
            age_band: record.age.map(|a| age_band(a).to_string()),
            location: record.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub product_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Compact, read-only view of one customer's history.
///
/// `wishlist` and `abandoned_cart` hold each id once, oldest first.
/// `recent_queries` and `recent_clicks` are most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub demographics: Demographics,
    pub wishlist: Vec<String>,
    pub abandoned_cart: Vec<String>,
    pub purchase_history: Vec<Purchase>,
    pub recent_queries: Vec<String>,
    pub recent_clicks: Vec<String>,
    /// Lowercased category -> count over purchases, wishlist and cart
    pub category_affinity: BTreeMap<String, u32>,
    /// Mean discount fraction of purchased items, absent without purchases
    pub price_sensitivity: Option<f64>,
}

impl CustomerProfile {
    pub fn empty(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            ..Self::default()
        }
    }

    pub fn has_history(&self) -> bool {
        !self.purchase_history.is_empty() || !self.wishlist.is_empty() || !self.abandoned_cart.is_empty()
    }

    /// Up to `window` most recent purchases, then wishlist and cart items,
    /// each id once
    pub fn recent_items(&self, window: usize) -> Vec<&str> {
        let purchases = self.purchase_history.iter().rev().map(|p| p.product_id.as_str()).take(window);
        let wishlist = self.wishlist.iter().rev().map(String::as_str).take(window);
        let cart = self.abandoned_cart.iter().rev().map(String::as_str).take(window);

        let mut items: Vec<&str> = Vec::new();
        for id in purchases.chain(wishlist).chain(cart) {
            if !items.contains(&id) {
                items.push(id);
            }
        }
        items
    }

    pub fn is_wishlisted(&self, product_id: &str) -> bool {
        self.wishlist.iter().any(|id| id == product_id)
    }

    pub fn in_abandoned_cart(&self, product_id: &str) -> bool {
        self.abandoned_cart.iter().any(|id| id == product_id)
    }

    pub fn prefers_category(&self, category: &str) -> bool {
        self.category_affinity
            .contains_key(&category.trim().to_ascii_lowercase())
    }

    pub fn gender(&self) -> Option<Gender> {
        self.demographics.gender
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub recent_query_limit: usize,
    pub recent_click_limit: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            recent_query_limit: 7,
            recent_click_limit: 20,
        }
    }
}

/// Builds `CustomerProfile`s from the loaded event and customer tables
#[derive(Debug, Clone, Default)]
pub struct SignalAggregator {
    config: SignalConfig,
    events: AHashMap<String, Vec<CustomerEvent>>,
    customers: AHashMap<String, CustomerRecord>,
    quarantined: Vec<QuarantinedRow>,
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

fn remove(list: &mut Vec<String>, id: &str) {
    list.retain(|existing| existing != id);
}

fn push_recent(list: &mut Vec<String>, value: &str, limit: usize) {
    list.retain(|existing| !existing.eq_ignore_ascii_case(value));
    list.insert(0, value.to_string());
    list.truncate(limit);
}

impl SignalAggregator {
    pub fn new(events: Vec<CustomerEvent>, customers: Vec<CustomerRecord>, config: SignalConfig) -> Self {
        let mut by_customer: AHashMap<String, Vec<CustomerEvent>> = AHashMap::new();
        for event in events {
            by_customer.entry(event.customer_id.clone()).or_default().push(event);
        }
        // stable: equal timestamps keep table order
        for list in by_customer.values_mut() {
            list.sort_by_key(|e| e.timestamp);
        }

        let customers = customers
            .into_iter()
            .map(|c| (c.customer_id.clone(), c))
            .collect();

        Self {
            config,
            events: by_customer,
            customers,
            quarantined: Vec::new(),
        }
    }

    /// Load from CSV tables; the customers table is optional
    pub fn from_csv_readers<E: Read, C: Read>(
        events: E,
        customers: Option<C>,
        config: SignalConfig,
    ) -> Result<Self, IngestError> {
        let event_report = ingest::read_events(events)?;
        let mut quarantined = event_report.quarantined;
        let customer_rows = match customers {
            Some(reader) => {
                let report = ingest::read_customers(reader)?;
                quarantined.extend(report.quarantined);
                report.accepted
            }
            None => Vec::new(),
        };

        let mut aggregator = Self::new(event_report.accepted, customer_rows, config);
        aggregator.quarantined = quarantined;
        Ok(aggregator)
    }

    pub fn quarantined(&self) -> &[QuarantinedRow] {
        &self.quarantined
    }

    pub fn customer_count(&self) -> usize {
        let mut ids: Vec<&String> = self.events.keys().chain(self.customers.keys()).collect();
        ids.sort();
        ids.dedup();
        ids.len()
    }

    /// Replay a customer's events in timestamp order. Unknown customers get
    /// an empty profile.
    pub fn aggregate(&self, customer_id: &str, catalog: &Catalog) -> CustomerProfile {
        let mut profile = CustomerProfile::empty(customer_id);
        if let Some(record) = self.customers.get(customer_id) {
            profile.demographics = Demographics::from(record);
        }

        let Some(events) = self.events.get(customer_id) else {
            return profile;
        };

        for event in events {
            let product_id = event.product_id.as_deref().unwrap_or("");
            match event.kind {
                EventKind::Purchase => {
                    profile.purchase_history.push(Purchase {
                        product_id: product_id.to_string(),
                        timestamp: event.timestamp,
                    });
                    remove(&mut profile.abandoned_cart, product_id);
                }
                EventKind::CartAbandon => push_unique(&mut profile.abandoned_cart, product_id),
                EventKind::WishlistAdd => push_unique(&mut profile.wishlist, product_id),
                EventKind::WishlistRemove => remove(&mut profile.wishlist, product_id),
                EventKind::Search => {
                    if let Some(query) = event.query.as_deref() {
                        push_recent(&mut profile.recent_queries, query, self.config.recent_query_limit);
                    }
                }
                EventKind::Click => {
                    push_recent(&mut profile.recent_clicks, product_id, self.config.recent_click_limit)
                }
            }
        }

        let mut affinity = BTreeMap::new();
        let touched = profile
            .purchase_history
            .iter()
            .map(|p| p.product_id.as_str())
            .chain(profile.wishlist.iter().map(String::as_str))
            .chain(profile.abandoned_cart.iter().map(String::as_str));
        for id in touched {
            if let Some(product) = catalog.get(id) {
                let category = product.category.trim().to_ascii_lowercase();
                if !category.is_empty() {
                    *affinity.entry(category).or_insert(0) += 1;
                }
            }
        }
        profile.category_affinity = affinity;

        let discounts: Vec<f64> = profile
            .purchase_history
            .iter()
            .filter_map(|p| catalog.get(&p.product_id))
            .map(|p| p.discount_fraction())
            .collect();
        if !discounts.is_empty() {
            profile.price_sensitivity = Some(discounts.iter().sum::<f64>() / discounts.len() as f64);
        }

        debug!(
            customer_id,
            events = events.len(),
            purchases = profile.purchase_history.len(),
            wishlist = profile.wishlist.len(),
            "Aggregated customer profile"
        );
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Product;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Product::new("s1", "Runner", "Shoes", 80.0, "running shoe").with_discount(50.0),
            Product::new("s2", "Boot", "Shoes", 120.0, "leather boot"),
            Product::new("t1", "Oxford", "Shirts", 40.0, "oxford shirt"),
        ])
        .unwrap()
    }

    #[test]
    fn test_unknown_customer_is_empty() {
        let aggregator = SignalAggregator::default();
        let profile = aggregator.aggregate("ghost", &catalog());
        assert_eq!(profile, CustomerProfile::empty("ghost"));
        assert!(!profile.has_history());
    }

    #[test]
    fn test_replay_in_timestamp_order() {
        // listed out of order: purchase of s2 happens after the abandon
        let events = vec![
            CustomerEvent::product("c1", EventKind::Purchase, "s2", at(300)),
            CustomerEvent::product("c1", EventKind::CartAbandon, "s2", at(100)),
            CustomerEvent::product("c1", EventKind::Purchase, "s1", at(50)),
            CustomerEvent::product("c1", EventKind::WishlistAdd, "t1", at(200)),
            CustomerEvent::product("c1", EventKind::WishlistAdd, "s2", at(210)),
            CustomerEvent::product("c1", EventKind::WishlistRemove, "s2", at(220)),
        ];
        let aggregator = SignalAggregator::new(events, vec![], SignalConfig::default());
        let profile = aggregator.aggregate("c1", &catalog());

        assert!(profile.abandoned_cart.is_empty());
        assert_eq!(profile.wishlist, vec!["t1".to_string()]);
        assert!(profile.is_wishlisted("t1"));
        assert_eq!(profile.purchase_history.len(), 2);
        assert_eq!(profile.purchase_history[0].product_id, "s1");
        assert_eq!(profile.category_affinity.get("shoes"), Some(&2));
        assert!(profile.prefers_category("SHIRTS"));
        // (0.5 + 0.0) / 2
        assert_eq!(profile.price_sensitivity, Some(0.25));
        assert_eq!(profile.recent_items(1), vec!["s2", "t1"]);
    }

    #[test]
    fn test_recent_queries_capped() {
        let events = (0..10)
            .map(|i| CustomerEvent::search("c1", format!("query {i}"), at(i)))
            .chain(std::iter::once(CustomerEvent::search("c1", "QUERY 3", at(20))))
            .collect();
        let aggregator = SignalAggregator::new(events, vec![], SignalConfig::default());
        let profile = aggregator.aggregate("c1", &catalog());

        assert_eq!(profile.recent_queries.len(), 7);
        assert_eq!(profile.recent_queries[0], "QUERY 3");
        assert_eq!(profile.recent_queries[1], "query 9");
        assert!(!profile.recent_queries.iter().any(|q| q == "query 3"));
    }

    #[test]
    fn test_demographics() {
        let customers = vec![CustomerRecord {
            customer_id: "c9".to_string(),
            gender: Some(Gender::Male),
            age: Some(29),
            location: Some("Lyon".to_string()),
        }];
        let aggregator = SignalAggregator::new(vec![], customers, SignalConfig::default());
        let profile = aggregator.aggregate("c9", &catalog());
        assert_eq!(profile.gender(), Some(Gender::Male));
        assert_eq!(profile.demographics.age_band.as_deref(), Some("25-34"));
        assert_eq!(aggregator.customer_count(), 1);
    }
}
