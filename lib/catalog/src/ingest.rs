// Typed CSV ingestion for catalog, event and customer tables
//
// Rows that fail validation are quarantined with a reason instead of failing
// the whole load.

use crate::product::{GenderOrientation, Product};
use crate::signals::{CustomerEvent, CustomerRecord, EventKind};
use crate::IngestError;
use ahash::AHashSet;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use stylist_core::Gender;
use tracing::{info, warn};

/// A rejected input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedRow {
    /// 1-based line number in the source, header included
    pub line: u64,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IngestReport<T> {
    pub accepted: Vec<T>,
    pub quarantined: Vec<QuarantinedRow>,
}

impl<T> Default for IngestReport<T> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            quarantined: Vec::new(),
        }
    }
}

impl<T> IngestReport<T> {
    fn quarantine(&mut self, table: &str, line: u64, id: Option<String>, reason: String) {
        warn!(table, line, id = id.as_deref().unwrap_or(""), %reason, "Quarantined row");
        self.quarantined.push(QuarantinedRow { line, id, reason });
    }
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    discount_pct: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image_ref: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    rating: Option<String>,
    #[serde(default)]
    reviews: Option<String>,
    #[serde(default)]
    trending_score: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCustomer {
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    age: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

const PRODUCT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "brand",
    "category",
    "price",
    "discount_pct",
    "description",
    "image_ref",
];
const EVENT_COLUMNS: &[&str] = &["customer_id", "event", "timestamp"];
const CUSTOMER_COLUMNS: &[&str] = &["customer_id"];

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input)
}

fn require_columns<R: Read>(rdr: &mut csv::Reader<R>, required: &[&str]) -> Result<(), IngestError> {
    let headers = rdr.headers()?;
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(IngestError::MissingColumn((*column).to_string()));
        }
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    non_blank(value).ok_or_else(|| format!("missing {field}"))
}

fn parse_number(value: Option<String>, field: &str) -> Result<Option<f64>, String> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => {
            let cleaned: String = raw
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| format!("{field} '{raw}' is not a number"))
        }
    }
}

/// Accepts "15", "15.5" and "15%"
pub fn parse_discount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// RFC 3339 or Unix seconds
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

fn convert_product(raw: RawProduct) -> Result<Product, String> {
    let id = required(raw.id, "id")?;
    let name = required(raw.name, "name")?;
    let description = required(raw.description, "description")?;
    let category = non_blank(raw.category).unwrap_or_default();

    let price = parse_number(raw.price, "price")?.ok_or("missing price")?;
    let discount_pct = match non_blank(raw.discount_pct) {
        None => 0.0,
        Some(d) => parse_discount(&d).ok_or_else(|| format!("discount_pct '{d}' is not a number"))?,
    };

    let gender = match non_blank(raw.gender) {
        None => None,
        Some(g) => Some(
            GenderOrientation::parse_loose(&g)
                .ok_or_else(|| format!("unknown gender orientation '{g}'"))?,
        ),
    };

    let rating = parse_number(raw.rating, "rating")?.unwrap_or(0.0);
    if !(0.0..=5.0).contains(&rating) {
        return Err(format!("rating {rating} outside [0, 5]"));
    }
    let reviews = match parse_number(raw.reviews, "reviews")? {
        None => 0,
        Some(r) if r >= 0.0 && r <= f64::from(u32::MAX) => r as u32,
        Some(r) => return Err(format!("reviews {r} out of range")),
    };
    let trending_score = parse_number(raw.trending_score, "trending_score")?.unwrap_or(0.0);

    let product = Product {
        id,
        name,
        brand: non_blank(raw.brand).unwrap_or_default(),
        category,
        price,
        discount_pct,
        description,
        image_ref: non_blank(raw.image_ref).unwrap_or_default(),
        gender,
        rating,
        reviews,
        trending_score,
    };
    product.validate()?;
    Ok(product)
}

/// Read a catalog table. Duplicate ids after the first are quarantined.
pub fn read_products<R: Read>(input: R) -> Result<IngestReport<Product>, IngestError> {
    let mut rdr = reader(input);
    require_columns(&mut rdr, PRODUCT_COLUMNS)?;

    let mut report = IngestReport::default();
    let mut seen = AHashSet::new();
    for (row, record) in rdr.deserialize::<RawProduct>().enumerate() {
        let line = row as u64 + 2;
        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                report.quarantine("catalog", line, None, e.to_string());
                continue;
            }
        };
        let id = non_blank(raw.id.clone());
        match convert_product(raw) {
            Ok(product) => {
                if seen.insert(product.id.clone()) {
                    report.accepted.push(product);
                } else {
                    report.quarantine("catalog", line, id, "duplicate id".to_string());
                }
            }
            Err(reason) => report.quarantine("catalog", line, id, reason),
        }
    }

    info!(
        accepted = report.accepted.len(),
        quarantined = report.quarantined.len(),
        "Loaded catalog table"
    );
    Ok(report)
}

fn convert_event(raw: RawEvent) -> Result<CustomerEvent, String> {
    let customer_id = required(raw.customer_id, "customer_id")?;
    let kind_raw = required(raw.event, "event")?;
    let kind = EventKind::parse_loose(&kind_raw).ok_or_else(|| format!("unknown event '{kind_raw}'"))?;
    let ts_raw = required(raw.timestamp, "timestamp")?;
    let timestamp = parse_timestamp(&ts_raw).ok_or_else(|| format!("bad timestamp '{ts_raw}'"))?;
    let product_id = non_blank(raw.product_id);
    let query = non_blank(raw.query);

    if kind.needs_product() && product_id.is_none() {
        return Err(format!("{kind} event without product_id"));
    }
    if kind == EventKind::Search && query.is_none() {
        return Err("search event without query".to_string());
    }

    Ok(CustomerEvent {
        customer_id,
        kind,
        product_id,
        query,
        timestamp,
    })
}

pub fn read_events<R: Read>(input: R) -> Result<IngestReport<CustomerEvent>, IngestError> {
    let mut rdr = reader(input);
    require_columns(&mut rdr, EVENT_COLUMNS)?;

    let mut report = IngestReport::default();
    for (row, record) in rdr.deserialize::<RawEvent>().enumerate() {
        let line = row as u64 + 2;
        match record.map_err(|e| e.to_string()) {
            Ok(raw) => {
                let id = non_blank(raw.customer_id.clone());
                match convert_event(raw) {
                    Ok(event) => report.accepted.push(event),
                    Err(reason) => report.quarantine("events", line, id, reason),
                }
            }
            Err(reason) => report.quarantine("events", line, None, reason),
        }
    }

    info!(
        accepted = report.accepted.len(),
        quarantined = report.quarantined.len(),
        "Loaded event table"
    );
    Ok(report)
}

fn convert_customer(raw: RawCustomer) -> Result<CustomerRecord, String> {
    let customer_id = required(raw.customer_id, "customer_id")?;
    let gender = match non_blank(raw.gender) {
        None => None,
        Some(g) => Some(Gender::parse_loose(&g).ok_or_else(|| format!("unknown gender '{g}'"))?),
    };
    let age = match non_blank(raw.age) {
        None => None,
        Some(a) => Some(
            a.parse::<u8>()
                .map_err(|_| format!("age '{a}' is not a whole number"))?,
        ),
    };
    Ok(CustomerRecord {
        customer_id,
        gender,
        age,
        location: non_blank(raw.location),
    })
}

pub fn read_customers<R: Read>(input: R) -> Result<IngestReport<CustomerRecord>, IngestError> {
    let mut rdr = reader(input);
    require_columns(&mut rdr, CUSTOMER_COLUMNS)?;

    let mut report = IngestReport::default();
    let mut seen = AHashSet::new();
    for (row, record) in rdr.deserialize::<RawCustomer>().enumerate() {
        let line = row as u64 + 2;
        match record.map_err(|e| e.to_string()).and_then(convert_customer) {
            Ok(customer) => {
                if seen.insert(customer.customer_id.clone()) {
                    report.accepted.push(customer);
                } else {
                    let id = Some(customer.customer_id);
                    report.quarantine("customers", line, id, "duplicate customer_id".to_string());
                }
            }
            Err(reason) => report.quarantine("customers", line, None, reason),
        }
    }

    info!(
        accepted = report.accepted.len(),
        quarantined = report.quarantined.len(),
        "Loaded customer table"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "\
id,name,brand,category,price,discount_pct,description,image_ref,gender,rating
p1,Runner,Acme,Shoes,59.99,15%,light running shoe,img/p1.png,Women,4.5
p2,Oxford,Acme,Shirts,\"1,200\",10,crisp oxford shirt,img/p2.png,men,
p3,,Acme,Shirts,20,0,no name,img/p3.png,,
p4,Tee,Acme,Shirts,abc,0,cotton tee,img/p4.png,,
p5,Hat,Acme,Hats,10,150,wool hat,img/p5.png,,
p1,Runner 2,Acme,Shoes,10,0,duplicate,img/p1b.png,,
p6,Scarf,Acme,Accessories,12,0,silk scarf,,unisex,9
";

    #[test]
    fn test_products_quarantine() {
        let report = read_products(CATALOG.as_bytes()).unwrap();
        let ids: Vec<&str> = report.accepted.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);

        let p1 = &report.accepted[0];
        assert_eq!(p1.discount_pct, 15.0);
        assert_eq!(p1.gender, Some(GenderOrientation::Women));
        assert_eq!(report.accepted[1].price, 1200.0);

        // blank name, bad price, discount > 100, duplicate id, rating > 5
        assert_eq!(report.quarantined.len(), 5);
        assert_eq!(report.quarantined[0].line, 4);
        assert!(report.quarantined[0].reason.contains("name"));
        assert_eq!(report.quarantined[3].reason, "duplicate id");
    }

    #[test]
    fn test_symbol_only_text_quarantined() {
        let input = "\
id,name,brand,category,price,discount_pct,description,image_ref,gender,rating
p1,Linen Shirt,Acme,Shirts,45,0,breathable linen shirt,,men,4
p2,***,Acme,Shirts,20,0,---,,,
p3,Tee,Acme,Shirts,15,0,...,,,
";
        let report = read_products(input.as_bytes()).unwrap();
        let ids: Vec<&str> = report.accepted.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);

        assert_eq!(report.quarantined.len(), 2);
        assert_eq!(report.quarantined[0].line, 3);
        assert_eq!(report.quarantined[0].id.as_deref(), Some("p2"));
        assert!(report.quarantined[0].reason.contains("no words"));
        assert_eq!(report.quarantined[1].line, 4);
    }

    #[test]
    fn test_missing_column() {
        let input = "id,name,price\np1,Tee,10\n";
        assert!(matches!(
            read_products(input.as_bytes()),
            Err(IngestError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_discount("15%"), Some(15.0));
        assert_eq!(parse_discount(" 15.5 "), Some(15.5));
        assert_eq!(parse_discount("x"), None);

        let a = parse_timestamp("2024-03-01T10:00:00Z").unwrap();
        let b = parse_timestamp("1709287200").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_events() {
        let input = "\
customer_id,event,product_id,query,timestamp
c1,purchase,p1,,2024-03-01T10:00:00Z
c1,search,,red dress,1709287200
c1,teleport,p1,,1709287200
c1,purchase,,,1709287200
c2,wishlist,p2,,1709287300
";
        let report = read_events(input.as_bytes()).unwrap();
        assert_eq!(report.accepted.len(), 3);
        assert_eq!(report.accepted[2].kind, EventKind::WishlistAdd);
        assert_eq!(report.quarantined.len(), 2);
    }

    #[test]
    fn test_customers() {
        let input = "\
customer_id,gender,age,location
c1,F,34,Berlin
c2,,,
c1,M,20,Paris
c3,robot,20,
";
        let report = read_customers(input.as_bytes()).unwrap();
        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.accepted[0].gender, Some(Gender::Female));
        assert_eq!(report.accepted[0].age, Some(34));
        assert!(report.accepted[1].gender.is_none());
        assert_eq!(report.quarantined.len(), 2);
    }
}
