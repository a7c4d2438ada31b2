use crate::ingest::{self, QuarantinedRow};
use crate::{IngestError, Product};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::io::Read;
use std::path::Path;
use stylist_core::Gender;

/// Immutable, typed product store.
///
/// Products are kept sorted by id so iteration order is stable across
/// reloads of the same table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    by_id: AHashMap<String, usize>,
    quarantined: Vec<QuarantinedRow>,
}

impl Catalog {
    /// Build from already-typed products. Every product is validated and ids
    /// must be unique.
    pub fn new(mut products: Vec<Product>) -> Result<Self, IngestError> {
        products.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = AHashMap::with_capacity(products.len());
        for (pos, product) in products.iter().enumerate() {
            product
                .validate()
                .map_err(|reason| IngestError::InvalidProduct {
                    id: product.id.clone(),
                    reason,
                })?;
            if by_id.insert(product.id.clone(), pos).is_some() {
                return Err(IngestError::DuplicateProduct(product.id.clone()));
            }
        }

        Ok(Self {
            products,
            by_id,
            quarantined: Vec::new(),
        })
    }

    /// Load a catalog table; malformed rows are quarantined, not fatal
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        let report = ingest::read_products(reader)?;
        let mut catalog = Self::new(report.accepted)?;
        catalog.quarantined = report.quarantined;
        Ok(catalog)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, IngestError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).map(|&pos| &self.products[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Products in id order
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Rows rejected during ingestion, with reasons
    pub fn quarantined(&self) -> &[QuarantinedRow] {
        &self.quarantined
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Largest trend score in the catalog, 0.0 when empty
    pub fn max_trend_score(&self) -> f64 {
        self.products
            .iter()
            .map(Product::trend_score)
            .fold(0.0, f64::max)
    }

    /// Top `k` products by trend score, ties by id
    pub fn trending(&self, k: usize, gender: Option<Gender>) -> Vec<&Product> {
        self.top_by(k, gender, Product::trend_score)
    }

    /// Top `k` products by discount, ties by id
    pub fn top_discounted(&self, k: usize, gender: Option<Gender>) -> Vec<&Product> {
        self.top_by(k, gender, |p| p.discount_pct)
    }

    /// Ids of the `n` most trending products across all genders
    pub fn trending_ids(&self, n: usize) -> Vec<String> {
        self.trending(n, None)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    fn top_by<F>(&self, k: usize, gender: Option<Gender>, score: F) -> Vec<&Product>
    where
        F: Fn(&Product) -> f64,
    {
        let mut ranked: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| gender.map_or(true, |g| p.suits(g)))
            .collect();
        // products are id-sorted and the sort is stable, so ties keep id order
        ranked.sort_by_key(|p| Reverse(OrderedFloat(score(p))));
        ranked.truncate(k);
        ranked
    }
}
