//! Recommendation wire types
//!
//! The recommendation API answers a survey with one ranked product list per
//! algorithm. The set of algorithm labels is not fixed: it is whatever keys
//! the response carries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of comparison rounds; only the first `ROUND_COUNT` products of each
/// algorithm are ever shown
pub const ROUND_COUNT: usize = 5;

/// Product identifier, unique within one recommendation run
pub type ProductId = i64;

/// Recommended product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: f64,
    pub score: f64,
}

/// Ranked product lists keyed by algorithm label
///
/// Labels iterate in sorted order, so every view of the same set lists the
/// algorithms identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationSet(BTreeMap<String, Vec<Product>>);

impl RecommendationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one algorithm's ranked list
    pub fn insert(&mut self, label: impl Into<String>, products: Vec<Product>) {
        self.0.insert(label.into(), products);
    }

    /// Algorithm labels, sorted
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Ranked list for one algorithm
    pub fn group(&self, label: &str) -> Option<&[Product]> {
        self.0.get(label).map(Vec::as_slice)
    }

    /// Product an algorithm recommends at the given round, if its list is long enough
    pub fn product_at(&self, label: &str, round: usize) -> Option<&Product> {
        self.group(label).and_then(|products| products.get(round))
    }

    /// Every (label, product) pair shown in the given round
    ///
    /// Algorithms whose list is shorter than `round + 1` are skipped.
    pub fn candidates(&self, round: usize) -> impl Iterator<Item = (&str, &Product)> {
        self.labels()
            .filter_map(move |label| self.product_at(label, round).map(|p| (label, p)))
    }

    /// True if any algorithm offers this product in the given round
    pub fn offers(&self, round: usize, product_id: ProductId) -> bool {
        self.candidates(round).any(|(_, p)| p.product_id == product_id)
    }

    /// Number of algorithms
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<Product>)> for RecommendationSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Product>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
