//! Product search over the external vector-search collaborator.
//!
//! The backend is queried broadly (no server-side price filter) and the
//! budget constraint is applied as a strict post-filter here, because the
//! backend cannot express lower bounds. Metadata typing is tolerant: numeric
//! fields may arrive as strings and are coerced, defaulting to zero.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::budget::{BudgetConstraint, BudgetKind};
use crate::config::DialogueTuning;
use crate::domain::product::{ProductId, ProductRecord};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search backend unavailable: {0}")]
    Backend(String),
}

/// One raw candidate from the backend: an id, a relevance score, and an
/// untyped metadata document.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchMatch {
    pub id: String,
    pub score: f64,
    pub metadata: Map<String, Value>,
}

/// Metadata-equality filter used by the brand-restricted fallback search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Match any of these literal brand values. The backing store is not
    /// consistent about casing, so callers pass every casing it might use.
    pub brands: Vec<String>,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchMatch>, SearchError>;

    async fn search_by_filter(
        &self,
        filter: &ProductFilter,
        top_k: usize,
    ) -> Result<Vec<SearchMatch>, SearchError>;
}

/// Brands the catalog is known to carry; used for query-side brand detection.
pub const KNOWN_BRANDS: &[&str] = &[
    "acer", "hp", "lenovo", "dell", "apple", "asus", "infinix", "msi", "realme", "redmi",
    "gigabyte", "samsung", "avita", "redmibook",
];

pub fn detect_brand(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    KNOWN_BRANDS.iter().find(|brand| lowered.contains(*brand)).copied()
}

/// Every known brand mentioned in the text, in catalog order.
pub fn detect_brands(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    KNOWN_BRANDS.iter().filter(|brand| lowered.contains(*brand)).copied().collect()
}

const FILTER_FALLBACK_TOP_K: usize = 20;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOutcome {
    /// At most `max_results` records, ranked per the constraint kind.
    pub products: Vec<ProductRecord>,
    /// How many candidates survived filtering before truncation.
    pub total_matches: usize,
    pub via_filter_fallback: bool,
}

pub struct ProductFinder {
    index: Arc<dyn SearchIndex>,
    tuning: DialogueTuning,
    /// The broad first-pass search requests a generous candidate set so the
    /// strict post-filter still has something left to rank.
    candidate_count: usize,
}

impl ProductFinder {
    pub fn new(index: Arc<dyn SearchIndex>, tuning: DialogueTuning) -> Self {
        Self { index, tuning, candidate_count: 50 }
    }

    pub fn with_candidate_count(mut self, candidate_count: usize) -> Self {
        self.candidate_count = candidate_count.max(1);
        self
    }

    /// Semantic search, constraint post-filter, brand fallback, rank, cap.
    /// A collaborator failure yields an empty outcome; the caller treats that
    /// as "no products found", never as a hard failure.
    pub async fn find(&self, query: &str, constraint: Option<&BudgetConstraint>) -> FindOutcome {
        let matches = self.index.search(query, self.candidate_count).await.unwrap_or_default();

        let mut products: Vec<ProductRecord> = matches
            .iter()
            .filter(|candidate| candidate.score > self.tuning.relevance_floor)
            .filter_map(|candidate| self.normalize(candidate))
            .filter(|product| admits(constraint, product.price_jpy))
            .collect();

        let mut via_filter_fallback = false;
        if products.is_empty() {
            products = self.brand_fallback(query, constraint).await;
            via_filter_fallback = !products.is_empty();
        }

        rank(&mut products, constraint);

        let total_matches = products.len();
        products.truncate(self.tuning.max_results);

        FindOutcome { products, total_matches, via_filter_fallback }
    }

    /// Best single candidate for a product mention, used when resolving the
    /// sides of a comparison. `score_floor` is stricter than the recommend
    /// path: a weak match would produce a nonsense comparison.
    pub async fn first_match(&self, mention: &str, score_floor: f64) -> Option<ProductRecord> {
        let matches = self.index.search(mention, 3).await.unwrap_or_default();
        matches
            .iter()
            .filter(|candidate| candidate.score > score_floor)
            .find_map(|candidate| self.normalize(candidate))
    }

    /// Metadata-only search restricted by the brand keyword detected in the
    /// query, re-applying the same price filter. The backing store stores
    /// brands in inconsistent casings, so every plausible casing is tried.
    async fn brand_fallback(
        &self,
        query: &str,
        constraint: Option<&BudgetConstraint>,
    ) -> Vec<ProductRecord> {
        let Some(brand) = detect_brand(query) else {
            return Vec::new();
        };

        let mut brands = vec![brand.to_uppercase(), capitalize(brand), brand.to_string()];
        brands.dedup();

        let filter = ProductFilter { brands };
        let matches =
            self.index.search_by_filter(&filter, FILTER_FALLBACK_TOP_K).await.unwrap_or_default();

        matches
            .iter()
            .filter_map(|candidate| self.normalize(candidate))
            .filter(|product| admits(constraint, product.price_jpy))
            .collect()
    }

    /// Normalises one raw candidate into a `ProductRecord`, converting the
    /// backend's INR price into display JPY. Candidates with a non-positive
    /// price are dropped.
    fn normalize(&self, candidate: &SearchMatch) -> Option<ProductRecord> {
        let meta = &candidate.metadata;

        let price_inr = coerce_f64(meta.get("price"));
        let price_jpy = (price_inr / self.tuning.yen_to_inr_rate).round() as i64;
        if price_jpy <= 0 {
            return None;
        }

        let id = first_string(meta, &["product_id", "id"])
            .unwrap_or_else(|| format!("prod-{}", candidate.id));
        let processor = string_or(meta, "processor", "Not specified");
        let ram = string_or(meta, "ram", "Not specified");
        let storage = string_or(meta, "storage", "Not specified");

        let mut summary = format!("{processor} • {ram} • {storage}");
        if let Some(os) = first_string(meta, &["os"]) {
            summary.push_str(&format!(" • {os}"));
        }

        Some(ProductRecord {
            id: ProductId(id),
            brand: string_or(meta, "brand", "Unknown"),
            name: string_or(meta, "name", "Unknown Laptop"),
            price_jpy,
            price_inr,
            ram,
            storage,
            processor,
            rating: coerce_f64_or(meta.get("rating"), 4.0),
            reviews: coerce_u32(meta.get("no_of_reviews").or_else(|| meta.get("no_of_ratings"))),
            colors: extract_colors(meta),
            image_url: first_string(meta, &["img_link", "image_url"]).unwrap_or_default(),
            summary,
            score: candidate.score,
        })
    }
}

fn admits(constraint: Option<&BudgetConstraint>, price_jpy: i64) -> bool {
    constraint.map(|c| c.admits_jpy(price_jpy)).unwrap_or(true)
}

fn rank(products: &mut [ProductRecord], constraint: Option<&BudgetConstraint>) {
    match constraint.map(|c| (c.kind, c.target_jpy)) {
        Some((BudgetKind::Below, _)) => {
            // Highest price first within budget; the user asked for the most
            // machine their money buys.
            products.sort_by(|a, b| {
                b.price_jpy.cmp(&a.price_jpy).then(b.rating.total_cmp(&a.rating))
            });
        }
        Some((BudgetKind::Above, _)) => {
            products.sort_by(|a, b| {
                a.price_jpy.cmp(&b.price_jpy).then(b.rating.total_cmp(&a.rating))
            });
        }
        Some((BudgetKind::Around, target)) => {
            products.sort_by(|a, b| {
                let da = (a.price_jpy as f64 - target).abs();
                let db = (b.price_jpy as f64 - target).abs();
                da.total_cmp(&db).then(b.rating.total_cmp(&a.rating))
            });
        }
        None => {
            products.sort_by(|a, b| {
                b.score.total_cmp(&a.score).then(b.rating.total_cmp(&a.rating))
            });
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Numeric fields may arrive as numbers or as decorated strings
/// ("₹45,999.00"); strip everything but digits and the decimal point.
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    coerce_f64_or(value, 0.0)
}

pub fn coerce_f64_or(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(default),
        Some(Value::String(raw)) => {
            let cleaned: String =
                raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            cleaned.parse().unwrap_or(default)
        }
        _ => default,
    }
}

pub fn coerce_u32(value: Option<&Value>) -> u32 {
    coerce_f64(value).max(0.0) as u32
}

fn string_or(meta: &Map<String, Value>, key: &str, default: &str) -> String {
    first_string(meta, &[key]).unwrap_or_else(|| default.to_string())
}

fn first_string(meta: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match meta.get(*key) {
        Some(Value::String(raw)) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn extract_colors(meta: &Map<String, Value>) -> Option<String> {
    let raw = first_string(meta, &["colors", "color", "available_colors"])?;
    let cleaned = raw.replace(['"', '\'', '[', ']'], "").trim().to_string();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("n/a") {
        return None;
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    use crate::budget::parse_budget;
    use crate::config::DialogueTuning;

    use super::{
        detect_brand, ProductFilter, ProductFinder, SearchError, SearchIndex, SearchMatch,
    };

    struct StaticIndex {
        matches: Vec<SearchMatch>,
        by_filter: Vec<SearchMatch>,
        fail: bool,
    }

    #[async_trait]
    impl SearchIndex for StaticIndex {
        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<SearchMatch>, SearchError> {
            if self.fail {
                return Err(SearchError::Backend("index offline".to_string()));
            }
            Ok(self.matches.clone())
        }

        async fn search_by_filter(
            &self,
            filter: &ProductFilter,
            _top_k: usize,
        ) -> Result<Vec<SearchMatch>, SearchError> {
            if self.fail {
                return Err(SearchError::Backend("index offline".to_string()));
            }
            let brands = filter.brands.clone();
            Ok(self
                .by_filter
                .iter()
                .filter(|m| {
                    m.metadata
                        .get("brand")
                        .and_then(Value::as_str)
                        .is_some_and(|b| brands.iter().any(|wanted| wanted == b))
                })
                .cloned()
                .collect())
        }
    }

    fn meta(brand: &str, name: &str, price_inr: Value, rating: f64) -> Map<String, Value> {
        let value = json!({
            "product_id": format!("{}-{}", brand.to_lowercase(), name.to_lowercase().replace(' ', "-")),
            "brand": brand,
            "name": name,
            "price": price_inr,
            "ram": "16GB",
            "storage": "512GB SSD",
            "processor": "Core i5",
            "rating": rating,
            "no_of_reviews": "1,204",
        });
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn candidate(brand: &str, name: &str, price_inr: Value, rating: f64, score: f64) -> SearchMatch {
        SearchMatch {
            id: format!("{brand}-{name}"),
            score,
            metadata: meta(brand, name, price_inr, rating),
        }
    }

    fn finder(matches: Vec<SearchMatch>, by_filter: Vec<SearchMatch>) -> ProductFinder {
        ProductFinder::new(
            Arc::new(StaticIndex { matches, by_filter, fail: false }),
            DialogueTuning::default(),
        )
    }

    // 30_000 INR ≈ 50_000 JPY at the 0.60 default rate.
    fn inr(jpy: i64) -> Value {
        json!(jpy as f64 * 0.60)
    }

    #[tokio::test]
    async fn below_constraint_filters_and_ranks_highest_first() {
        let finder = finder(
            vec![
                candidate("HP", "Pavilion", inr(45_000), 4.1, 0.9),
                candidate("Dell", "Inspiron", inr(52_000), 4.6, 0.8),
                candidate("Acer", "Aspire", inr(39_000), 4.5, 0.7),
                candidate("Asus", "Vivobook", inr(49_900), 4.0, 0.6),
            ],
            Vec::new(),
        );
        let constraint = parse_budget("under 50k", 0.60, 0.20);

        let outcome = finder.find("laptop", constraint.as_ref()).await;

        let prices: Vec<i64> = outcome.products.iter().map(|p| p.price_jpy).collect();
        assert_eq!(prices, vec![49_900, 45_000, 39_000]);
        assert!(outcome.products.iter().all(|p| p.price_jpy <= 50_000));
        assert_eq!(outcome.total_matches, 3);
    }

    #[tokio::test]
    async fn above_constraint_ranks_cheapest_first() {
        let finder = finder(
            vec![
                candidate("MSI", "Katana", inr(120_000), 4.3, 0.9),
                candidate("Asus", "ROG", inr(180_000), 4.7, 0.8),
                candidate("HP", "Victus", inr(95_000), 4.2, 0.9),
            ],
            Vec::new(),
        );
        let constraint = parse_budget("over 100000", 0.60, 0.20);

        let outcome = finder.find("gaming laptop", constraint.as_ref()).await;

        let prices: Vec<i64> = outcome.products.iter().map(|p| p.price_jpy).collect();
        assert_eq!(prices, vec![120_000, 180_000]);
    }

    #[tokio::test]
    async fn around_constraint_ranks_by_distance_to_target() {
        let finder = finder(
            vec![
                candidate("Lenovo", "IdeaPad", inr(70_000), 4.1, 0.9),
                candidate("HP", "Envy", inr(82_000), 4.4, 0.8),
                candidate("Dell", "XPS", inr(95_000), 4.8, 0.7),
                candidate("Acer", "Swift", inr(130_000), 4.6, 0.9),
            ],
            Vec::new(),
        );
        let constraint = parse_budget("around 80000", 0.60, 0.20);

        let outcome = finder.find("ultrabook", constraint.as_ref()).await;

        let prices: Vec<i64> = outcome.products.iter().map(|p| p.price_jpy).collect();
        // 130_000 is outside the ±20% band; the rest sort by |price − 80k|.
        assert_eq!(prices, vec![82_000, 70_000, 95_000]);
    }

    #[tokio::test]
    async fn result_set_is_capped_at_six() {
        let matches = (0..10)
            .map(|i| {
                candidate("HP", &format!("Model{i}"), inr(40_000 + i * 500), 4.0, 0.9 - i as f64 / 100.0)
            })
            .collect();
        let finder = finder(matches, Vec::new());

        let outcome = finder.find("hp laptop", None).await;

        assert_eq!(outcome.products.len(), 6);
        assert_eq!(outcome.total_matches, 10);
    }

    #[tokio::test]
    async fn low_relevance_and_priceless_candidates_are_dropped() {
        let finder = finder(
            vec![
                candidate("HP", "Ghost", inr(45_000), 4.0, 0.05),
                candidate("HP", "Free", json!(0), 4.0, 0.9),
                candidate("HP", "Real", inr(45_000), 4.0, 0.9),
            ],
            Vec::new(),
        );

        let outcome = finder.find("hp", None).await;

        assert_eq!(outcome.products.len(), 1);
        assert_eq!(outcome.products[0].name, "Real");
    }

    #[tokio::test]
    async fn empty_semantic_results_fall_back_to_brand_filter() {
        let finder = finder(
            Vec::new(),
            vec![
                candidate("APPLE", "MacBook Air M1", inr(144_983), 4.8, 0.0),
                candidate("DELL", "Latitude", inr(90_000), 4.1, 0.0),
            ],
        );

        let outcome = finder.find("apple laptop", None).await;

        assert!(outcome.via_filter_fallback);
        assert_eq!(outcome.products.len(), 1);
        assert_eq!(outcome.products[0].brand, "APPLE");
    }

    #[tokio::test]
    async fn backend_failure_reads_as_no_products() {
        let finder = ProductFinder::new(
            Arc::new(StaticIndex { matches: Vec::new(), by_filter: Vec::new(), fail: true }),
            DialogueTuning::default(),
        );

        let outcome = finder.find("laptop", None).await;

        assert!(outcome.products.is_empty());
        assert_eq!(outcome.total_matches, 0);
    }

    #[tokio::test]
    async fn string_priced_metadata_is_coerced() {
        let mut decorated = candidate("HP", "Pavilion", json!("₹27,000.00"), 4.0, 0.9);
        decorated.metadata.insert("rating".to_string(), json!("4.5"));
        let finder = finder(vec![decorated], Vec::new());

        let outcome = finder.find("hp", None).await;

        assert_eq!(outcome.products[0].price_jpy, 45_000);
        assert_eq!(outcome.products[0].rating, 4.5);
        assert_eq!(outcome.products[0].reviews, 1_204);
    }

    #[test]
    fn brand_detection_is_case_insensitive() {
        assert_eq!(detect_brand("cheap LENOVO under 50k"), Some("lenovo"));
        assert_eq!(detect_brand("some unheard-of maker"), None);
    }
}
