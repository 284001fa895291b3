//! Deterministic collaborator implementations seeded with demo data.
//!
//! These stand in for the external search, order-store, and escalation
//! services in tests and the local REPL. Search scoring is a plain keyword
//! overlap — enough to exercise filtering, ranking, and fallback paths
//! without a vector backend. Product metadata prices are in the search
//! backend's native currency (INR), as in production.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use chrono::Utc;
use shopmate_core::escalation::{EscalationError, EscalationGateway, EscalationOutcome};
use shopmate_core::orders::{OrderStore, OrderStoreError};
use shopmate_core::search::{ProductFilter, SearchError, SearchIndex, SearchMatch};
use shopmate_core::{
    ConversationTurn, CustomerId, OrderId, OrderRecord, OrderStatus, TransactionHistory,
    TransactionId, TransactionKind, TransactionRecord, UserProfile,
};

const YEN_TO_INR_RATE: f64 = 0.60;

fn product(
    id: &str,
    brand: &str,
    name: &str,
    price_jpy: i64,
    processor: &str,
    ram: &str,
    storage: &str,
    rating: f64,
    reviews: u32,
    colors: Option<&str>,
) -> Map<String, Value> {
    let mut map = match json!({
        "product_id": id,
        "brand": brand,
        "name": name,
        "price": price_jpy as f64 * YEN_TO_INR_RATE,
        "processor": processor,
        "ram": ram,
        "storage": storage,
        "rating": rating,
        "no_of_reviews": reviews,
        "img_link": format!("https://img.example/{id}.jpg"),
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(colors) = colors {
        map.insert("colors".to_string(), json!(colors));
    }
    map
}

fn demo_catalog() -> Vec<Map<String, Value>> {
    vec![
        product("hp-pavilion-15", "HP", "Pavilion 15", 82_000, "Ryzen 5 5500U", "16GB", "512GB SSD", 4.3, 1_204, Some("Natural Silver")),
        product("hp-victus-16", "HP", "Victus Gaming 16", 95_000, "Ryzen 7 5800H", "16GB", "512GB SSD", 4.4, 862, Some("Mica Silver")),
        product("lenovo-ideapad-slim-3", "Lenovo", "IdeaPad Slim 3", 48_000, "Core i5-1235U", "8GB", "512GB SSD", 4.1, 2_310, Some("Arctic Grey, Abyss Blue")),
        product("lenovo-thinkpad-e14", "Lenovo", "ThinkPad E14", 110_000, "Core i7-1255U", "16GB", "1TB SSD", 4.5, 540, None),
        product("dell-inspiron-15", "Dell", "Inspiron 15", 65_000, "Core i5-1135G7", "8GB", "512GB SSD", 4.0, 1_876, Some("Platinum Silver")),
        product("asus-tuf-f15", "ASUS", "TUF Gaming F15", 83_000, "Core i5-10300H", "16GB", "512GB SSD", 4.4, 3_054, Some("Graphite Black")),
        product("apple-macbook-air-m1", "APPLE", "MacBook Air M1", 144_983, "Apple M1", "8GB", "256GB SSD", 4.8, 7_412, Some("Gold, Silver, Space Grey")),
        product("acer-aspire-5", "Acer", "Aspire 5", 42_000, "Ryzen 3 5300U", "8GB", "256GB SSD", 3.9, 980, None),
    ]
}

/// Keyword-overlap search over the demo catalog.
#[derive(Default)]
pub struct FixtureSearchIndex {
    fail: AtomicBool,
}

impl FixtureSearchIndex {
    pub fn seeded() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail, to exercise degraded paths.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn haystack(metadata: &Map<String, Value>) -> String {
        ["brand", "name", "processor", "ram", "storage", "colors"]
            .iter()
            .filter_map(|key| metadata.get(*key).and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[async_trait::async_trait]
impl SearchIndex for FixtureSearchIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchMatch>, SearchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SearchError::Backend("fixture index offline".to_string()));
        }

        let terms: Vec<String> =
            query.to_lowercase().split_whitespace().map(str::to_string).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<SearchMatch> = demo_catalog()
            .into_iter()
            .filter_map(|metadata| {
                let haystack = Self::haystack(&metadata);
                let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                if hits == 0 {
                    return None;
                }
                let id = metadata
                    .get("product_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(SearchMatch { id, score: hits as f64 / terms.len() as f64, metadata })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn search_by_filter(
        &self,
        filter: &ProductFilter,
        top_k: usize,
    ) -> Result<Vec<SearchMatch>, SearchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SearchError::Backend("fixture index offline".to_string()));
        }

        let mut matches: Vec<SearchMatch> = demo_catalog()
            .into_iter()
            .filter(|metadata| {
                metadata
                    .get("brand")
                    .and_then(Value::as_str)
                    .is_some_and(|brand| filter.brands.iter().any(|wanted| wanted == brand))
            })
            .map(|metadata| {
                let id = metadata
                    .get("product_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                SearchMatch { id, score: 0.0, metadata }
            })
            .collect();

        matches.truncate(top_k);
        Ok(matches)
    }
}

fn demo_orders() -> Vec<OrderRecord> {
    vec![
        OrderRecord {
            order_id: OrderId("ORD-1001".to_string()),
            product_id: "hp-pavilion-gaming".to_string(),
            product_name: "HP Pavilion Gaming Laptop".to_string(),
            price_jpy: 149_833,
            status: OrderStatus::Delivered,
            order_date: "2026-06-15".to_string(),
            delivery_date: "2026-06-20".to_string(),
            carrier: "Sagawa".to_string(),
            tracking_number: "700000000001".to_string(),
            image_url: "https://img.example/hp-pavilion-gaming.jpg".to_string(),
        },
        OrderRecord {
            order_id: OrderId("ORD-1002".to_string()),
            product_id: "asus-tuf-f15".to_string(),
            product_name: "ASUS TUF Gaming F15".to_string(),
            price_jpy: 83_317,
            status: OrderStatus::Delivered,
            order_date: "2026-07-01".to_string(),
            delivery_date: "2026-07-05".to_string(),
            carrier: "Yamato".to_string(),
            tracking_number: "700000000002".to_string(),
            image_url: "https://img.example/asus-tuf-f15.jpg".to_string(),
        },
        OrderRecord {
            order_id: OrderId("ORD-1005".to_string()),
            product_id: "apple-macbook-air-m1".to_string(),
            product_name: "MacBook Air M1".to_string(),
            price_jpy: 241_638,
            status: OrderStatus::Confirmed,
            order_date: "2026-07-28".to_string(),
            delivery_date: "2026-08-04".to_string(),
            carrier: "FedEx".to_string(),
            tracking_number: "700000000005".to_string(),
            image_url: "https://img.example/apple-macbook-air-m1.jpg".to_string(),
        },
    ]
}

/// Order store over the demo orders; committed transactions accumulate in
/// memory. The demo dataset is not partitioned by customer.
pub struct FixtureOrderStore {
    orders: Vec<OrderRecord>,
    committed: RwLock<Vec<TransactionRecord>>,
    fail: AtomicBool,
}

impl Default for FixtureOrderStore {
    fn default() -> Self {
        Self { orders: demo_orders(), committed: RwLock::new(Vec::new()), fail: AtomicBool::new(false) }
    }
}

impl FixtureOrderStore {
    pub fn seeded() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub async fn committed(&self) -> Vec<TransactionRecord> {
        self.committed.read().await.clone()
    }

    fn check_available(&self) -> Result<(), OrderStoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OrderStoreError::Unavailable("fixture store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for FixtureOrderStore {
    async fn order_by_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<OrderRecord>, OrderStoreError> {
        self.check_available()?;
        Ok(self.orders.iter().find(|order| &order.order_id == order_id).cloned())
    }

    async fn orders_for_customer(
        &self,
        _customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, OrderStoreError> {
        self.check_available()?;
        Ok(self.orders.iter().take(limit).cloned().collect())
    }

    async fn commit(
        &self,
        kind: TransactionKind,
        user: &UserProfile,
        order: &OrderRecord,
        reason: &str,
    ) -> Result<TransactionId, OrderStoreError> {
        self.check_available()?;

        let transaction_id = TransactionId::generate(kind);
        let record = TransactionRecord::build(
            transaction_id.clone(),
            kind,
            user,
            order,
            reason,
            Utc::now(),
        );
        self.committed.write().await.push(record);
        Ok(transaction_id)
    }

    async fn history(&self, user_id: &str) -> Result<TransactionHistory, OrderStoreError> {
        self.check_available()?;

        let mut history = TransactionHistory::default();
        for record in self.committed.read().await.iter() {
            if record.user_id == user_id {
                history.push(record.clone());
            }
        }
        Ok(history)
    }
}

/// Scripted escalation gateway.
pub struct FixtureEscalationGateway {
    succeed: bool,
    calls: RwLock<usize>,
}

impl FixtureEscalationGateway {
    pub fn succeeding() -> Self {
        Self { succeed: true, calls: RwLock::new(0) }
    }

    pub fn busy() -> Self {
        Self { succeed: false, calls: RwLock::new(0) }
    }

    pub async fn call_count(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait::async_trait]
impl EscalationGateway for FixtureEscalationGateway {
    async fn escalate(
        &self,
        _user: &UserProfile,
        _transcript: &[ConversationTurn],
    ) -> Result<EscalationOutcome, EscalationError> {
        *self.calls.write().await += 1;
        Ok(EscalationOutcome { success: self.succeed })
    }
}

#[cfg(test)]
mod tests {
    use shopmate_core::orders::OrderStore;
    use shopmate_core::search::{SearchIndex, ProductFilter};
    use shopmate_core::{OrderId, TransactionKind, UserProfile};

    use super::{FixtureOrderStore, FixtureSearchIndex};

    #[tokio::test]
    async fn keyword_search_ranks_by_overlap() {
        let index = FixtureSearchIndex::seeded();
        let matches = index.search("hp ryzen", 10).await.expect("search");
        assert!(!matches.is_empty());
        assert!(matches[0].metadata["brand"].as_str() == Some("HP"));
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn filter_search_matches_exact_brand_casing() {
        let index = FixtureSearchIndex::seeded();
        let matches = index
            .search_by_filter(
                &ProductFilter { brands: vec!["APPLE".to_string()] },
                10,
            )
            .await
            .expect("filter search");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].metadata["name"].as_str(), Some("MacBook Air M1"));
    }

    #[tokio::test]
    async fn commits_accumulate_into_history() {
        let store = FixtureOrderStore::seeded();
        let user = UserProfile::new("9", "mio");
        let order = store
            .order_by_id(&OrderId("ORD-1002".to_string()))
            .await
            .expect("lookup")
            .expect("present");

        let id = store
            .commit(TransactionKind::Return, &user, &order, "Faulty/Defective")
            .await
            .expect("commit");
        assert!(id.0.starts_with("REF-"));

        let history = store.history("9").await.expect("history");
        assert_eq!(history.returns.len(), 1);
        assert!(history.cancellations.is_empty());
    }
}
