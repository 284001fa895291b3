//! Outbound shape handed to the transport layer, plus quick-reply button
//! assembly.

use serde::{Deserialize, Serialize};

use shopmate_core::domain::product::group_thousands;
use shopmate_core::{OrderRecord, ProductRecord};

use crate::nlu::{Entities, Intent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    ProductGrid,
    OrderGrid,
    TrackingDetails,
    PolicyView,
    ComparisonView,
}

/// Flattened tracking details for the transport's detail card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingView {
    pub order_id: String,
    pub product_name: String,
    pub price: String,
    pub carrier: String,
    pub tracking_number: String,
    pub estimated_delivery: String,
    pub order_date: String,
    pub status: String,
}

impl TrackingView {
    pub fn from_order(order: &OrderRecord) -> Self {
        Self {
            order_id: order.order_id.0.clone(),
            product_name: order.product_name.clone(),
            price: format!("¥{}", group_thousands(order.price_jpy)),
            carrier: fallback(&order.carrier, "Not specified"),
            tracking_number: fallback(&order.tracking_number, "Not available"),
            estimated_delivery: fallback(&order.delivery_date, "Not specified"),
            order_date: fallback(&order.order_date, "Not specified"),
            status: order.status.label().to_string(),
        }
    }
}

fn fallback(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub response: String,
    pub buttons: Vec<String>,
    pub intent: String,
    pub entities: Entities,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub products: Vec<ProductRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub orders: Vec<OrderRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tracking_info: Option<TrackingView>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub display_type: Option<DisplayKind>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub escalated: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub reset_context: bool,
}

impl Reply {
    pub fn new(response: impl Into<String>, intent: Intent, entities: Entities) -> Self {
        Self {
            response: response.into(),
            buttons: Vec::new(),
            intent: intent.label().to_string(),
            entities,
            products: Vec::new(),
            orders: Vec::new(),
            tracking_info: None,
            display_type: None,
            escalated: false,
            reset_context: false,
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<String>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_products(mut self, products: Vec<ProductRecord>) -> Self {
        self.products = products;
        self.display_type = Some(DisplayKind::ProductGrid);
        self
    }

    pub fn with_orders(mut self, orders: Vec<OrderRecord>) -> Self {
        self.orders = orders;
        self.display_type = Some(DisplayKind::OrderGrid);
        self
    }

    pub fn with_tracking(mut self, view: TrackingView) -> Self {
        self.tracking_info = Some(view);
        self.display_type = Some(DisplayKind::TrackingDetails);
        self
    }

    pub fn with_display(mut self, display: DisplayKind) -> Self {
        self.display_type = Some(display);
        self
    }
}

pub fn base_buttons() -> Vec<String> {
    to_buttons(&["Purchase Laptop", "Order Status", "Return/Cancel", "Warranty"])
}

pub fn main_menu_buttons() -> Vec<String> {
    to_buttons(&["Purchase Laptop", "Order Status", "Return/Cancel", "Warranty", "Technical Support"])
}

/// Buttons offered alongside a single order, depending on what its status
/// still allows.
pub fn order_action_buttons(order: &OrderRecord) -> Vec<String> {
    if order.status.is_delivered() {
        to_buttons(&["Return", "Warranty", "Track", "Main Menu"])
    } else if order.status.is_cancellable() {
        to_buttons(&["Track", "Cancel", "Main Menu"])
    } else {
        to_buttons(&["Track", "Main Menu"])
    }
}

/// Search-context follow-up buttons: brand drill-downs, feature filters, and
/// the evergreen categories, capped at eight.
pub fn context_buttons(query: &str, _products: &[ProductRecord]) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut buttons: Vec<String> = Vec::new();

    for brand in ["dell", "hp", "lenovo", "apple", "asus", "acer"] {
        if lowered.contains(brand) {
            let upper = brand.to_uppercase();
            buttons.push(format!("{upper} Colors"));
            buttons.push(format!("{upper} Under ¥50000"));
            buttons.push(format!("{upper} 16GB RAM"));
            break;
        }
    }

    if lowered.contains("ram") {
        buttons.extend(to_buttons(&["8GB RAM", "16GB RAM", "32GB RAM"]));
    }
    if lowered.contains("ssd") || lowered.contains("storage") {
        buttons.extend(to_buttons(&["256GB SSD", "512GB SSD", "1TB SSD"]));
    }
    if ["price", "budget", "under", "¥", "yen"].iter().any(|w| lowered.contains(w)) {
        buttons.extend(to_buttons(&["Under ¥50000", "Under ¥80000", "Under ¥100000"]));
    }

    for color in ["blue", "red", "black", "silver", "gray", "white"] {
        if lowered.contains(color) {
            let title = format!("{}{}", color[..1].to_uppercase(), &color[1..]);
            buttons.push(format!("{title} Laptops"));
            break;
        }
    }

    for default in ["Gaming Laptops", "Business Laptops", "Student Laptops", "All Brands"] {
        buttons.push(default.to_string());
    }

    buttons.dedup();
    buttons.truncate(8);
    buttons
}

fn to_buttons(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use shopmate_core::{OrderId, OrderRecord, OrderStatus};

    use crate::nlu::{Entities, Intent};

    use super::{context_buttons, order_action_buttons, Reply, TrackingView};

    fn order(status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: OrderId("ORD-1005".to_string()),
            product_id: "lap-5".to_string(),
            product_name: "MacBook Air M1".to_string(),
            price_jpy: 241_638,
            status,
            order_date: "2026-07-20".to_string(),
            delivery_date: "2026-07-27".to_string(),
            carrier: "FedEx".to_string(),
            tracking_number: "700000000005".to_string(),
            image_url: String::new(),
        }
    }

    #[test]
    fn buttons_follow_order_status() {
        assert!(order_action_buttons(&order(OrderStatus::Delivered)).contains(&"Return".to_string()));
        assert!(order_action_buttons(&order(OrderStatus::Confirmed)).contains(&"Cancel".to_string()));
        let cancelled = order_action_buttons(&order(OrderStatus::Cancelled));
        assert!(!cancelled.contains(&"Cancel".to_string()));
        assert!(!cancelled.contains(&"Return".to_string()));
    }

    #[test]
    fn context_buttons_are_capped_and_deduped() {
        let buttons = context_buttons("hp 16gb ram under budget blue", &[]);
        assert!(buttons.len() <= 8);
        assert!(buttons.contains(&"HP Colors".to_string()));
    }

    #[test]
    fn tracking_view_fills_gaps() {
        let mut record = order(OrderStatus::Shipped);
        record.carrier = String::new();
        let view = TrackingView::from_order(&record);
        assert_eq!(view.carrier, "Not specified");
        assert_eq!(view.price, "¥241,638");
        assert_eq!(view.status, "shipped");
    }

    #[test]
    fn empty_payloads_are_omitted_from_the_wire_shape() {
        let reply = Reply::new("hi", Intent::Greeting, Entities::new());
        let encoded = serde_json::to_string(&reply).expect("encode");
        assert!(!encoded.contains("products"));
        assert!(!encoded.contains("escalated"));
        assert!(encoded.contains("\"intent\":\"greeting\""));
    }
}
