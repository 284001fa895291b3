use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Scans free text for an order reference (`ORD-1234`, `ord_1234`,
    /// `ORD1234`) and normalises it to the canonical `ORD-<digits>` form.
    pub fn scan(text: &str) -> Option<OrderId> {
        let lower = text.to_ascii_lowercase();
        let bytes = lower.as_bytes();
        let mut index = 0;
        while let Some(offset) = lower[index..].find("ord") {
            let start = index + offset;
            let mut cursor = start + 3;
            if matches!(bytes.get(cursor), Some(b'-') | Some(b'_')) {
                cursor += 1;
            }
            let digits_start = cursor;
            while bytes.get(cursor).is_some_and(|b| b.is_ascii_digit()) {
                cursor += 1;
            }
            if cursor > digits_start {
                return Some(OrderId(format!("ORD-{}", &lower[digits_start..cursor])));
            }
            index = start + 3;
        }
        None
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order lifecycle status. The vocabulary is open: unrecognised statuses are
/// preserved verbatim so gating messages can still name them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(untagged)]
    Other(String),
}

impl OrderStatus {
    pub fn parse(raw: &str) -> OrderStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Self::Confirmed,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            "" => Self::Other("unknown".to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Processing | Self::Shipped)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable snapshot of an order as fetched from the order store. A copy is
/// embedded into the session phase while a transaction is mid-flight so every
/// step of the workflow sees a consistent view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub product_id: String,
    pub product_name: String,
    pub price_jpy: i64,
    pub status: OrderStatus,
    pub order_date: String,
    pub delivery_date: String,
    pub carrier: String,
    pub tracking_number: String,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::{OrderId, OrderStatus};

    #[test]
    fn scans_order_ids_in_any_spelling() {
        struct Case {
            text: &'static str,
            expect: Option<&'static str>,
        }

        let cases = vec![
            Case { text: "please cancel ORD-1042", expect: Some("ORD-1042") },
            Case { text: "status of ord_77?", expect: Some("ORD-77") },
            Case { text: "it was ORD9001 i think", expect: Some("ORD-9001") },
            Case { text: "my order from last week", expect: None },
            Case { text: "the word 'ordinary' is not an id", expect: None },
            Case { text: "ordinal talk then ord-5", expect: Some("ORD-5") },
        ];

        for case in cases {
            let scanned = OrderId::scan(case.text);
            assert_eq!(scanned.map(|id| id.0), case.expect.map(str::to_string), "{}", case.text);
        }
    }

    #[test]
    fn status_parse_is_tolerant() {
        assert_eq!(OrderStatus::parse("Delivered"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::parse(" SHIPPED "), OrderStatus::Shipped);
        assert_eq!(OrderStatus::parse("canceled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::parse("on hold"), OrderStatus::Other("on hold".to_string()));
        assert_eq!(OrderStatus::parse("").label(), "unknown");
    }

    #[test]
    fn delivered_is_never_cancellable() {
        assert!(OrderStatus::Delivered.is_delivered());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(OrderStatus::Processing.is_cancellable());
        assert!(!OrderStatus::Other("on hold".to_string()).is_cancellable());
    }
}
