//! Response text generation.
//!
//! An external service may phrase replies naturally; the contract here is
//! only the structured facts. Every call site owns a deterministic template,
//! used both as the failure fallback and as the shipped `TemplateRenderer`
//! implementation, so the dialogue is fully functional without the
//! collaborator.

use async_trait::async_trait;
use thiserror::Error;

use shopmate_core::domain::product::group_thousands;
use shopmate_core::{OrderRecord, ProductRecord, TransactionId, TransactionKind};

use crate::nlu::Intent;

#[derive(Clone, Debug, PartialEq)]
pub enum RenderFacts {
    ProductList { products: Vec<ProductRecord>, query: String },
    Comparison { products: Vec<ProductRecord> },
    ColorAvailability { products: Vec<ProductRecord> },
    ColorUnavailable { products: Vec<ProductRecord> },
    OrderSummary { order: OrderRecord },
    OrderList { count: usize },
    Tracking { order: OrderRecord },
    AskOrderId { kind: TransactionKind },
    AskReason { kind: TransactionKind, reasons: Vec<String> },
    ConfirmTransaction { kind: TransactionKind, order: OrderRecord, reason: String },
    Committed { kind: TransactionKind, order: OrderRecord, transaction_id: TransactionId },
    TransactionCancelled { kind: TransactionKind },
    OrderNotFound { order_id: String },
    General { intent: Intent, user_name: String },
}

impl RenderFacts {
    /// The deterministic template for this call site.
    pub fn fallback_text(&self) -> String {
        match self {
            Self::ProductList { products, query } => {
                let mut text = format!(
                    "I found {} laptop{} for \"{}\":\n",
                    products.len(),
                    if products.len() == 1 { "" } else { "s" },
                    query
                );
                for product in products {
                    text.push_str(&format!("• {} - {}\n", product.display_label(), product.summary));
                }
                text
            }
            Self::Comparison { products } => {
                let mut text = format!("Here are the {} models side by side:\n", products.len());
                for product in products {
                    text.push_str(&format!(
                        "• {} — {} • rating {:.1} ({} reviews)\n",
                        product.display_label(),
                        product.summary,
                        product.rating,
                        product.reviews
                    ));
                }
                text
            }
            Self::ColorAvailability { products } => {
                let mut text = "Here are the available colors:\n".to_string();
                for product in products {
                    text.push_str(&format!(
                        "• {} {}: {}\n",
                        product.brand,
                        product.name,
                        product.colors.as_deref().unwrap_or("Not specified")
                    ));
                }
                text
            }
            Self::ColorUnavailable { products } => format!(
                "I don't have color information for {}. The product detail page lists the available finishes.",
                join_names(products)
            ),
            Self::OrderSummary { order } => format!(
                "Order {}: {} — ¥{}, status {}, ordered on {}.",
                order.order_id,
                order.product_name,
                group_thousands(order.price_jpy),
                order.status,
                order.order_date
            ),
            Self::OrderList { count } => {
                format!("Here are your {count} most recent orders:")
            }
            Self::Tracking { order } => format!(
                "Tracking for {}:\nStatus: {}\nCarrier: {}\nTracking #: {}\nEstimated delivery: {}",
                order.order_id,
                order.status,
                not_blank(&order.carrier, "Not specified"),
                not_blank(&order.tracking_number, "Not available"),
                not_blank(&order.delivery_date, "Not specified")
            ),
            Self::AskOrderId { kind } => format!(
                "I can help with your {}. Please share your Order ID (e.g. ORD-1234).",
                kind.noun()
            ),
            Self::AskReason { kind, reasons } => {
                let mut text = format!("Please select the reason for the {}:\n", kind.noun());
                for (index, reason) in reasons.iter().enumerate() {
                    text.push_str(&format!("{}. {}\n", index + 1, reason));
                }
                text
            }
            Self::ConfirmTransaction { kind, order, reason } => {
                let refund = match kind {
                    TransactionKind::Warranty => String::new(),
                    _ => format!("\nRefund amount: ¥{}", group_thousands(order.price_jpy)),
                };
                format!(
                    "Confirm {} for {}?\nReason: {}{}\n\nPlease confirm with 'yes' or 'no'.",
                    kind.noun(),
                    order.product_name,
                    reason,
                    refund
                )
            }
            Self::Committed { kind, order, transaction_id } => match kind {
                TransactionKind::Cancellation => format!(
                    "Cancellation processed. A refund of ¥{} will be issued within 5-7 business days. Reference: {}",
                    group_thousands(order.price_jpy),
                    transaction_id
                ),
                TransactionKind::Return => format!(
                    "Return approved. A refund of ¥{} will be issued once we receive the item. Reference: {}",
                    group_thousands(order.price_jpy),
                    transaction_id
                ),
                TransactionKind::Warranty => format!(
                    "Warranty claim submitted. Our team will contact you within 24 hours. Reference: {}",
                    transaction_id
                ),
            },
            Self::TransactionCancelled { kind } => {
                let noun = kind.noun();
                format!(
                    "{}{} cancelled. Is there anything else I can help you with?",
                    noun[..1].to_uppercase(),
                    &noun[1..]
                )
            }
            Self::OrderNotFound { order_id } => {
                format!("Order {order_id} not found. Please check your Order ID and try again.")
            }
            Self::General { intent, user_name } => general_line(*intent, user_name),
        }
    }
}

fn general_line(intent: Intent, user_name: &str) -> String {
    match intent {
        Intent::Greeting => {
            format!("Hello {user_name}! Welcome to the Shopmate laptop store. How can I help you today?")
        }
        Intent::ProductInquiry | Intent::SpecificProduct | Intent::BudgetInquiry
        | Intent::FeatureInquiry => "I'd be happy to help you find the right laptop.".to_string(),
        Intent::ProductComparison => "I can help you compare laptop models.".to_string(),
        Intent::OrderStatus => "I can help you track your order.".to_string(),
        Intent::ReturnRequest => "I can assist with your return request.".to_string(),
        Intent::CancellationRequest => "I can help you cancel your order.".to_string(),
        Intent::WarrantyClaim => "I can assist with your warranty claim.".to_string(),
        Intent::TechnicalSupport => "I'm here to help with any technical issue.".to_string(),
        Intent::ColorInquiry => "I can check color availability for you.".to_string(),
        Intent::Goodbye => {
            format!("Goodbye {user_name}! Thank you for shopping with Shopmate.")
        }
        Intent::GeneralQuestion => "How can I help you with Shopmate today?".to_string(),
    }
}

fn join_names(products: &[ProductRecord]) -> String {
    products
        .iter()
        .map(|p| format!("{} {}", p.brand, p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn not_blank<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("response renderer unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ResponseRenderer: Send + Sync {
    async fn render(&self, facts: &RenderFacts) -> Result<String, RenderError>;
}

/// The shipped renderer: exactly the deterministic templates.
#[derive(Clone, Debug, Default)]
pub struct TemplateRenderer;

#[async_trait]
impl ResponseRenderer for TemplateRenderer {
    async fn render(&self, facts: &RenderFacts) -> Result<String, RenderError> {
        Ok(facts.fallback_text())
    }
}

#[cfg(test)]
mod tests {
    use shopmate_core::{OrderId, OrderRecord, OrderStatus, TransactionId, TransactionKind};

    use crate::nlu::Intent;

    use super::RenderFacts;

    fn order() -> OrderRecord {
        OrderRecord {
            order_id: OrderId("ORD-1001".to_string()),
            product_id: "lap-1".to_string(),
            product_name: "HP Pavilion 15".to_string(),
            price_jpy: 149_833,
            status: OrderStatus::Delivered,
            order_date: "2026-06-15".to_string(),
            delivery_date: "2026-06-20".to_string(),
            carrier: String::new(),
            tracking_number: "700000000001".to_string(),
            image_url: String::new(),
        }
    }

    #[test]
    fn confirmation_names_reason_and_refund() {
        let text = RenderFacts::ConfirmTransaction {
            kind: TransactionKind::Return,
            order: order(),
            reason: "Faulty/Defective".to_string(),
        }
        .fallback_text();

        assert!(text.contains("Confirm return for HP Pavilion 15?"));
        assert!(text.contains("Reason: Faulty/Defective"));
        assert!(text.contains("Refund amount: ¥149,833"));
        assert!(text.contains("'yes' or 'no'"));
    }

    #[test]
    fn warranty_confirmation_omits_refund() {
        let text = RenderFacts::ConfirmTransaction {
            kind: TransactionKind::Warranty,
            order: order(),
            reason: "Battery issues".to_string(),
        }
        .fallback_text();

        assert!(!text.contains("Refund amount"));
    }

    #[test]
    fn committed_text_carries_the_reference() {
        let text = RenderFacts::Committed {
            kind: TransactionKind::Cancellation,
            order: order(),
            transaction_id: TransactionId("CXL-1A2B3C4D".to_string()),
        }
        .fallback_text();

        assert!(text.contains("Reference: CXL-1A2B3C4D"));
        assert!(text.contains("5-7 business days"));
    }

    #[test]
    fn tracking_substitutes_missing_fields() {
        let text = RenderFacts::Tracking { order: order() }.fallback_text();
        assert!(text.contains("Carrier: Not specified"));
        assert!(text.contains("Tracking #: 700000000001"));
    }

    #[test]
    fn general_lines_address_the_user() {
        let text = RenderFacts::General {
            intent: Intent::Greeting,
            user_name: "Aoi".to_string(),
        }
        .fallback_text();
        assert!(text.contains("Hello Aoi!"));
    }
}
