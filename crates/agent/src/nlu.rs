//! Intent and entity resolution.
//!
//! An external NLU oracle does the heavy lifting; a small ordered rule list
//! runs in front of it and takes precedence when it fires (order ids and
//! brand mentions are cheaper and more reliable to spot locally than to ask
//! a model about). On oracle failure the caller substitutes
//! `(GeneralQuestion, {})` — NLU trouble must never take the session down.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use shopmate_core::search::detect_brand;
use shopmate_core::{OrderId, SessionContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    ProductInquiry,
    SpecificProduct,
    ProductComparison,
    OrderStatus,
    ReturnRequest,
    CancellationRequest,
    WarrantyClaim,
    TechnicalSupport,
    ColorInquiry,
    BudgetInquiry,
    FeatureInquiry,
    GeneralQuestion,
    Goodbye,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::ProductInquiry => "product_inquiry",
            Self::SpecificProduct => "specific_product",
            Self::ProductComparison => "product_comparison",
            Self::OrderStatus => "order_status",
            Self::ReturnRequest => "return_request",
            Self::CancellationRequest => "cancellation_request",
            Self::WarrantyClaim => "warranty_claim",
            Self::TechnicalSupport => "technical_support",
            Self::ColorInquiry => "color_inquiry",
            Self::BudgetInquiry => "budget_inquiry",
            Self::FeatureInquiry => "feature_inquiry",
            Self::GeneralQuestion => "general_question",
            Self::Goodbye => "goodbye",
        }
    }

    /// Tolerant mapping from an oracle label; anything unrecognised is a
    /// general question.
    pub fn from_label(label: &str) -> Intent {
        match label.trim().to_ascii_lowercase().as_str() {
            "greeting" => Self::Greeting,
            "product_inquiry" => Self::ProductInquiry,
            "specific_product" => Self::SpecificProduct,
            "product_comparison" => Self::ProductComparison,
            "order_status" => Self::OrderStatus,
            "return_request" => Self::ReturnRequest,
            "cancellation_request" => Self::CancellationRequest,
            "warranty_claim" => Self::WarrantyClaim,
            "technical_support" => Self::TechnicalSupport,
            "color_inquiry" => Self::ColorInquiry,
            "budget_inquiry" => Self::BudgetInquiry,
            "feature_inquiry" => Self::FeatureInquiry,
            "goodbye" => Self::Goodbye,
            _ => Self::GeneralQuestion,
        }
    }

    /// Intents that keep purchase context alive across turns.
    pub fn is_product_related(&self) -> bool {
        matches!(
            self,
            Self::ProductInquiry
                | Self::SpecificProduct
                | Self::ProductComparison
                | Self::ColorInquiry
                | Self::BudgetInquiry
                | Self::FeatureInquiry
        )
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::ReturnRequest | Self::CancellationRequest | Self::WarrantyClaim)
    }
}

pub type Entities = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NluOutcome {
    pub intent: Intent,
    pub entities: Entities,
}

impl NluOutcome {
    pub fn general() -> Self {
        Self { intent: Intent::GeneralQuestion, entities: Entities::new() }
    }
}

#[derive(Debug, Error)]
pub enum NluError {
    #[error("nlu oracle unavailable: {0}")]
    Unavailable(String),
    #[error("nlu oracle returned an unusable payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait NluClient: Send + Sync {
    async fn understand(
        &self,
        message: &str,
        context: &SessionContext,
    ) -> Result<NluOutcome, NluError>;
}

/// Fast local rules evaluated before the oracle call; first match wins.
pub fn rule_based(message: &str) -> Option<NluOutcome> {
    if let Some(order_id) = OrderId::scan(message) {
        let mut entities = Entities::new();
        entities.insert("order_id".to_string(), order_id.0);
        return Some(NluOutcome { intent: Intent::OrderStatus, entities });
    }

    if let Some(brand) = detect_brand(message) {
        let mut entities = Entities::new();
        entities.insert("brand".to_string(), brand.to_string());
        // The budget phrase rides along so the purchase flow can still
        // derive its price constraint when this rule short-circuits.
        if message.chars().any(|c| c.is_ascii_digit()) {
            entities.insert("budget".to_string(), message.trim().to_string());
        }
        return Some(NluOutcome { intent: Intent::ProductInquiry, entities });
    }

    None
}

/// Deterministic keyword classifier. Stands in for the oracle in tests and
/// the local REPL, and doubles as the documented fallback vocabulary.
#[derive(Clone, Debug, Default)]
pub struct KeywordNlu;

const INTENT_KEYWORDS: &[(&[&str], Intent)] = &[
    (&["hello", "hi ", "hey", "howdy"], Intent::Greeting),
    (&["compare", "versus", " vs ", "which is better"], Intent::ProductComparison),
    (&["return", "refund", "send back"], Intent::ReturnRequest),
    (&["cancel", "stop order"], Intent::CancellationRequest),
    (&["warranty", "broken"], Intent::WarrantyClaim),
    (&["laptop", "computer", "buy", "purchase"], Intent::ProductInquiry),
    (&["order", "status", "track", "where is"], Intent::OrderStatus),
    (&["color", "colour"], Intent::ColorInquiry),
    (&["bye", "goodbye", "thanks"], Intent::Goodbye),
    (&["help", "problem", "issue"], Intent::TechnicalSupport),
];

impl KeywordNlu {
    fn classify(&self, message: &str) -> NluOutcome {
        if let Some(outcome) = rule_based(message) {
            return outcome;
        }

        let lowered = format!(" {} ", message.to_lowercase());
        let intent = INTENT_KEYWORDS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(_, intent)| *intent)
            .unwrap_or(Intent::GeneralQuestion);

        let mut entities = Entities::new();
        if matches!(intent, Intent::ProductInquiry | Intent::BudgetInquiry)
            && message.chars().any(|c| c.is_ascii_digit())
        {
            entities.insert("budget".to_string(), message.trim().to_string());
        }

        NluOutcome { intent, entities }
    }
}

#[async_trait]
impl NluClient for KeywordNlu {
    async fn understand(
        &self,
        message: &str,
        _context: &SessionContext,
    ) -> Result<NluOutcome, NluError> {
        Ok(self.classify(message))
    }
}

#[cfg(test)]
mod tests {
    use super::{rule_based, Intent, KeywordNlu};

    #[test]
    fn order_id_rule_takes_precedence() {
        let outcome = rule_based("cancel ORD-1042 please").expect("rule fires");
        assert_eq!(outcome.intent, Intent::OrderStatus);
        assert_eq!(outcome.entities.get("order_id").map(String::as_str), Some("ORD-1042"));
    }

    #[test]
    fn brand_rule_yields_product_inquiry() {
        let outcome = rule_based("any good lenovo machines?").expect("rule fires");
        assert_eq!(outcome.intent, Intent::ProductInquiry);
        assert_eq!(outcome.entities.get("brand").map(String::as_str), Some("lenovo"));
    }

    #[test]
    fn keyword_classifier_covers_common_phrasings() {
        struct Case {
            text: &'static str,
            expect: Intent,
        }

        let cases = vec![
            Case { text: "hello there", expect: Intent::Greeting },
            Case { text: "i want to buy a laptop", expect: Intent::ProductInquiry },
            Case { text: "where is my package, any status?", expect: Intent::OrderStatus },
            Case { text: "i need a refund", expect: Intent::ReturnRequest },
            Case { text: "please stop order shipment", expect: Intent::CancellationRequest },
            Case { text: "the hinge is broken", expect: Intent::WarrantyClaim },
            Case { text: "what colour options exist", expect: Intent::ColorInquiry },
            Case { text: "thanks, goodbye", expect: Intent::Goodbye },
            Case { text: "i have a problem logging in", expect: Intent::TechnicalSupport },
            Case { text: "what is the meaning of life", expect: Intent::GeneralQuestion },
        ];

        let nlu = KeywordNlu;
        for case in cases {
            assert_eq!(nlu.classify(case.text).intent, case.expect, "{}", case.text);
        }
    }

    #[test]
    fn budget_text_is_captured_for_purchase_messages() {
        let nlu = KeywordNlu;
        let outcome = nlu.classify("a laptop under 50000 would be great");
        assert_eq!(outcome.intent, Intent::ProductInquiry);
        assert_eq!(
            outcome.entities.get("budget").map(String::as_str),
            Some("a laptop under 50000 would be great")
        );
    }

    #[test]
    fn unknown_labels_map_to_general_question() {
        assert_eq!(Intent::from_label("payment_issue"), Intent::GeneralQuestion);
        assert_eq!(Intent::from_label("ORDER_STATUS"), Intent::OrderStatus);
    }
}
