//! Return / cancellation / warranty workflow rules: order-status gating,
//! canonical reason mapping, and the confirmation contract. The router drives
//! the phase transitions; everything here is a pure, testable rule.

use crate::domain::order::OrderRecord;
use crate::domain::transaction::TransactionKind;
use crate::errors::DomainError;

/// Tokens that commit a transaction when present anywhere in the
/// confirmation message. Anything else cancels the workflow.
pub const CONFIRMATION_WORDS: &[&str] =
    &["yes", "confirm", "proceed", "ok", "okay", "yeah", "yep", "sure"];

pub fn is_affirmative(message: &str) -> bool {
    tokens(message).any(|token| CONFIRMATION_WORDS.contains(&token.to_lowercase().as_str()))
}

fn tokens(message: &str) -> impl Iterator<Item = &str> {
    message.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

/// Eligibility gating by order status, evaluated when the order becomes
/// known. A failed check is a business-rule rejection, not an error path:
/// the message names the actual status and the workflow does not advance.
pub fn check_eligibility(kind: TransactionKind, order: &OrderRecord) -> Result<(), DomainError> {
    let eligible = match kind {
        TransactionKind::Cancellation => !order.status.is_delivered(),
        TransactionKind::Return | TransactionKind::Warranty => order.status.is_delivered(),
    };

    if eligible {
        Ok(())
    } else {
        Err(DomainError::IneligibleOrderStatus { kind, status: order.status.clone() })
    }
}

pub fn reasons_for(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Cancellation => &[
            "Found better price elsewhere",
            "Changed my mind",
            "Ordered by mistake",
            "Delivery too long",
            "Other",
        ],
        TransactionKind::Return => &[
            "Faulty/Defective",
            "Wrong item received",
            "Item not as described",
            "No longer needed",
            "Other",
        ],
        TransactionKind::Warranty => &[
            "Battery issues",
            "Screen problems",
            "Performance issues",
            "Hardware failure",
            "Software problems",
            "Other",
        ],
    }
}

/// Keyword → canonical reason table. Checked before the per-kind lists so
/// common free-text phrasings land on the canonical labels.
const REASON_KEYWORDS: &[(&str, &str)] = &[
    ("fault", "Faulty/Defective"),
    ("faulty", "Faulty/Defective"),
    ("defective", "Faulty/Defective"),
    ("broken", "Faulty/Defective"),
    ("not working", "Faulty/Defective"),
    ("damaged", "Faulty/Defective"),
    ("wrong", "Wrong item received"),
    ("incorrect", "Wrong item received"),
    ("different", "Wrong item received"),
    ("not as described", "Item not as described"),
    ("description", "Item not as described"),
    ("changed mind", "No longer needed"),
    ("dont need", "No longer needed"),
    ("don't need", "No longer needed"),
    ("no need", "No longer needed"),
    ("other", "Other"),
];

/// Maps a free-text reason to one of the canonical reasons for `kind`.
/// Unmatched text maps to `Other`; the reason step never blocks.
pub fn canonical_reason(kind: TransactionKind, raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let valid = reasons_for(kind);

    if let Some(exact) = valid.iter().find(|reason| reason.eq_ignore_ascii_case(&lowered)) {
        return (*exact).to_string();
    }

    for (keyword, mapped) in REASON_KEYWORDS {
        if lowered.contains(keyword) && valid.contains(mapped) {
            return (*mapped).to_string();
        }
    }

    // Partial match against the canonical labels themselves ("battery" →
    // "Battery issues").
    for reason in valid {
        let reason_words = reason.to_lowercase();
        if reason_words
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
            .any(|word| lowered.contains(word))
        {
            return (*reason).to_string();
        }
    }

    "Other".to_string()
}

#[cfg(test)]
mod tests {
    use crate::domain::order::{OrderId, OrderRecord, OrderStatus};
    use crate::domain::transaction::TransactionKind;
    use crate::errors::DomainError;

    use super::{canonical_reason, check_eligibility, is_affirmative};

    fn order(status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: OrderId("ORD-1002".to_string()),
            product_id: "lap-2".to_string(),
            product_name: "ASUS TUF Gaming F15".to_string(),
            price_jpy: 83_317,
            status,
            order_date: "2026-07-01".to_string(),
            delivery_date: "2026-07-05".to_string(),
            carrier: "Yamato".to_string(),
            tracking_number: "700000000002".to_string(),
            image_url: String::new(),
        }
    }

    #[test]
    fn cancellation_rejected_for_delivered_orders() {
        let error = check_eligibility(TransactionKind::Cancellation, &order(OrderStatus::Delivered))
            .expect_err("delivered orders cannot be cancelled");
        assert!(matches!(
            error,
            DomainError::IneligibleOrderStatus { kind: TransactionKind::Cancellation, .. }
        ));

        check_eligibility(TransactionKind::Cancellation, &order(OrderStatus::Processing))
            .expect("processing orders can be cancelled");
    }

    #[test]
    fn return_and_warranty_require_delivery() {
        for kind in [TransactionKind::Return, TransactionKind::Warranty] {
            check_eligibility(kind, &order(OrderStatus::Delivered)).expect("delivered is eligible");
            let error = check_eligibility(kind, &order(OrderStatus::Shipped))
                .expect_err("undelivered orders are ineligible");
            assert!(error.to_string().contains("shipped"), "message names the status: {error}");
        }
    }

    #[test]
    fn affirmative_detection_is_token_based() {
        struct Case {
            message: &'static str,
            affirmative: bool,
        }

        let cases = vec![
            Case { message: "yes", affirmative: true },
            Case { message: "Yes, go ahead!", affirmative: true },
            Case { message: "ok then", affirmative: true },
            Case { message: "yeah proceed.", affirmative: true },
            Case { message: "no", affirmative: false },
            Case { message: "not yet", affirmative: false },
            // "yesterday" contains "yes" but is not an affirmative token.
            Case { message: "it broke yesterday", affirmative: false },
            Case { message: "", affirmative: false },
        ];

        for case in cases {
            assert_eq!(is_affirmative(case.message), case.affirmative, "{}", case.message);
        }
    }

    #[test]
    fn free_text_reasons_map_to_canonical_labels() {
        struct Case {
            kind: TransactionKind,
            text: &'static str,
            expect: &'static str,
        }

        let cases = vec![
            Case { kind: TransactionKind::Return, text: "the screen is broken", expect: "Faulty/Defective" },
            Case { kind: TransactionKind::Return, text: "you sent the wrong one", expect: "Wrong item received" },
            Case { kind: TransactionKind::Return, text: "doesn't match the description", expect: "Item not as described" },
            Case { kind: TransactionKind::Return, text: "i changed mind", expect: "No longer needed" },
            Case { kind: TransactionKind::Return, text: "meh", expect: "Other" },
            Case { kind: TransactionKind::Warranty, text: "battery drains in an hour", expect: "Battery issues" },
            Case { kind: TransactionKind::Warranty, text: "screen flickers", expect: "Screen problems" },
            Case { kind: TransactionKind::Cancellation, text: "found a better price elsewhere", expect: "Found better price elsewhere" },
            Case { kind: TransactionKind::Cancellation, text: "ordered by mistake", expect: "Ordered by mistake" },
        ];

        for case in cases {
            assert_eq!(canonical_reason(case.kind, case.text), case.expect, "{}", case.text);
        }
    }

    #[test]
    fn canonical_labels_pass_through_unchanged() {
        for kind in
            [TransactionKind::Cancellation, TransactionKind::Return, TransactionKind::Warranty]
        {
            for reason in super::reasons_for(kind) {
                assert_eq!(canonical_reason(kind, reason), *reason);
            }
        }
    }
}
