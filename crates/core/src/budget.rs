//! Free-text budget phrases ("under 50k", "around 80000 yen") parsed into a
//! structured price constraint.
//!
//! The user-facing currency is Yen; the search backend prices in INR. A
//! constraint carries bounds in both currencies so display and filtering
//! never mix units.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetKind {
    Below,
    Above,
    Around,
}

/// Produced fresh per purchase-flow turn, never persisted beyond it.
#[derive(Clone, Debug, PartialEq)]
pub struct BudgetConstraint {
    pub kind: BudgetKind,
    pub low_jpy: f64,
    pub high_jpy: f64,
    pub low_inr: f64,
    pub high_inr: f64,
    /// The literal amount the user mentioned; only meaningful for `Around`.
    pub target_jpy: f64,
}

impl BudgetConstraint {
    /// Strict membership test in the display currency.
    pub fn admits_jpy(&self, price_jpy: i64) -> bool {
        let price = price_jpy as f64;
        match self.kind {
            BudgetKind::Below => price <= self.high_jpy,
            BudgetKind::Above => price >= self.low_jpy,
            BudgetKind::Around => price >= self.low_jpy && price <= self.high_jpy,
        }
    }
}

const BELOW_WORDS: &[&str] = &["under", "below", "less than", "upto", "max", "maximum", "at most"];
const ABOVE_WORDS: &[&str] = &["over", "above", "more than", "minimum", "at least"];
const AROUND_WORDS: &[&str] = &["around", "about", "approximately", "~", "avg", "average"];

/// Parses a budget phrase. Returns `None` when no numeric value is present.
///
/// A trailing `k`/`K` on the number means ×1000; otherwise the first run of
/// digits is taken. Keyword classes are checked below → above → around; an
/// ambiguous bare number defaults to an upper bound.
pub fn parse_budget(text: &str, yen_to_inr_rate: f64, around_band: f64) -> Option<BudgetConstraint> {
    let lowered = text.to_lowercase();
    let amount_jpy = extract_amount(&lowered)?;
    let amount_inr = amount_jpy * yen_to_inr_rate;

    let kind = if BELOW_WORDS.iter().any(|w| lowered.contains(w)) {
        BudgetKind::Below
    } else if ABOVE_WORDS.iter().any(|w| lowered.contains(w)) {
        BudgetKind::Above
    } else if AROUND_WORDS.iter().any(|w| lowered.contains(w)) {
        BudgetKind::Around
    } else {
        BudgetKind::Below
    };

    let constraint = match kind {
        BudgetKind::Below => BudgetConstraint {
            kind,
            low_jpy: 0.0,
            high_jpy: amount_jpy,
            low_inr: 0.0,
            high_inr: amount_inr,
            target_jpy: amount_jpy,
        },
        BudgetKind::Above => BudgetConstraint {
            kind,
            low_jpy: amount_jpy,
            high_jpy: f64::INFINITY,
            low_inr: amount_inr,
            high_inr: f64::INFINITY,
            target_jpy: amount_jpy,
        },
        BudgetKind::Around => BudgetConstraint {
            kind,
            low_jpy: amount_jpy * (1.0 - around_band),
            high_jpy: amount_jpy * (1.0 + around_band),
            low_inr: amount_inr * (1.0 - around_band),
            high_inr: amount_inr * (1.0 + around_band),
            target_jpy: amount_jpy,
        },
    };

    Some(constraint)
}

/// A number with a trailing `k` wins over a bare digit run anywhere earlier
/// in the phrase ("i5 under 50k" must read 50000, not 5).
fn extract_amount(lowered: &str) -> Option<f64> {
    if let Some(amount) = find_number(lowered, true) {
        return Some(amount * 1000.0);
    }
    find_number(lowered, false)
}

fn find_number(lowered: &str, require_k_suffix: bool) -> Option<f64> {
    let bytes = lowered.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }

        let start = index;
        let mut seen_dot = false;
        while index < bytes.len()
            && (bytes[index].is_ascii_digit() || (bytes[index] == b'.' && !seen_dot))
        {
            if bytes[index] == b'.' {
                seen_dot = true;
            }
            index += 1;
        }

        let number: f64 = match lowered[start..index].trim_end_matches('.').parse() {
            Ok(value) => value,
            Err(_) => continue,
        };

        if !require_k_suffix {
            return Some(number);
        }

        let mut cursor = index;
        while cursor < bytes.len() && bytes[cursor] == b' ' {
            cursor += 1;
        }
        if bytes.get(cursor) == Some(&b'k') {
            // A bare `k` only; "km" or "kg" is not a thousands suffix.
            if !bytes.get(cursor + 1).is_some_and(|b| b.is_ascii_alphanumeric()) {
                return Some(number);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{parse_budget, BudgetKind};

    const RATE: f64 = 0.60;
    const BAND: f64 = 0.20;

    #[test]
    fn under_with_k_suffix() {
        let constraint = parse_budget("under 50k", RATE, BAND).expect("parses");
        assert_eq!(constraint.kind, BudgetKind::Below);
        assert_eq!(constraint.high_jpy, 50_000.0);
        assert_eq!(constraint.high_inr, 30_000.0);
        assert!(constraint.admits_jpy(50_000));
        assert!(!constraint.admits_jpy(50_001));
    }

    #[test]
    fn around_builds_twenty_percent_band() {
        let constraint = parse_budget("around 80000", RATE, BAND).expect("parses");
        assert_eq!(constraint.kind, BudgetKind::Around);
        assert_eq!(constraint.target_jpy, 80_000.0);
        assert_eq!(constraint.low_jpy, 64_000.0);
        assert_eq!(constraint.high_jpy, 96_000.0);
        assert!(constraint.admits_jpy(64_000));
        assert!(constraint.admits_jpy(96_000));
        assert!(!constraint.admits_jpy(63_999));
    }

    #[test]
    fn over_sets_lower_bound_only() {
        let constraint = parse_budget("over 30000 yen", RATE, BAND).expect("parses");
        assert_eq!(constraint.kind, BudgetKind::Above);
        assert_eq!(constraint.low_jpy, 30_000.0);
        assert!(constraint.admits_jpy(30_000));
        assert!(constraint.admits_jpy(9_999_999));
        assert!(!constraint.admits_jpy(29_999));
    }

    #[test]
    fn bare_number_defaults_to_upper_bound() {
        let constraint = parse_budget("50000", RATE, BAND).expect("parses");
        assert_eq!(constraint.kind, BudgetKind::Below);
        assert_eq!(constraint.high_jpy, 50_000.0);
    }

    #[test]
    fn keyword_priority_below_beats_around() {
        // "at most about 60k": below-words win per the classification order.
        let constraint = parse_budget("at most about 60k", RATE, BAND).expect("parses");
        assert_eq!(constraint.kind, BudgetKind::Below);
        assert_eq!(constraint.high_jpy, 60_000.0);
    }

    #[test]
    fn k_suffix_wins_over_earlier_digits() {
        let constraint = parse_budget("core i5 under 50k", RATE, BAND).expect("parses");
        assert_eq!(constraint.high_jpy, 50_000.0);
    }

    #[test]
    fn fractional_k_amounts() {
        let constraint = parse_budget("upto 7.5k", RATE, BAND).expect("parses");
        assert_eq!(constraint.high_jpy, 7_500.0);
    }

    #[test]
    fn no_digits_is_no_constraint() {
        assert!(parse_budget("something cheap please", RATE, BAND).is_none());
        assert!(parse_budget("", RATE, BAND).is_none());
    }
}
