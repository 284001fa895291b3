use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// A ranked catalog record as surfaced to the user. Prices carry both the
/// display currency (JPY) and the search backend's native currency (INR) so
/// display and filtering never mix units.
///
/// Invariant: `price_jpy > 0` for any record that reaches the user; the
/// finder drops candidates that fail this during normalisation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub brand: String,
    pub name: String,
    pub price_jpy: i64,
    pub price_inr: f64,
    pub ram: String,
    pub storage: String,
    pub processor: String,
    pub rating: f64,
    pub reviews: u32,
    pub colors: Option<String>,
    pub image_url: String,
    pub summary: String,
    pub score: f64,
}

impl ProductRecord {
    pub fn display_label(&self) -> String {
        format!("{} {} - ¥{}", self.brand, self.name, group_thousands(self.price_jpy))
    }

    pub fn has_color_info(&self) -> bool {
        self.colors.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// ¥ amounts are printed with thousands separators everywhere the user sees
/// them.
pub fn group_thousands(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::{group_thousands, ProductId, ProductRecord};

    fn record(price_jpy: i64) -> ProductRecord {
        ProductRecord {
            id: ProductId("lap-1".to_string()),
            brand: "Lenovo".to_string(),
            name: "IdeaPad Slim 3".to_string(),
            price_jpy,
            price_inr: price_jpy as f64 * 0.6,
            ram: "8GB".to_string(),
            storage: "512GB SSD".to_string(),
            processor: "Ryzen 5".to_string(),
            rating: 4.2,
            reviews: 311,
            colors: None,
            image_url: String::new(),
            summary: "Ryzen 5 • 8GB • 512GB SSD".to_string(),
            score: 0.42,
        }
    }

    #[test]
    fn groups_thousands_for_display() {
        assert_eq!(group_thousands(49), "49");
        assert_eq!(group_thousands(4_990), "4,990");
        assert_eq!(group_thousands(1_249_000), "1,249,000");
        assert_eq!(group_thousands(-56_000), "-56,000");
    }

    #[test]
    fn display_label_includes_brand_and_price() {
        assert_eq!(record(83_317).display_label(), "Lenovo IdeaPad Slim 3 - ¥83,317");
    }

    #[test]
    fn empty_color_field_counts_as_missing() {
        let mut rec = record(50_000);
        assert!(!rec.has_color_info());
        rec.colors = Some(String::new());
        assert!(!rec.has_color_info());
        rec.colors = Some("Arctic Grey, Abyss Blue".to_string());
        assert!(rec.has_color_info());
    }
}
