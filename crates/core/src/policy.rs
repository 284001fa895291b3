//! Warranty policy copy shown before a claim is opened. Deployments override
//! the shipped text with a TOML file; the built-in default keeps the flow
//! working when none is configured.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyPolicy {
    pub company: String,
    pub policy_type: String,
    pub clauses: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("could not read policy file `{path}`: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("could not parse policy file `{path}`: {source}")]
    Parse { path: String, source: toml::de::Error },
}

impl Default for WarrantyPolicy {
    fn default() -> Self {
        Self {
            company: "Shopmate".to_string(),
            policy_type: "Laptop Warranty".to_string(),
            clauses: vec![
                "Every laptop carries a 1-year warranty from the date of purchase.".to_string(),
                "The warranty covers manufacturing defects in materials and workmanship."
                    .to_string(),
                "Damage from accidents, misuse, unauthorized repairs, or normal wear is not covered."
                    .to_string(),
                "A valid purchase invoice is required for any claim.".to_string(),
                "We may repair, replace, or refund the product at our discretion.".to_string(),
            ],
        }
    }
}

impl WarrantyPolicy {
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| PolicyError::Read { path: path.display().to_string(), source })?;
        toml::from_str(&raw)
            .map_err(|source| PolicyError::Parse { path: path.display().to_string(), source })
    }

    /// Numbered policy text as shown in the chat.
    pub fn render_text(&self) -> String {
        let mut text = format!("{} - {}:\n\n", self.company, self.policy_type);
        for (index, clause) in self.clauses.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", index + 1, clause));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::WarrantyPolicy;

    #[test]
    fn default_policy_renders_numbered_clauses() {
        let text = WarrantyPolicy::default().render_text();
        assert!(text.starts_with("Shopmate - Laptop Warranty:"));
        assert!(text.contains("1. Every laptop carries a 1-year warranty"));
        assert!(text.contains("5. We may repair, replace, or refund"));
    }

    #[test]
    fn loads_policy_overrides_from_toml() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("warranty.toml");
        fs::write(
            &path,
            r#"
company = "Acme Devices"
policy_type = "Tablet Warranty"
clauses = ["Two years, no questions."]
"#,
        )
        .expect("write policy");

        let policy = WarrantyPolicy::load(&path).expect("load");
        assert_eq!(policy.company, "Acme Devices");
        assert_eq!(policy.clauses.len(), 1);
        assert!(policy.render_text().contains("1. Two years, no questions."));
    }
}
