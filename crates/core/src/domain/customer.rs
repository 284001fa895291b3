use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

/// Identity snapshot taken when the session is opened. Immutable for the
/// session's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub customer_id: CustomerId,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let customer_id = CustomerId(format!("CUST-{user_id}"));
        Self { user_id, username: username.into(), first_name: None, customer_id }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or(&self.username)
    }
}
