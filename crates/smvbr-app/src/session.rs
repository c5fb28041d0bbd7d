// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// The signed-in user, passed explicitly to every user-scoped call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|name: &String| !name.trim().is_empty());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into()).filter(|email: &String| !email.trim().is_empty());
        self
    }

    pub fn greeting_name(&self) -> &str {
        self.name.as_deref().unwrap_or("user")
    }
}

#[cfg(test)]
mod tests {
    use super::SessionContext;
    use crate::UserId;

    #[test]
    fn blank_profile_fields_stay_unset() {
        let session = SessionContext::new(UserId::new(3))
            .with_name("  ")
            .with_email("ana@example.com");
        assert_eq!(session.name, None);
        assert_eq!(session.email.as_deref(), Some("ana@example.com"));
        assert_eq!(session.greeting_name(), "user");
    }

    #[test]
    fn serializes_without_empty_fields() -> anyhow::Result<()> {
        let session = SessionContext::new(UserId::new(8));
        let encoded = serde_json::to_string(&session)?;
        assert_eq!(encoded, r#"{"user_id":8}"#);
        Ok(())
    }
}
