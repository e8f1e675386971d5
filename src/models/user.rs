//! User model
//!
//! Users are the editors who sign in to the admin API. There are no roles:
//! any authenticated user can manage every collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered admin user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// Email address (unique, used to log in)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user. The password must already be hashed.
    pub fn new(email: String, password_hash: String, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email,
            password_hash,
            name,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name to show in the admin, falling back to the email
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Input for updating a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub name: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = User::new("ink@example.com".to_string(), "hash".to_string(), None);
        assert_eq!(user.display_name(), "ink@example.com");

        user.name = Some("  ".to_string());
        assert_eq!(user.display_name(), "ink@example.com");

        user.name = Some("Ink".to_string());
        assert_eq!(user.display_name(), "Ink");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("ink@example.com".to_string(), "secret_hash".to_string(), None);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret_hash"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_update_input_distinguishes_null_from_absent() {
        let absent: UpdateUserInput = serde_json::from_str(r#"{}"#).unwrap();
        assert!(absent.name.is_none());

        let cleared: UpdateUserInput = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(cleared.name, Some(None));

        let set: UpdateUserInput = serde_json::from_str(r#"{"name": "Ink"}"#).unwrap();
        assert_eq!(set.name, Some(Some("Ink".to_string())));
    }
}
