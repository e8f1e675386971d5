//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Login session. The id doubles as the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// New session with a random token, valid for `days`
    pub fn new(user_id: i64, days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: now + Duration::days(days),
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_valid() {
        let session = Session::new(1, 7);
        assert!(!session.is_expired());
        assert_eq!(session.id.len(), 32);
    }

    #[test]
    fn test_past_session_is_expired() {
        let mut session = Session::new(1, 7);
        session.expires_at = Utc::now() - Duration::hours(1);
        assert!(session.is_expired());
    }
}
