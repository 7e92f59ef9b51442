//! User account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration payload submitted to `POST /register`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    /// Display name
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    /// Login email (unique)
    #[validate(email)]
    pub email: String,
    /// Plaintext password (hashed before storage)
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Stored user row.
///
/// `balance` is the remaining account balance in currency units,
/// `minutes_used` the lifetime total of processed media minutes, and
/// `ad_revenue` accumulated ad earnings credited back to the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// SHA-256 hex digest of the password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: f64,
    pub minutes_used: f64,
    pub ad_revenue: f64,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Whether the account can start a new paid processing run.
    pub fn has_positive_balance(&self) -> bool {
        self.balance > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "correct-horse".into(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = RegisterUser {
            email: "not-an-email".into(),
            ..ok.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterUser {
            password: "short".into(),
            ..ok
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let record = UserRecord {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "deadbeef".into(),
            balance: 10.0,
            minutes_used: 0.0,
            ad_revenue: 0.0,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("deadbeef"));
    }
}
