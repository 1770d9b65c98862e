//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// User entity
///
/// The password is a write-only credential: setting it stores a bcrypt hash,
/// and no code path returns the plaintext afterwards. `password_hash` itself
/// is skipped during serialization so it never reaches API responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// False until the confirmation workflow completes.
    pub confirmed: bool,
    /// Absent role is a valid, unprivileged state — authorization checks
    /// treat it as an empty grant set, never as an error.
    pub role_id: Option<Uuid>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The write-only password property.
    ///
    /// Always fails: the plaintext is discarded at assignment and only the
    /// hash is stored. Kept as a method so misuse is an explicit error
    /// rather than a silently-available field.
    pub fn password(&self) -> Result<&str> {
        Err(AppError::Authorization(
            "password is not a readable attribute".to_string(),
        ))
    }

    /// Verify a submitted password against the stored hash.
    ///
    /// Returns false for a wrong password, an absent hash, or a bcrypt
    /// failure — callers get a plain boolean, never an error.
    pub fn verify_password(&self, password: &str) -> bool {
        match &self.password_hash {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(password_hash: Option<String>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash,
            confirmed: false,
            role_id: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_is_not_readable() {
        let hash = bcrypt::hash("cat", 4).unwrap();
        let user = test_user(Some(hash));
        let err = user.password().unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn test_verify_password() {
        // Min cost keeps the test fast; production hashing uses DEFAULT_COST.
        let hash = bcrypt::hash("cat", 4).unwrap();
        let user = test_user(Some(hash));
        assert!(user.verify_password("cat"));
        assert!(!user.verify_password("dog"));
    }

    #[test]
    fn test_verify_password_without_hash_is_false() {
        let user = test_user(None);
        assert!(!user.verify_password("anything"));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let hash = bcrypt::hash("cat", 4).unwrap();
        let user = test_user(Some(hash));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
