//! Authentication service.
//!
//! Handles credential verification, JWT token management, and password
//! hashing. Login failures are constant-shape: the same error is returned
//! whether the email was unknown or the password wrong.

use std::sync::Arc;

use bcrypt::{hash, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authz::Subject;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::user::User;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Username
    pub username: String,
    /// Email
    pub email: String,
    /// Account confirmed
    pub confirmed: bool,
    /// Assigned role, if any
    pub role_id: Option<Uuid>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type: "access", "refresh" or "confirm"
    pub token_type: String,
}

/// Token pair response
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Authentication service
pub struct AuthService {
    db: PgPool,
    config: Arc<Config>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let secret = config.jwt_secret.clone();
        Self {
            db,
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Authenticate a user with email and password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<(User, TokenPair)> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, confirmed, role_id,
                   last_login_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("invalid email or password".to_string()))?;

        if !user.verify_password(password) {
            return Err(AppError::Authentication(
                "invalid email or password".to_string(),
            ));
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(&user)?;

        Ok((user, tokens))
    }

    /// Generate access and refresh tokens for a user
    pub fn generate_tokens(&self, user: &User) -> Result<TokenPair> {
        let now = Utc::now();
        let access_exp = now + Duration::minutes(self.config.jwt_access_token_expiry_minutes);
        let refresh_exp = now + Duration::days(self.config.jwt_refresh_token_expiry_days);

        let access_token = encode(
            &Header::default(),
            &self.claims_for(user, now.timestamp(), access_exp.timestamp(), "access"),
            &self.encoding_key,
        )?;

        let refresh_token = encode(
            &Header::default(),
            &self.claims_for(user, now.timestamp(), refresh_exp.timestamp(), "refresh"),
            &self.encoding_key,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: (self.config.jwt_access_token_expiry_minutes * 60) as u64,
        })
    }

    /// Generate an account-confirmation token for a freshly registered user
    pub fn generate_confirmation_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.config.confirm_token_expiry_minutes);
        let token = encode(
            &Header::default(),
            &self.claims_for(user, now.timestamp(), exp.timestamp(), "confirm"),
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Validate an access token and return the request subject
    pub fn validate_access_token(&self, token: &str) -> Result<Subject> {
        let claims = self.decode_token_of_type(token, "access")?;
        Ok(Subject {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            confirmed: claims.confirmed,
            role_id: claims.role_id,
        })
    }

    /// Validate a confirmation token and return the user id it names
    pub fn validate_confirmation_token(&self, token: &str) -> Result<Uuid> {
        let claims = self.decode_token_of_type(token, "confirm")?;
        Ok(claims.sub)
    }

    /// Refresh the token pair using a refresh token
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<(User, TokenPair)> {
        let claims = self.decode_token_of_type(refresh_token, "refresh")?;

        // Fetch fresh user data so a role change takes effect on refresh
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, confirmed, role_id,
                   last_login_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(claims.sub)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("user not found".to_string()))?;

        let tokens = self.generate_tokens(&user)?;
        Ok((user, tokens))
    }

    fn claims_for(&self, user: &User, iat: i64, exp: i64, token_type: &str) -> Claims {
        Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            confirmed: user.confirmed,
            role_id: user.role_id,
            iat,
            exp,
            token_type: token_type.to_string(),
        }
    }

    /// Decode a token and reject type mismatches (a refresh token must not
    /// pass as an access token, a confirmation token must not log anyone in).
    fn decode_token_of_type(&self, token: &str, expected: &str) -> Result<Claims> {
        let data: TokenData<Claims> =
            decode::<Claims>(token, &self.decoding_key, &Validation::default())
                .map_err(|e| AppError::Authentication(format!("invalid token: {}", e)))?;

        if data.claims.token_type != expected {
            return Err(AppError::Authentication("invalid token type".to_string()));
        }

        Ok(data.claims)
    }

    /// Hash a password
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing_round_trip() {
        let password = "correct horse battery staple";
        let hash = AuthService::hash_password(password).unwrap();
        assert!(bcrypt::verify(password, &hash).unwrap());
        assert!(!bcrypt::verify("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_claims_serde_round_trip() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            confirmed: true,
            role_id: Some(Uuid::new_v4()),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            token_type: "access".into(),
        };
        let json = serde_json::to_string(&claims).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sub, claims.sub);
        assert_eq!(back.token_type, "access");
        assert_eq!(back.role_id, claims.role_id);
    }

    #[test]
    fn test_token_type_discrimination() {
        // Encode/decode without a database: keys built directly.
        let secret = b"test-secret";
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            confirmed: false,
            role_id: None,
            iat: now,
            exp: now + 3600,
            token_type: "confirm".into(),
        };
        let token = encode(&Header::default(), &claims, &encoding_key).unwrap();

        let decoded =
            decode::<Claims>(&token, &decoding_key, &Validation::default()).unwrap();
        assert_eq!(decoded.claims.token_type, "confirm");
        // An access-token consumer must reject it on the type field.
        assert_ne!(decoded.claims.token_type, "access");
    }
}
