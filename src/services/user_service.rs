//! User registration and account lifecycle.

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::SeedSpec;
use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::services::auth_service::AuthService;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, confirmed, role_id, last_login_at, created_at, updated_at";

/// User service
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new, unconfirmed user.
    ///
    /// The role is chosen server-side: allow-listed emails get the "Admin"
    /// role, everyone else gets the default role. If neither lookup resolves
    /// the user is still created, with no role — a valid unprivileged state.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        seed: &SeedSpec,
    ) -> Result<User> {
        if username.trim().is_empty() {
            return Err(AppError::Validation("username must not be empty".into()));
        }
        if !email.contains('@') {
            return Err(AppError::Validation("invalid email address".into()));
        }
        if password.len() < 8 {
            return Err(AppError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }

        let password_hash = AuthService::hash_password(password)?;
        let role_id = self.pick_role(email, seed).await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(role_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(
                        "username or email already registered".to_string(),
                    );
                }
            }
            AppError::Database(e)
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Mark an account confirmed.
    pub async fn confirm(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET confirmed = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        tracing::info!(user_id = %user.id, "Account confirmed");

        Ok(user)
    }

    /// Fetch a user by id.
    pub async fn get(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }

    /// List users, newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        Ok((users, total.0))
    }

    /// Resolve the role for a new account: admin allow-list first, then the
    /// default role, then none.
    async fn pick_role(&self, email: &str, seed: &SeedSpec) -> Result<Option<Uuid>> {
        if seed.is_admin_email(email) {
            let admin: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM roles WHERE name = 'Admin'")
                    .fetch_optional(&self.db)
                    .await?;
            if let Some((id,)) = admin {
                return Ok(Some(id));
            }
            tracing::warn!(email, "Allow-listed email but no Admin role exists");
        }

        let default: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM roles WHERE is_default LIMIT 1")
                .fetch_optional(&self.db)
                .await?;

        Ok(default.map(|(id,)| id))
    }
}
