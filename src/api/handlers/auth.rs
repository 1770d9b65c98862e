//! Authentication handlers: registration, confirmation, login, tokens.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::SharedState;
use crate::authz::Identity;
use crate::error::{AppError, Result};
use crate::models::user::User;

/// Create public auth routes (no auth required)
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/confirm", post(confirm))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
}

/// Create protected auth routes (confirmed account required)
pub fn protected_router() -> Router<SharedState> {
    Router::new().route("/me", get(get_current_user))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserResponse,
    /// Confirmation token. A full deployment would mail this to the user;
    /// the tutorial API returns it directly.
    pub confirmation_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub confirmed: bool,
    pub role_id: Option<Uuid>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            confirmed: user.confirmed,
            role_id: user.role_id,
        }
    }
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username or email already registered")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let user = state
        .user_service()
        .register(
            &payload.username,
            &payload.email,
            &payload.password,
            &state.seed,
        )
        .await?;

    let confirmation_token = state.auth_service().generate_confirmation_token(&user)?;

    Ok(Json(RegisterResponse {
        user: user.into(),
        confirmation_token,
    }))
}

/// Confirm a registered account
#[utoipa::path(
    post,
    path = "/confirm",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = ConfirmRequest,
    responses(
        (status = 200, description = "Account confirmed", body = UserResponse),
        (status = 401, description = "Invalid or expired confirmation token")
    )
)]
pub async fn confirm(
    State(state): State<SharedState>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<UserResponse>> {
    let user_id = state
        .auth_service()
        .validate_confirmation_token(&payload.token)?;
    let user = state.user_service().confirm(user_id).await?;
    Ok(Json(user.into()))
}

/// Login with credentials
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (_user, tokens) = state
        .auth_service()
        .authenticate(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        token_type: "Bearer".to_string(),
    }))
}

/// Refresh access token
#[utoipa::path(
    post,
    path = "/refresh",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<SharedState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<LoginResponse>> {
    let (_user, tokens) = state
        .auth_service()
        .refresh_tokens(&payload.refresh_token)
        .await?;

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        token_type: "Bearer".to_string(),
    }))
}

/// Logout current session
#[utoipa::path(
    post,
    path = "/logout",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout() -> Result<()> {
    // Tokens are stateless; logout is handled client-side by discarding them.
    Ok(())
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/me",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserResponse>> {
    let subject = identity
        .subject()
        .ok_or_else(|| AppError::Authentication("not authenticated".to_string()))?;

    let user = state.user_service().get(subject.user_id).await?;
    Ok(Json(user.into()))
}

#[derive(OpenApi)]
#[openapi(
    paths(register, confirm, login, refresh_token, logout, get_current_user),
    components(schemas(
        RegisterRequest,
        RegisterResponse,
        ConfirmRequest,
        LoginRequest,
        LoginResponse,
        RefreshTokenRequest,
        UserResponse,
    ))
)]
pub struct AuthApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_register_request_deserialize() {
        let json = r#"{"username": "alice", "email": "alice@example.com", "password": "hunter22"}"#;
        let req: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.username, "alice");
        assert_eq!(req.email, "alice@example.com");
    }

    #[test]
    fn test_register_request_missing_field() {
        let json = r#"{"username": "alice"}"#;
        assert!(serde_json::from_str::<RegisterRequest>(json).is_err());
    }

    #[test]
    fn test_login_response_serialize() {
        let resp = LoginResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: 1800,
            token_type: "Bearer".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 1800);
    }

    #[test]
    fn test_user_response_from_user_omits_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: Some("$2b$12$hash".into()),
            confirmed: false,
            role_id: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let resp = UserResponse::from(user);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["confirmed"], false);
        assert!(json["role_id"].is_null());
    }
}
