//! User management handlers (admin-permission protected).

use axum::{
    extract::{Extension, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::handlers::auth::UserResponse;
use crate::api::SharedState;
use crate::authz::Identity;
use crate::error::Result;
use crate::services::authz_service::required;

/// Create user routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub pagination: Pagination,
}

/// List users
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/users",
    tag = "users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Users, newest first", body = UserListResponse),
        (status = 403, description = "Missing admin permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<UserListResponse>> {
    state
        .authz_service()
        .authorize(&identity, &required(&["admin"]))
        .await?
        .require()?;

    let (users, total) = state
        .user_service()
        .list(query.per_page() as i64, query.offset())
        .await?;

    Ok(Json(UserListResponse {
        items: users.into_iter().map(UserResponse::from).collect(),
        pagination: Pagination::from_query_and_total(&query, total),
    }))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 403, description = "Missing admin permission"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    state
        .authz_service()
        .authorize(&identity, &required(&["admin"]))
        .await?
        .require()?;

    let user = state.user_service().get(id).await?;
    Ok(Json(user.into()))
}

#[derive(OpenApi)]
#[openapi(paths(list_users, get_user), components(schemas(UserListResponse)))]
pub struct UsersApiDoc;
