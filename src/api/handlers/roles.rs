//! Role and permission listing handlers.
//!
//! All routes here require the "admin" permission, checked through the
//! explicit authorize guard at the top of each handler.

use axum::{
    extract::{Extension, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use std::collections::HashMap;

use crate::api::SharedState;
use crate::authz::Identity;
use crate::error::{AppError, Result};
use crate::models::role::{Permission, Role};
use crate::services::authz_service::required;

/// Create role/permission routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/:name", get(get_role))
        .route("/permissions", get(list_permissions))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    /// Permission names granted to this role, sorted for stable output.
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionListResponse {
    pub permissions: Vec<Permission>,
}

impl RoleResponse {
    fn from_role(role: Role, permissions: Vec<String>) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
            is_default: role.is_default,
            permissions,
        }
    }
}

/// Grant names for every role in one pass, grouped by role id.
async fn load_all_role_permissions(state: &SharedState) -> Result<HashMap<Uuid, Vec<String>>> {
    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        r#"
        SELECT rp.role_id, p.name
        FROM role_permissions rp
        JOIN permissions p ON p.id = rp.permission_id
        ORDER BY rp.role_id, p.name
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(group_grants(rows))
}

/// Group (role_id, permission name) rows by role, preserving input order.
fn group_grants(rows: Vec<(Uuid, String)>) -> HashMap<Uuid, Vec<String>> {
    let mut grants: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (role_id, name) in rows {
        grants.entry(role_id).or_default().push(name);
    }
    grants
}

async fn load_role_permissions(state: &SharedState, role_id: Uuid) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT p.name
        FROM permissions p
        JOIN role_permissions rp ON rp.permission_id = p.id
        WHERE rp.role_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(role_id)
    .fetch_all(&state.db)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// List roles with their permissions
#[utoipa::path(
    get,
    path = "/roles",
    context_path = "/api/v1",
    tag = "roles",
    responses(
        (status = 200, description = "All roles", body = RoleListResponse),
        (status = 403, description = "Missing admin permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_roles(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<RoleListResponse>> {
    state
        .authz_service()
        .authorize(&identity, &required(&["admin"]))
        .await?
        .require()?;

    let rows: Vec<Role> = sqlx::query_as(
        "SELECT id, name, description, is_default, created_at, updated_at FROM roles ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;

    let mut grants = load_all_role_permissions(&state).await?;

    let roles = rows
        .into_iter()
        .map(|role| {
            let permissions = grants.remove(&role.id).unwrap_or_default();
            RoleResponse::from_role(role, permissions)
        })
        .collect();

    Ok(Json(RoleListResponse { roles }))
}

/// Get one role by name
#[utoipa::path(
    get,
    path = "/roles/{name}",
    context_path = "/api/v1",
    tag = "roles",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Role details", body = RoleResponse),
        (status = 403, description = "Missing admin permission"),
        (status = 404, description = "Role not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_role(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Result<Json<RoleResponse>> {
    state
        .authz_service()
        .authorize(&identity, &required(&["admin"]))
        .await?
        .require()?;

    let role: Role = sqlx::query_as(
        "SELECT id, name, description, is_default, created_at, updated_at FROM roles WHERE name = $1",
    )
    .bind(&name)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("role '{}' not found", name)))?;

    let permissions = load_role_permissions(&state, role.id).await?;

    Ok(Json(RoleResponse::from_role(role, permissions)))
}

/// List the permission registry
#[utoipa::path(
    get,
    path = "/permissions",
    context_path = "/api/v1",
    tag = "roles",
    responses(
        (status = 200, description = "All permissions", body = PermissionListResponse),
        (status = 403, description = "Missing admin permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_permissions(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<PermissionListResponse>> {
    state
        .authz_service()
        .authorize(&identity, &required(&["admin"]))
        .await?
        .require()?;

    let permissions: Vec<Permission> = sqlx::query_as(
        "SELECT id, name, description, created_at FROM permissions ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(PermissionListResponse { permissions }))
}

#[derive(OpenApi)]
#[openapi(
    paths(list_roles, get_role, list_permissions),
    components(schemas(RoleResponse, RoleListResponse, PermissionListResponse))
)]
pub struct RolesApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_response_serialize() {
        let resp = RoleResponse {
            id: Uuid::new_v4(),
            name: "Moderator".into(),
            description: Some("Content moderator".into()),
            is_default: false,
            permissions: vec!["moderate".into(), "read".into(), "write".into()],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["name"], "Moderator");
        assert_eq!(json["is_default"], false);
        assert_eq!(json["permissions"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_role_list_response_empty() {
        let json = serde_json::to_value(RoleListResponse { roles: vec![] }).unwrap();
        assert!(json["roles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_role_response_from_role() {
        let now = chrono::Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            name: "User".into(),
            description: Some("Default role".into()),
            is_default: true,
            created_at: now,
            updated_at: now,
        };
        let id = role.id;
        let resp = RoleResponse::from_role(role, vec!["read".into(), "write".into()]);
        assert_eq!(resp.id, id);
        assert_eq!(resp.name, "User");
        assert_eq!(resp.description.as_deref(), Some("Default role"));
        assert!(resp.is_default);
        assert_eq!(resp.permissions, vec!["read", "write"]);
    }

    #[test]
    fn test_group_grants_by_role() {
        let admin = Uuid::new_v4();
        let user = Uuid::new_v4();
        let rows = vec![
            (admin, "admin".to_string()),
            (admin, "moderate".to_string()),
            (admin, "read".to_string()),
            (user, "read".to_string()),
            (user, "write".to_string()),
        ];
        let grants = group_grants(rows);
        assert_eq!(grants[&admin], vec!["admin", "moderate", "read"]);
        assert_eq!(grants[&user], vec!["read", "write"]);
        assert!(!grants.contains_key(&Uuid::new_v4()));
    }
}
