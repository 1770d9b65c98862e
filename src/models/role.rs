//! Role and permission models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A named capability that can be required by a protected action.
///
/// Permissions are owned by the seed spec: they are inserted or updated at
/// bootstrap and never mutated at request time.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A named bundle of permissions assignable to a user.
///
/// Membership lives in the `role_permissions` join table; its composite
/// primary key keeps the set duplicate-free.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// New users without an allow-listed email get the role carrying this
    /// flag. Seeding guarantees exactly one role has it.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
