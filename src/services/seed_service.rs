//! Bootstrap seeding of permissions and roles.
//!
//! Runs once at startup, before the server binds. The whole pass executes in
//! a single transaction: either the complete permission graph lands, or
//! nothing does. Upserts keyed on unique names make the pass idempotent and
//! safe against concurrent seeding by multiple worker processes.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::SeedSpec;
use crate::error::{AppError, Result};

/// Permission upsert. The DO UPDATE is guarded so an unchanged row is left
/// untouched: reseeding with the same spec must not rewrite any state.
const UPSERT_PERMISSION: &str = r#"
    INSERT INTO permissions (name, description)
    VALUES ($1, $2)
    ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
    WHERE permissions.description IS DISTINCT FROM EXCLUDED.description
"#;

/// Role upsert, guarded the same way. No RETURNING clause: when the guard
/// suppresses the update there is no row to return, so the id is resolved
/// with a separate lookup afterwards.
const UPSERT_ROLE: &str = r#"
    INSERT INTO roles (name, description, is_default)
    VALUES ($1, $2, $3)
    ON CONFLICT (name) DO UPDATE SET
        description = EXCLUDED.description,
        is_default = EXCLUDED.is_default,
        updated_at = NOW()
    WHERE roles.description IS DISTINCT FROM EXCLUDED.description
       OR roles.is_default IS DISTINCT FROM EXCLUDED.is_default
"#;

const SELECT_ROLE_ID: &str = "SELECT id FROM roles WHERE name = $1";

/// Seeding service
pub struct SeedService {
    db: PgPool,
}

impl SeedService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply the seed spec: upsert permissions, then roles, then the
    /// role-permission links. A role referencing an unknown permission is a
    /// fatal configuration error and rolls the whole pass back.
    pub async fn seed(&self, spec: &SeedSpec) -> Result<()> {
        spec.validate()?;

        let mut tx = self.db.begin().await?;

        for perm in &spec.permissions {
            sqlx::query(UPSERT_PERMISSION)
                .bind(&perm.name)
                .bind(&perm.description)
                .execute(&mut *tx)
                .await?;
        }

        for role in &spec.roles {
            sqlx::query(UPSERT_ROLE)
                .bind(&role.name)
                .bind(&role.description)
                .bind(role.is_default)
                .execute(&mut *tx)
                .await?;

            let role_id: (Uuid,) = sqlx::query_as(SELECT_ROLE_ID)
                .bind(&role.name)
                .fetch_one(&mut *tx)
                .await?;

            for perm_name in &role.permissions {
                Self::link_permission(&mut tx, role_id.0, &role.name, perm_name).await?;
            }

            tracing::debug!(role = %role.name, permissions = role.permissions.len(), "Seeded role");
        }

        // The validated spec guarantees exactly one default among the seeded
        // roles, but a previous deployment may have left another role flagged.
        // Clear stale flags so the invariant holds across reseeds.
        let default_name = spec
            .roles
            .iter()
            .find(|r| r.is_default)
            .map(|r| r.name.clone())
            .ok_or_else(|| AppError::Config("no default role in seed spec".into()))?;

        sqlx::query("UPDATE roles SET is_default = FALSE WHERE name <> $1 AND is_default")
            .bind(&default_name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            permissions = spec.permissions.len(),
            roles = spec.roles.len(),
            "Permission and role seed complete"
        );

        Ok(())
    }

    /// Link one permission to a role by name, resolving against storage
    /// inside the seeding transaction.
    async fn link_permission(
        tx: &mut Transaction<'_, Postgres>,
        role_id: Uuid,
        role_name: &str,
        perm_name: &str,
    ) -> Result<()> {
        let perm_id: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM permissions WHERE name = $1")
                .bind(perm_name)
                .fetch_optional(&mut **tx)
                .await?;

        let perm_id = perm_id.ok_or_else(|| {
            // Validation catches this before any SQL runs, but the in-transaction
            // check also covers specs whose permission rows failed to land.
            AppError::Config(format!(
                "role '{}' references unknown permission '{}'",
                role_name, perm_name
            ))
        })?;

        // Composite PK on the join table; re-linking is a no-op.
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(perm_id.0)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reseeding with an unchanged spec must not modify any row, so both
    // upserts have to carry a change guard on their DO UPDATE clause.

    #[test]
    fn test_permission_upsert_skips_unchanged_rows() {
        assert!(UPSERT_PERMISSION
            .contains("WHERE permissions.description IS DISTINCT FROM EXCLUDED.description"));
    }

    #[test]
    fn test_role_upsert_skips_unchanged_rows() {
        assert!(UPSERT_ROLE.contains("roles.description IS DISTINCT FROM EXCLUDED.description"));
        assert!(UPSERT_ROLE.contains("roles.is_default IS DISTINCT FROM EXCLUDED.is_default"));
        // updated_at only moves when the guard passes, i.e. on a real change.
        assert!(UPSERT_ROLE.contains("updated_at = NOW()"));
    }

    #[test]
    fn test_role_id_resolved_outside_upsert() {
        // A guarded upsert returns no row when the update is suppressed, so
        // the role id must come from a plain lookup instead of RETURNING.
        assert!(!UPSERT_ROLE.contains("RETURNING"));
        assert_eq!(SELECT_ROLE_ID, "SELECT id FROM roles WHERE name = $1");
    }
}
