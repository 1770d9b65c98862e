//! Database-backed authorization checks.
//!
//! Loads the grant snapshot for a subject's role and the known-permission set,
//! then delegates the decision to the pure logic in [`crate::authz`].
//! Checks are pure reads; denial is a value, not an error.

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::authz::{self, AccessDecision, DenyReason, Identity};
use crate::error::Result;

/// Authorization service
pub struct AuthzService {
    db: PgPool,
}

impl AuthzService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// `can(subject, [permission_names])` — the uniform boolean contract.
    pub async fn can(&self, identity: &Identity, required: &[String]) -> Result<bool> {
        Ok(self.authorize(identity, required).await?.is_allowed())
    }

    /// Explicit guard for protected handlers, returning a structured
    /// allow/deny decision.
    pub async fn authorize(
        &self,
        identity: &Identity,
        required: &[String],
    ) -> Result<AccessDecision> {
        // Vacuous truth: nothing required, nothing to load.
        if required.is_empty() {
            return Ok(AccessDecision::Allowed);
        }

        let subject = match identity.subject() {
            Some(s) => s,
            None => return Ok(AccessDecision::Denied(DenyReason::Anonymous)),
        };

        let known = self.resolve_permissions(required).await?;
        let granted = match subject.role_id {
            Some(role_id) => self.role_grants(role_id).await?,
            // No role assigned: a valid, unprivileged state.
            None => HashSet::new(),
        };

        Ok(authz::decide(identity, &granted, &known, required))
    }

    /// Resolve required names against the permission registry. Names absent
    /// from the result are unknown and fail the check in `decide`.
    async fn resolve_permissions(&self, names: &[String]) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM permissions WHERE name = ANY($1)")
                .bind(names)
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Permission names attached to a role.
    async fn role_grants(&self, role_id: Uuid) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT p.name
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

/// Convenience for building requirement lists from literals.
pub fn required(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_builds_owned_names() {
        assert_eq!(required(&["read", "admin"]), vec!["read", "admin"]);
        assert!(required(&[]).is_empty());
    }
}
