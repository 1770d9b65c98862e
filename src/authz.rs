//! Authorization core: request identity and the permission-check logic.
//!
//! Identity is always passed explicitly — there is no ambient "current user".
//! The decision functions here are pure; [`crate::services::authz_service`]
//! loads the grant snapshots from the database and delegates to them.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

/// The authenticated principal attached to a request.
#[derive(Debug, Clone, Serialize)]
pub struct Subject {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub confirmed: bool,
    pub role_id: Option<Uuid>,
}

/// Who is making the request: a known user, or nobody.
///
/// `Anonymous` is a real value, not a missing one — handlers receive it when
/// no valid bearer token accompanies the request, and every check below is
/// total over both variants.
#[derive(Debug, Clone, Serialize)]
pub enum Identity {
    Authenticated(Subject),
    Anonymous,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn subject(&self) -> Option<&Subject> {
        match self {
            Identity::Authenticated(s) => Some(s),
            Identity::Anonymous => None,
        }
    }
}

/// Why an authorization check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DenyReason {
    /// No authenticated identity on the request.
    Anonymous,
    /// A required permission name does not exist in the permission registry.
    UnknownPermission(String),
    /// The subject's role does not grant a required permission.
    MissingPermission(String),
}

/// Outcome of an authorization check, suitable for explicit guard calls at
/// the top of protected handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AccessDecision {
    Allowed,
    Denied(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    /// Turn a denial into the uniform 403 error for handler guards.
    pub fn require(self) -> crate::error::Result<()> {
        match self {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied(reason) => {
                Err(crate::error::AppError::Authorization(reason.to_string()))
            }
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::Anonymous => write!(f, "authentication required"),
            DenyReason::UnknownPermission(name) => {
                write!(f, "unknown permission '{}'", name)
            }
            DenyReason::MissingPermission(name) => {
                write!(f, "missing permission '{}'", name)
            }
        }
    }
}

/// Core subset check: does a grant set satisfy every required permission?
///
/// `known` is the full permission registry. A required name absent from it is
/// never silently skipped — the whole check fails, keeping a typo in a
/// caller's requirement list from widening access.
///
/// An empty requirement list passes trivially (vacuous truth).
pub fn check(granted: &HashSet<String>, known: &HashSet<String>, required: &[String]) -> bool {
    required
        .iter()
        .all(|name| known.contains(name) && granted.contains(name))
}

/// Full decision over an identity.
///
/// Anonymous subjects are denied any non-empty requirement. The empty
/// requirement list passes for every subject, anonymous included.
pub fn decide(
    identity: &Identity,
    granted: &HashSet<String>,
    known: &HashSet<String>,
    required: &[String],
) -> AccessDecision {
    if required.is_empty() {
        return AccessDecision::Allowed;
    }

    if identity.is_anonymous() {
        return AccessDecision::Denied(DenyReason::Anonymous);
    }

    for name in required {
        if !known.contains(name) {
            return AccessDecision::Denied(DenyReason::UnknownPermission(name.clone()));
        }
        if !granted.contains(name) {
            return AccessDecision::Denied(DenyReason::MissingPermission(name.clone()));
        }
    }

    AccessDecision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn req(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn subject(role_id: Option<Uuid>) -> Identity {
        Identity::Authenticated(Subject {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            confirmed: true,
            role_id,
        })
    }

    #[test]
    fn test_check_allows_when_all_granted() {
        let granted = set(&["read", "write"]);
        let known = set(&["read", "write", "admin"]);
        assert!(check(&granted, &known, &req(&["read"])));
        assert!(check(&granted, &known, &req(&["read", "write"])));
    }

    #[test]
    fn test_check_denies_missing_grant() {
        let granted = set(&["read"]);
        let known = set(&["read", "admin"]);
        assert!(!check(&granted, &known, &req(&["admin"])));
        assert!(!check(&granted, &known, &req(&["read", "admin"])));
    }

    #[test]
    fn test_check_denies_unknown_permission_name() {
        // "fly" is in nobody's registry; it must fail the whole check even
        // when every other requirement is satisfied.
        let granted = set(&["read", "fly"]);
        let known = set(&["read"]);
        assert!(!check(&granted, &known, &req(&["read", "fly"])));
    }

    #[test]
    fn test_check_empty_requirement_is_vacuously_true() {
        assert!(check(&set(&[]), &set(&[]), &[]));
        assert!(check(&set(&["read"]), &set(&["read"]), &[]));
    }

    #[test]
    fn test_check_duplicate_required_names_collapse() {
        let granted = set(&["read"]);
        let known = set(&["read"]);
        assert!(check(&granted, &known, &req(&["read", "read"])));
    }

    #[test]
    fn test_anonymous_denied_any_nonempty_requirement() {
        let known = set(&["read", "admin"]);
        let decision = decide(&Identity::Anonymous, &set(&[]), &known, &req(&["admin"]));
        assert_eq!(decision, AccessDecision::Denied(DenyReason::Anonymous));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_anonymous_allowed_empty_requirement() {
        // Vacuous truth applies to every subject, anonymous included.
        let decision = decide(&Identity::Anonymous, &set(&[]), &set(&[]), &[]);
        assert_eq!(decision, AccessDecision::Allowed);
    }

    #[test]
    fn test_subject_without_role_is_unprivileged_not_an_error() {
        let known = set(&["read"]);
        let decision = decide(&subject(None), &set(&[]), &known, &req(&["read"]));
        assert_eq!(
            decision,
            AccessDecision::Denied(DenyReason::MissingPermission("read".into()))
        );
    }

    #[test]
    fn test_decide_reports_unknown_before_missing() {
        let granted = set(&["read"]);
        let known = set(&["read"]);
        let decision = decide(
            &subject(Some(Uuid::new_v4())),
            &granted,
            &known,
            &req(&["fly"]),
        );
        assert_eq!(
            decision,
            AccessDecision::Denied(DenyReason::UnknownPermission("fly".into()))
        );
    }

    #[test]
    fn test_decide_allows_granted_subject() {
        let granted = set(&["read", "write", "moderate", "admin"]);
        let known = granted.clone();
        let decision = decide(
            &subject(Some(Uuid::new_v4())),
            &granted,
            &known,
            &req(&["admin"]),
        );
        assert_eq!(decision, AccessDecision::Allowed);
    }
}
