//! Application configuration loaded from environment variables, plus the
//! permission/role seed specification consumed at bootstrap.

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level
    pub log_level: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token expiry in minutes
    pub jwt_access_token_expiry_minutes: i64,

    /// JWT refresh token expiry in days
    pub jwt_refresh_token_expiry_days: i64,

    /// Account confirmation token expiry in minutes
    pub confirm_token_expiry_minutes: i64,

    /// Optional path to a JSON seed spec overriding the built-in defaults
    pub seed_file: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?,
            jwt_access_token_expiry_minutes: env::var("JWT_ACCESS_TOKEN_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            jwt_refresh_token_expiry_days: env::var("JWT_REFRESH_TOKEN_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()
                .unwrap_or(7),
            confirm_token_expiry_minutes: env::var("CONFIRM_TOKEN_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .unwrap_or(60),
            seed_file: env::var("SEED_FILE").ok(),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("jwt_secret", &"[REDACTED]")
            .field(
                "jwt_access_token_expiry_minutes",
                &self.jwt_access_token_expiry_minutes,
            )
            .field(
                "jwt_refresh_token_expiry_days",
                &self.jwt_refresh_token_expiry_days,
            )
            .field(
                "confirm_token_expiry_minutes",
                &self.confirm_token_expiry_minutes,
            )
            .field("seed_file", &self.seed_file)
            .finish()
    }
}

/// A permission to seed: a named capability with an optional description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A role to seed: a named bundle of permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// At most one role may be flagged default; enforced by [`SeedSpec::validate`].
    #[serde(default)]
    pub is_default: bool,
    /// Permission names granted to this role. Must all resolve against
    /// the permission list.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// The full bootstrap seed: permissions, roles, and the administrator
/// email allow-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSpec {
    pub permissions: Vec<PermissionSpec>,
    pub roles: Vec<RoleSpec>,
    /// Emails that get the "Admin" role at registration regardless of the
    /// default-role flag.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl SeedSpec {
    /// Load a seed spec from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let spec: SeedSpec = serde_json::from_str(&raw)?;
        Ok(spec)
    }

    /// Built-in seed used when no `SEED_FILE` is configured.
    pub fn builtin() -> Self {
        Self {
            permissions: vec![
                PermissionSpec {
                    name: "read".into(),
                    description: Some("Read published content".into()),
                },
                PermissionSpec {
                    name: "write".into(),
                    description: Some("Create and edit own content".into()),
                },
                PermissionSpec {
                    name: "moderate".into(),
                    description: Some("Moderate content from other users".into()),
                },
                PermissionSpec {
                    name: "admin".into(),
                    description: Some("Administer the application".into()),
                },
            ],
            roles: vec![
                RoleSpec {
                    name: "User".into(),
                    description: Some("Regular account".into()),
                    is_default: true,
                    permissions: vec!["read".into(), "write".into()],
                },
                RoleSpec {
                    name: "Moderator".into(),
                    description: Some("Content moderator".into()),
                    is_default: false,
                    permissions: vec!["read".into(), "write".into(), "moderate".into()],
                },
                RoleSpec {
                    name: "Admin".into(),
                    description: Some("Administrator".into()),
                    is_default: false,
                    permissions: vec![
                        "read".into(),
                        "write".into(),
                        "moderate".into(),
                        "admin".into(),
                    ],
                },
            ],
            admins: Vec::new(),
        }
    }

    /// Validate the spec before anything touches the database.
    ///
    /// A role referencing a permission name absent from the permission list is
    /// a broken deployment, not a recoverable runtime condition. The same goes
    /// for the default-role flag: exactly one role must carry it, otherwise
    /// role assignment at registration is ambiguous.
    pub fn validate(&self) -> Result<()> {
        let known: HashSet<&str> = self.permissions.iter().map(|p| p.name.as_str()).collect();

        for role in &self.roles {
            for perm in &role.permissions {
                if !known.contains(perm.as_str()) {
                    return Err(AppError::Config(format!(
                        "role '{}' references unknown permission '{}'",
                        role.name, perm
                    )));
                }
            }
        }

        let default_count = self.roles.iter().filter(|r| r.is_default).count();
        if default_count != 1 {
            return Err(AppError::Config(format!(
                "exactly one role must be flagged is_default, found {}",
                default_count
            )));
        }

        Ok(())
    }

    /// Whether an email is on the administrator allow-list.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_jwt_secret() {
        let config = Config {
            database_url: "postgres://localhost/gatehouse".into(),
            bind_address: "0.0.0.0:8080".into(),
            log_level: "info".into(),
            jwt_secret: "super-secret-signing-key".into(),
            jwt_access_token_expiry_minutes: 30,
            jwt_refresh_token_expiry_days: 7,
            confirm_token_expiry_minutes: 60,
            seed_file: None,
        };
        let output = format!("{:?}", config);
        assert!(!output.contains("super-secret-signing-key"));
        assert!(output.contains("[REDACTED]"));
        assert!(output.contains("postgres://localhost/gatehouse"));
    }

    #[test]
    fn test_builtin_seed_is_valid() {
        SeedSpec::builtin().validate().unwrap();
    }

    #[test]
    fn test_role_spec_is_default_defaults_to_false() {
        let role: RoleSpec = serde_json::from_str(r#"{"name": "test"}"#).unwrap();
        assert!(!role.is_default);
        assert!(role.permissions.is_empty());
        assert!(role.description.is_none());
    }

    #[test]
    fn test_seed_spec_from_json() {
        let json = r#"{
            "permissions": [
                {"name": "read", "description": "Read access"},
                {"name": "admin"}
            ],
            "roles": [
                {"name": "User", "is_default": true, "permissions": ["read"]},
                {"name": "Admin", "permissions": ["read", "admin"]}
            ],
            "admins": ["root@example.com"]
        }"#;
        let spec: SeedSpec = serde_json::from_str(json).unwrap();
        spec.validate().unwrap();
        assert_eq!(spec.permissions.len(), 2);
        assert_eq!(spec.roles.len(), 2);
        assert!(spec.permissions[1].description.is_none());
        assert!(spec.is_admin_email("root@example.com"));
    }

    #[test]
    fn test_validate_rejects_unknown_permission_reference() {
        let spec = SeedSpec {
            permissions: vec![PermissionSpec {
                name: "read".into(),
                description: None,
            }],
            roles: vec![RoleSpec {
                name: "User".into(),
                description: None,
                is_default: true,
                permissions: vec!["read".into(), "fly".into()],
            }],
            admins: vec![],
        };
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("fly"));
    }

    #[test]
    fn test_validate_rejects_zero_default_roles() {
        let spec = SeedSpec {
            permissions: vec![],
            roles: vec![RoleSpec {
                name: "User".into(),
                description: None,
                is_default: false,
                permissions: vec![],
            }],
            admins: vec![],
        };
        assert!(matches!(
            spec.validate().unwrap_err(),
            AppError::Config(_)
        ));
    }

    #[test]
    fn test_validate_rejects_multiple_default_roles() {
        let mk = |name: &str| RoleSpec {
            name: name.into(),
            description: None,
            is_default: true,
            permissions: vec![],
        };
        let spec = SeedSpec {
            permissions: vec![],
            roles: vec![mk("A"), mk("B")],
            admins: vec![],
        };
        assert!(matches!(
            spec.validate().unwrap_err(),
            AppError::Config(_)
        ));
    }

    #[test]
    fn test_admin_email_match_is_case_insensitive() {
        let spec = SeedSpec {
            permissions: vec![],
            roles: vec![],
            admins: vec!["Root@Example.com".into()],
        };
        assert!(spec.is_admin_email("root@example.com"));
        assert!(spec.is_admin_email("ROOT@EXAMPLE.COM"));
        assert!(!spec.is_admin_email("other@example.com"));
    }
}
