//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers;

/// Top-level OpenAPI document.
///
/// Each handler module contributes its own paths and schemas via per-module
/// `#[derive(OpenApi)]` structs merged into this root document at startup.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatehouse API",
        description = "User registration, login, and role/permission authorization.",
        version = "0.3.0",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, confirmation, and tokens"),
        (name = "roles", description = "Role and permission registry"),
        (name = "users", description = "User administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Merge all per-module docs into the root document.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(handlers::auth::AuthApiDoc::openapi());
    doc.merge(handlers::roles::RolesApiDoc::openapi());
    doc.merge(handlers::users::UsersApiDoc::openapi());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_contains_all_route_groups() {
        let doc = build_openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.contains("/auth/register")));
        assert!(paths.iter().any(|p| p.contains("/auth/login")));
        assert!(paths.iter().any(|p| p.contains("/roles")));
        assert!(paths.iter().any(|p| p.contains("/users")));
    }
}
