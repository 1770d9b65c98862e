//! Identity extraction and account-guard middleware.
//!
//! Every `/api/v1` request gets an [`Identity`] extension: `Authenticated`
//! when a valid `Authorization: Bearer <jwt>` header is present, `Anonymous`
//! otherwise. Handlers receive the identity explicitly and pass it into
//! authorization checks — there is no ambient current-user state.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::authz::Identity;
use crate::services::auth_service::AuthService;

/// Extract the bearer token from the Authorization header, if any.
fn extract_bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Attach an `Identity` extension to the request.
///
/// Invalid or missing tokens resolve to `Identity::Anonymous` rather than an
/// error: whether anonymous access is acceptable is the downstream guard's
/// decision, not this middleware's.
pub async fn identity_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match extract_bearer(&request) {
        Some(token) => match auth_service.validate_access_token(token) {
            Ok(subject) => Identity::Authenticated(subject),
            Err(_) => Identity::Anonymous,
        },
        None => Identity::Anonymous,
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Account guard for the protected route group: anonymous requests get 401,
/// unconfirmed accounts get 403.
pub async fn require_confirmed_account(request: Request, next: Next) -> Response {
    match request.extensions().get::<Identity>() {
        Some(Identity::Authenticated(subject)) => {
            if !subject.confirmed {
                return (StatusCode::FORBIDDEN, "Unconfirmed account").into_response();
            }
            next.run(request).await
        }
        Some(Identity::Anonymous) | None => {
            (StatusCode::UNAUTHORIZED, "Authentication required").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let builder = axum::http::Request::builder();
        let builder = match value {
            Some(v) => builder.header(AUTHORIZATION, v),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_bearer() {
        let request = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&request), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_missing_header() {
        let request = request_with_auth(None);
        assert_eq!(extract_bearer(&request), None);
    }

    #[test]
    fn test_extract_bearer_wrong_scheme() {
        let request = request_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer(&request), None);
    }
}
