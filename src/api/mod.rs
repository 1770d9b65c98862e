//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{Config, SeedSpec};
use crate::services::auth_service::AuthService;
use crate::services::authz_service::AuthzService;
use crate::services::user_service::UserService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    /// Seed spec kept around for the admin allow-list at registration.
    pub seed: SeedSpec,
}

impl AppState {
    pub fn new(config: Config, db: PgPool, seed: SeedSpec) -> Self {
        Self { config, db, seed }
    }

    /// Create an AuthService bound to this state.
    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone(), Arc::new(self.config.clone()))
    }

    /// Create an AuthzService bound to this state.
    pub fn authz_service(&self) -> AuthzService {
        AuthzService::new(self.db.clone())
    }

    /// Create a UserService bound to this state.
    pub fn user_service(&self) -> UserService {
        UserService::new(self.db.clone())
    }
}

pub type SharedState = Arc<AppState>;
