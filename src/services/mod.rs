//! Business-logic services.

pub mod auth_service;
pub mod authz_service;
pub mod seed_service;
pub mod user_service;
