//! Gatehouse - Backend Library
//!
//! User registration, login, and role/permission based authorization.

pub mod api;
pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
