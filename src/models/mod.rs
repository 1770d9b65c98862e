//! Database models (SQLx).

pub mod role;
pub mod user;
