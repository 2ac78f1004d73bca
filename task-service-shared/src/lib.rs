//! # Task Service Shared Library
//!
//! Domain types, persistence and business logic used by the task service
//! HTTP server.
//!
//! ## Module Organization
//!
//! - `models`: Persisted entities and paging types
//! - `dto`: Transfer records exchanged with API clients
//! - `mapper`: Entity to record conversion and role-name resolution
//! - `repository`: Repository traits with Postgres and in-memory stores
//! - `services`: Task and user services
//! - `db`: Connection pool and migrations
//! - `password`: Argon2id password hashing

pub mod db;
pub mod dto;
pub mod mapper;
pub mod models;
pub mod password;
pub mod repository;
pub mod services;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
