/// User model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(100) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
///
/// CREATE TABLE user_roles (
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
///     PRIMARY KEY (user_id, role_id)
/// );
/// ```
///
/// `username` and `email` are unique across all rows, including users that
/// have been soft-deleted.

use chrono::{DateTime, Utc};

use super::page::SortField;
use super::role::Role;

/// Persisted user with its role set loaded
///
/// Not serializable: responses go through [`crate::dto::UserRecord`], which
/// has no password field.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    pub username: String,

    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    /// False once the user has been soft-deleted
    pub active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Roles held by the user, ordered by name
    #[sqlx(skip)]
    pub roles: Vec<Role>,
}

/// Input for inserting a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Columns user pages may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    Id,
    Username,
    Email,
    CreatedAt,
}

impl SortField for UserSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "username" => Some(Self::Username),
            "email" => Some(Self::Email),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Id => "u.id",
            Self::Username => "u.username",
            Self::Email => "u.email",
            Self::CreatedAt => "u.created_at",
        }
    }

    fn id() -> Self {
        Self::Id
    }
}
