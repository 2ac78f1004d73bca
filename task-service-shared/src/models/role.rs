/// Role model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL UNIQUE
/// );
/// ```
///
/// Users holding a role are derived from `user_roles`; a role carries no
/// back-reference of its own.

use serde::{Deserialize, Serialize};

/// Role seeded for regular accounts
pub const ROLE_USER: &str = "ROLE_USER";

/// Role seeded for administrators
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,

    /// Unique role name, e.g. `ROLE_ADMIN`
    pub name: String,
}
