/// Conversions between entities and transfer records
///
/// Role translation runs in both directions: entity to name is a pure
/// projection, name to entity looks each name up and stops at the first one
/// that does not exist.

use std::collections::BTreeSet;

use crate::dto::{TaskRecord, UserRecord};
use crate::models::{Role, Task, User};
use crate::repository::{RepositoryError, RoleRepository};

/// Failure while turning role names into role entities
#[derive(Debug, thiserror::Error)]
pub enum RoleResolutionError {
    #[error("Role not found: {0}")]
    Missing(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            user_username: task.owner_username,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            roles: role_names(&user.roles),
            username: user.username,
            email: user.email,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Names of `roles`, sorted and deduplicated
pub fn role_names(roles: &[Role]) -> BTreeSet<String> {
    roles.iter().map(|role| role.name.clone()).collect()
}

/// Looks up every name in `names`, failing on the first unknown one
///
/// Names are visited in sorted order, so the reported miss is deterministic.
/// Nothing is written; callers persist the returned set themselves.
pub async fn resolve_role_names(
    roles: &dyn RoleRepository,
    names: &BTreeSet<String>,
) -> Result<Vec<Role>, RoleResolutionError> {
    let mut resolved = Vec::with_capacity(names.len());

    for name in names {
        match roles.find_role_by_name(name).await? {
            Some(role) => resolved.push(role),
            None => return Err(RoleResolutionError::Missing(name.clone())),
        }
    }

    Ok(resolved)
}
