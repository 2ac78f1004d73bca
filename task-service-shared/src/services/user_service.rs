/// User and role reconciliation service
///
/// Role names are resolved in full before anything is written: one unknown
/// name aborts the whole operation. Assigning roles replaces the user's role
/// set rather than adding to it.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use log_execution::LogExecution;
use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use crate::dto::{CreateUserRequest, UserRecord};
use crate::mapper::{resolve_role_names, RoleResolutionError};
use crate::models::{NewUser, Page, PageRequest, Role, UserSortField};
use crate::password::PasswordHasher;
use crate::repository::{RoleRepository, UserRepository};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, roles: Arc<dyn RoleRepository>, hasher: PasswordHasher) -> Self {
        debug!("UserService created");
        Self { users, roles, hasher }
    }

    /// Page of active users
    pub async fn list_active_users(&self, request: PageRequest<UserSortField>) -> ServiceResult<Page<UserRecord>> {
        LogExecution::method::<Self>("list_active_users")
            .run(async {
                let page = self.users.find_active_users(&request).await?;
                Ok::<_, ServiceError>(page.map(UserRecord::from))
            })
            .await
    }

    /// Active user by username as a zero- or one-element list
    pub async fn find_by_username(&self, username: &str) -> ServiceResult<Vec<UserRecord>> {
        LogExecution::method::<Self>("find_by_username")
            .run(async {
                let user = self.users.find_active_user_by_username(username).await?;
                Ok::<_, ServiceError>(user.into_iter().map(UserRecord::from).collect())
            })
            .await
    }

    /// Creates an active user holding exactly the requested roles
    ///
    /// # Errors
    ///
    /// - `BadRequest` if no roles are given or one does not exist
    /// - `Conflict` if the username or email is taken
    pub async fn create_user(&self, request: CreateUserRequest) -> ServiceResult<UserRecord> {
        LogExecution::method::<Self>("create_user")
            .run(async {
                if request.roles.is_empty() {
                    return Err(ServiceError::BadRequest("At least one role is required".to_string()));
                }

                let roles = self.resolve(&request.roles).await.map_err(|err| match err {
                    RoleResolutionError::Missing(name) => {
                        ServiceError::BadRequest(format!("Role {} not found", name))
                    }
                    RoleResolutionError::Repository(err) => err.into(),
                })?;

                let password_hash = self.hasher.hash(&request.password)?;

                let user = self
                    .users
                    .insert_user(
                        NewUser {
                            username: request.username,
                            email: request.email,
                            password_hash,
                            created_at: Utc::now(),
                        },
                        &roles,
                    )
                    .await?;

                info!(user_id = user.id, username = %user.username, "User created");
                Ok::<_, ServiceError>(UserRecord::from(user))
            })
            .await
    }

    /// Replaces the role set of `username` with exactly `role_names`
    ///
    /// The lookup ignores `active`. On any failure the stored role set is
    /// left as it was.
    pub async fn assign_roles(&self, username: &str, role_names: &BTreeSet<String>) -> ServiceResult<UserRecord> {
        LogExecution::method::<Self>("assign_roles")
            .run(async {
                let user = self
                    .users
                    .find_user_by_username(username)
                    .await?
                    .ok_or_else(|| ServiceError::UserNotFound(username.to_string()))?;

                if role_names.is_empty() {
                    return Err(ServiceError::BadRequest("At least one role is required".to_string()));
                }

                let roles = self.resolve(role_names).await.map_err(|err| match err {
                    RoleResolutionError::Missing(name) => ServiceError::RoleNotFound(name),
                    RoleResolutionError::Repository(err) => err.into(),
                })?;

                let updated = self
                    .users
                    .replace_roles(user.id, &roles, Utc::now())
                    .await?
                    .ok_or_else(|| ServiceError::UserNotFound(username.to_string()))?;

                info!(user_id = updated.id, roles = ?role_names, "Roles assigned");
                Ok::<_, ServiceError>(UserRecord::from(updated))
            })
            .await
    }

    /// Marks the user inactive
    pub async fn soft_delete_user(&self, id: i64) -> ServiceResult<()> {
        LogExecution::method::<Self>("soft_delete_user")
            .run(async {
                if !self.users.deactivate_user(id, Utc::now()).await? {
                    return Err(ServiceError::user_not_found_by_id(id));
                }

                info!(user_id = id, "User soft-deleted");
                Ok::<_, ServiceError>(())
            })
            .await
    }

    /// Removes the user, its role links and every task it owns
    pub async fn purge_user(&self, id: i64) -> ServiceResult<()> {
        LogExecution::method::<Self>("purge_user")
            .run(async {
                if !self.users.purge_user(id).await? {
                    return Err(ServiceError::user_not_found_by_id(id));
                }

                info!(user_id = id, "User purged");
                Ok::<_, ServiceError>(())
            })
            .await
    }

    async fn resolve(&self, names: &BTreeSet<String>) -> Result<Vec<Role>, RoleResolutionError> {
        resolve_role_names(self.roles.as_ref(), names).await
    }
}
