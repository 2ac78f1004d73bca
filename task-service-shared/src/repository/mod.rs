/// Repository traits and their implementations
///
/// Services depend on these traits only. Two stores implement all of them:
///
/// - [`postgres::PgStore`]: sqlx over PostgreSQL, used in production
/// - [`memory::MemoryStore`]: in-process maps with the same uniqueness,
///   scoping, ordering and paging rules, used by tests
///
/// "Active" queries only see rows whose `active` flag is set. Lookups by id
/// or username that are not named `active` see every row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{NewTask, NewUser, Page, PageRequest, Role, Task, TaskChanges, TaskSortField, User, UserSortField};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Page of active tasks
    async fn find_active_tasks(&self, request: &PageRequest<TaskSortField>) -> RepositoryResult<Page<Task>>;

    /// Task by id if it is active
    async fn find_active_task_by_id(&self, id: i64) -> RepositoryResult<Option<Task>>;

    /// Task by id regardless of `active`
    async fn find_task_by_id(&self, id: i64) -> RepositoryResult<Option<Task>>;

    /// Every task owned by `username`, active or not, ordered by id
    async fn find_tasks_by_owner(&self, username: &str) -> RepositoryResult<Vec<Task>>;

    async fn insert_task(&self, task: NewTask) -> RepositoryResult<Task>;

    /// Applies `changes`, returning `None` if the task does not exist
    async fn update_task(&self, id: i64, changes: TaskChanges) -> RepositoryResult<Option<Task>>;

    /// Clears `active`; returns false if the task does not exist
    async fn deactivate_task(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Page of active users with their roles
    async fn find_active_users(&self, request: &PageRequest<UserSortField>) -> RepositoryResult<Page<User>>;

    async fn find_user_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;

    /// User by username regardless of `active`
    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// User by username if it is active
    async fn find_active_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Inserts the user and links `roles` atomically
    async fn insert_user(&self, user: NewUser, roles: &[Role]) -> RepositoryResult<User>;

    /// Replaces the user's role set with exactly `roles`
    ///
    /// Returns `None` if the user does not exist.
    async fn replace_roles(&self, user_id: i64, roles: &[Role], at: DateTime<Utc>) -> RepositoryResult<Option<User>>;

    /// Clears `active`; returns false if the user does not exist
    async fn deactivate_user(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<bool>;

    /// Deletes the user, its role links and its tasks
    async fn purge_user(&self, id: i64) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_role_by_name(&self, name: &str) -> RepositoryResult<Option<Role>>;
}

/// A backend implementing every repository
#[async_trait]
pub trait Store: TaskRepository + UserRepository + RoleRepository {
    /// Checks that the backend is reachable
    async fn ping(&self) -> RepositoryResult<()>;

    /// Short backend name for health output
    fn backend(&self) -> &'static str;
}
