/// PostgreSQL store
///
/// Tasks are always read joined to their owner so that the owner's username
/// travels with the row. Users are read first and their roles attached with
/// one extra query per batch.
///
/// Multi-statement writes (user creation with role links, role replacement,
/// purge) run in a single transaction. Dropping the future before commit
/// rolls the transaction back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

use super::{RepositoryError, RepositoryResult, RoleRepository, Store, TaskRepository, UserRepository};
use crate::models::{NewTask, NewUser, Page, PageRequest, Role, Task, TaskChanges, TaskSortField, User, UserSortField};

const TASK_SELECT: &str = "SELECT t.id, t.title, t.description, t.completed, t.active, t.user_id, \
     u.username AS owner_username, t.created_at, t.updated_at";

const USER_SELECT: &str =
    "SELECT u.id, u.username, u.email, u.password_hash, u.active, u.created_at, u.updated_at FROM users u";

/// sqlx-backed implementation of every repository trait
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loads role sets for `users` and stores them sorted by name
    async fn attach_roles(&self, users: &mut [User]) -> RepositoryResult<()> {
        if users.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT ur.user_id, r.id, r.name
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ANY($1)
             ORDER BY r.name",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for (user_id, id, name) in rows {
            if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
                user.roles.push(Role { id, name });
            }
        }

        Ok(())
    }

    async fn fetch_user(&self, sql: &str, key: &str) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        self.with_roles(user).await
    }

    async fn with_roles(&self, user: Option<User>) -> RepositoryResult<Option<User>> {
        match user {
            Some(user) => {
                let mut users = [user];
                self.attach_roles(&mut users).await?;
                let [user] = users;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

/// Maps unique violations to [`RepositoryError::Conflict`]
fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some(c) if c.contains("username") => "Username already exists".to_string(),
                Some(c) if c.contains("email") => "Email already exists".to_string(),
                Some(c) => format!("Duplicate value violates {}", c),
                None => "Duplicate value".to_string(),
            };
            return RepositoryError::Conflict(message);
        }
    }
    RepositoryError::Database(err)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn find_active_tasks(&self, request: &PageRequest<TaskSortField>) -> RepositoryResult<Page<Task>> {
        let sql = format!(
            "{} FROM tasks t LEFT JOIN users u ON u.id = t.user_id
             WHERE t.active = TRUE
             ORDER BY {}
             LIMIT $1 OFFSET $2",
            TASK_SELECT,
            request.sort.to_sql()
        );

        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(to_i64(request.size))
            .bind(to_i64(request.offset()))
            .fetch_all(&self.pool)
            .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE active = TRUE")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(tasks, request, total.max(0) as u64))
    }

    async fn find_active_task_by_id(&self, id: i64) -> RepositoryResult<Option<Task>> {
        let sql = format!(
            "{} FROM tasks t LEFT JOIN users u ON u.id = t.user_id WHERE t.id = $1 AND t.active = TRUE",
            TASK_SELECT
        );

        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_task_by_id(&self, id: i64) -> RepositoryResult<Option<Task>> {
        let sql = format!(
            "{} FROM tasks t LEFT JOIN users u ON u.id = t.user_id WHERE t.id = $1",
            TASK_SELECT
        );

        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_tasks_by_owner(&self, username: &str) -> RepositoryResult<Vec<Task>> {
        let sql = format!(
            "{} FROM tasks t JOIN users u ON u.id = t.user_id WHERE u.username = $1 ORDER BY t.id",
            TASK_SELECT
        );

        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(username)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_task(&self, task: NewTask) -> RepositoryResult<Task> {
        let sql = format!(
            "WITH t AS (
                INSERT INTO tasks (title, description, completed, active, user_id, created_at, updated_at)
                VALUES ($1, $2, $3, TRUE, $4, $5, $5)
                RETURNING *
             )
             {} FROM t LEFT JOIN users u ON u.id = t.user_id",
            TASK_SELECT
        );

        let created = sqlx::query_as::<_, Task>(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.completed)
            .bind(task.user_id)
            .bind(task.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        info!(task_id = created.id, user_id = task.user_id, "Task inserted");
        Ok(created)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> RepositoryResult<Option<Task>> {
        let sql = format!(
            "WITH t AS (
                UPDATE tasks SET
                    title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    completed = COALESCE($4, completed),
                    user_id = COALESCE($5, user_id),
                    updated_at = $6
                WHERE id = $1
                RETURNING *
             )
             {} FROM t LEFT JOIN users u ON u.id = t.user_id",
            TASK_SELECT
        );

        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(changes.completed)
            .bind(changes.user_id)
            .bind(changes.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?)
    }

    async fn deactivate_task(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<bool> {
        let result = sqlx::query("UPDATE tasks SET active = FALSE, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_active_users(&self, request: &PageRequest<UserSortField>) -> RepositoryResult<Page<User>> {
        let sql = format!(
            "{} WHERE u.active = TRUE ORDER BY {} LIMIT $1 OFFSET $2",
            USER_SELECT,
            request.sort.to_sql()
        );

        let mut users = sqlx::query_as::<_, User>(&sql)
            .bind(to_i64(request.size))
            .bind(to_i64(request.offset()))
            .fetch_all(&self.pool)
            .await?;

        self.attach_roles(&mut users).await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE active = TRUE")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(users, request, total.max(0) as u64))
    }

    async fn find_user_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("{} WHERE u.id = $1", USER_SELECT);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_roles(user).await
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.fetch_user(&format!("{} WHERE u.username = $1", USER_SELECT), username)
            .await
    }

    async fn find_active_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.fetch_user(
            &format!("{} WHERE u.username = $1 AND u.active = TRUE", USER_SELECT),
            username,
        )
        .await
    }

    async fn insert_user(&self, user: NewUser, roles: &[Role]) -> RepositoryResult<User> {
        let mut tx = self.pool.begin().await?;

        let mut created = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, active, created_at, updated_at)
             VALUES ($1, $2, $3, TRUE, $4, $4)
             RETURNING id, username, email, password_hash, active, created_at, updated_at",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let role_ids: Vec<i64> = roles.iter().map(|r| r.id).collect();

        sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT $1, UNNEST($2::BIGINT[])")
            .bind(created.id)
            .bind(&role_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        created.roles = roles.to_vec();
        created.roles.sort_by(|a, b| a.name.cmp(&b.name));

        info!(user_id = created.id, username = %created.username, "User inserted");
        Ok(created)
    }

    async fn replace_roles(&self, user_id: i64, roles: &[Role], at: DateTime<Utc>) -> RepositoryResult<Option<User>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE users SET updated_at = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let role_ids: Vec<i64> = roles.iter().map(|r| r.id).collect();

        sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT $1, UNNEST($2::BIGINT[])")
            .bind(user_id)
            .bind(&role_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(user_id, roles = role_ids.len(), "Role set replaced");
        self.find_user_by_id(user_id).await
    }

    async fn deactivate_user(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<bool> {
        let result = sqlx::query("UPDATE users SET active = FALSE, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_user(&self, id: i64) -> RepositoryResult<bool> {
        let mut tx = self.pool.begin().await?;

        let tasks = sqlx::query("DELETE FROM tasks WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let users = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if users.rows_affected() == 0 {
            // Nothing to purge; the transaction rolls back on drop
            return Ok(false);
        }

        tx.commit().await?;

        info!(user_id = id, tasks_deleted = tasks.rows_affected(), "User purged");
        Ok(true)
    }
}

#[async_trait]
impl RoleRepository for PgStore {
    async fn find_role_by_name(&self, name: &str) -> RepositoryResult<Option<Role>> {
        Ok(sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> RepositoryResult<()> {
        Ok(crate::db::pool::health_check(&self.pool).await?)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
