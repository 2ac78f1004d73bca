/// Task model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     user_id BIGINT REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
/// ```
///
/// Tasks are never removed through the API. Deleting one clears `active`,
/// which hides it from list and find-by-id queries while keeping it in the
/// owner's task listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::SortField;

/// Persisted task, fetched together with the owner's username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,

    pub title: String,

    pub description: Option<String>,

    pub completed: bool,

    /// False once the task has been soft-deleted
    pub active: bool,

    /// Owning user
    pub user_id: Option<i64>,

    /// Username of the owning user (joined, not stored on the row)
    pub owner_username: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a task
///
/// New tasks are always active and both timestamps are set to `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a task
///
/// `None` fields are left untouched. `id`, `active` and `created_at` cannot
/// be changed through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub user_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Columns task pages may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortField {
    Id,
    Title,
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl SortField for TaskSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "title" => Some(Self::Title),
            "completed" => Some(Self::Completed),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Id => "t.id",
            Self::Title => "t.title",
            Self::Completed => "t.completed",
            Self::CreatedAt => "t.created_at",
            Self::UpdatedAt => "t.updated_at",
        }
    }

    fn id() -> Self {
        Self::Id
    }
}
