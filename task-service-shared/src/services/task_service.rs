/// Task lifecycle service
///
/// Reads and lists only see active tasks, except the per-owner listing which
/// returns everything the user owns. Updates and deletes address a task by
/// id whether or not it is active, so deleting twice succeeds.

use std::sync::Arc;

use chrono::Utc;
use log_execution::LogExecution;
use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use crate::dto::{CreateTaskRequest, TaskPatch, TaskRecord};
use crate::models::{NewTask, Page, PageRequest, TaskChanges, TaskSortField, User};
use crate::repository::{TaskRepository, UserRepository};

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, users: Arc<dyn UserRepository>) -> Self {
        debug!("TaskService created");
        Self { tasks, users }
    }

    /// Page of active tasks
    pub async fn list_active_tasks(&self, request: PageRequest<TaskSortField>) -> ServiceResult<Page<TaskRecord>> {
        LogExecution::method::<Self>("list_active_tasks")
            .run(async {
                let page = self.tasks.find_active_tasks(&request).await?;
                Ok::<_, ServiceError>(page.map(TaskRecord::from))
            })
            .await
    }

    /// Active task by id
    pub async fn get_active_task_by_id(&self, id: i64) -> ServiceResult<TaskRecord> {
        LogExecution::method::<Self>("get_active_task_by_id")
            .run(async {
                let task = self
                    .tasks
                    .find_active_task_by_id(id)
                    .await?
                    .ok_or_else(|| ServiceError::task_not_found(id))?;
                Ok::<_, ServiceError>(TaskRecord::from(task))
            })
            .await
    }

    /// Creates an active task owned by `request.user_username`
    ///
    /// # Errors
    ///
    /// `BadRequest` if the owner is missing or does not exist. Nothing is
    /// persisted in that case.
    pub async fn create_task(&self, request: CreateTaskRequest) -> ServiceResult<TaskRecord> {
        LogExecution::method::<Self>("create_task")
            .run(async {
                let username = request
                    .user_username
                    .as_deref()
                    .ok_or_else(owner_required)?;

                let owner = self.resolve_owner(username).await?;

                let task = self
                    .tasks
                    .insert_task(NewTask {
                        title: request.title,
                        description: request.description,
                        completed: request.completed,
                        user_id: owner.id,
                        created_at: Utc::now(),
                    })
                    .await?;

                info!(task_id = task.id, owner = %owner.username, "Task created");
                Ok::<_, ServiceError>(TaskRecord::from(task))
            })
            .await
    }

    /// Every task owned by `username`, including soft-deleted ones
    ///
    /// Unknown usernames yield an empty list.
    pub async fn list_tasks_by_owner(&self, username: &str) -> ServiceResult<Vec<TaskRecord>> {
        LogExecution::method::<Self>("list_tasks_by_owner")
            .run(async {
                let tasks = self.tasks.find_tasks_by_owner(username).await?;
                Ok::<_, ServiceError>(tasks.into_iter().map(TaskRecord::from).collect())
            })
            .await
    }

    /// Applies the fields present in `patch`
    ///
    /// `id`, `active` and `created_at` are never changed; `updated_at` is
    /// always refreshed.
    pub async fn update_task(&self, id: i64, patch: TaskPatch) -> ServiceResult<TaskRecord> {
        LogExecution::method::<Self>("update_task")
            .run(async {
                let existing = self
                    .tasks
                    .find_task_by_id(id)
                    .await?
                    .ok_or_else(|| ServiceError::task_not_found(id))?;

                let user_id = match patch.user_username.as_deref() {
                    Some(username) => Some(self.resolve_owner(username).await?.id),
                    None => None,
                };

                let changes = TaskChanges {
                    title: patch.title,
                    description: patch.description,
                    completed: patch.completed,
                    user_id,
                    updated_at: Utc::now(),
                };

                let task = self
                    .tasks
                    .update_task(existing.id, changes)
                    .await?
                    .ok_or_else(|| ServiceError::task_not_found(id))?;

                Ok::<_, ServiceError>(TaskRecord::from(task))
            })
            .await
    }

    /// Marks the task inactive
    pub async fn soft_delete_task(&self, id: i64) -> ServiceResult<()> {
        LogExecution::method::<Self>("soft_delete_task")
            .run(async {
                if !self.tasks.deactivate_task(id, Utc::now()).await? {
                    return Err(ServiceError::task_not_found(id));
                }

                info!(task_id = id, "Task soft-deleted");
                Ok::<_, ServiceError>(())
            })
            .await
    }

    /// Looks up the owner by trimmed username, ignoring `active`
    async fn resolve_owner(&self, username: &str) -> ServiceResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(owner_required());
        }

        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::BadRequest(format!("User with username {} not found", username)))
    }
}

fn owner_required() -> ServiceError {
    ServiceError::BadRequest("User username is required".to_string())
}
