/// Task endpoints
///
/// ```text
/// GET    /api/v1/tasks?page&size&sort   page of active tasks
/// GET    /api/v1/tasks/:id              active task or 404
/// POST   /api/v1/task                   create, 200 with the record
/// GET    /api/v1/user/:username         all tasks owned by username
/// PUT    /api/v1/:id                    partial update
/// DELETE /api/v1/task/:id               soft delete
/// ```

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use task_service_shared::dto::{CreateTaskRequest, TaskPatch, TaskRecord};
use task_service_shared::models::{Page, PageRequest, TaskSortField};
use validator::Validate;

use super::PageParams;
use crate::app::AppState;
use crate::error::ApiResult;

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<TaskRecord>>> {
    let request = PageRequest::<TaskSortField>::parse(params.page, params.size, params.sort.as_deref())?;
    Ok(Json(state.tasks.list_active_tasks(request).await?))
}

pub async fn get_task(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<TaskRecord>> {
    Ok(Json(state.tasks.get_active_task_by_id(id).await?))
}

/// Creates a task
///
/// Responds 200 (not 201) with the created record.
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskRecord>> {
    let Json(request) = payload?;
    request.validate()?;

    Ok(Json(state.tasks.create_task(request).await?))
}

pub async fn list_tasks_by_owner(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<TaskRecord>>> {
    Ok(Json(state.tasks.list_tasks_by_owner(&username).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<TaskRecord>> {
    let Json(patch) = payload?;
    patch.validate()?;

    Ok(Json(state.tasks.update_task(id, patch).await?))
}

pub async fn delete_task(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.tasks.soft_delete_task(id).await?;
    Ok(())
}
