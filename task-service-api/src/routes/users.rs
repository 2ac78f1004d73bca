/// User and role endpoints
///
/// ```text
/// GET    /api/v1/users?page&size&sort   page of active users
/// GET    /api/v1/users/:username        [] or [user]
/// POST   /api/v1/user                   create, 201
/// POST   /api/v1/:username/roles        replace role set
/// DELETE /api/v1/users/:id              soft delete
/// ```

use std::collections::BTreeSet;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use task_service_shared::dto::{CreateUserRequest, UserRecord};
use task_service_shared::models::{Page, PageRequest, UserSortField};
use validator::Validate;

use super::PageParams;
use crate::app::AppState;
use crate::error::ApiResult;

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<UserRecord>>> {
    let request = PageRequest::<UserSortField>::parse(params.page, params.size, params.sort.as_deref())?;
    Ok(Json(state.users.list_active_users(request).await?))
}

/// Missing or deleted users yield an empty list, not 404
pub async fn find_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<UserRecord>>> {
    Ok(Json(state.users.find_by_username(&username).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserRecord>)> {
    let Json(request) = payload?;
    request.validate()?;

    let user = state.users.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Body is a JSON array of role names
pub async fn assign_roles(
    State(state): State<AppState>,
    Path(username): Path<String>,
    payload: Result<Json<BTreeSet<String>>, JsonRejection>,
) -> ApiResult<Json<UserRecord>> {
    let Json(role_names) = payload?;
    Ok(Json(state.users.assign_roles(&username, &role_names).await?))
}

pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.users.soft_delete_user(id).await?;
    Ok(())
}
