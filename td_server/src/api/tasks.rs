//! Task API handlers.
//!
//! Every route sits behind [`auth_middleware`](super::middleware::auth_middleware) and is
//! scoped to the authenticated account. A task owned by another account answers `404`
//! exactly like a missing one.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
};
use taskdeck::auth::AuthenticatedUser;
use taskdeck::tasks::{CreateTaskRequest, Task, UpdateTaskRequest};
use uuid::Uuid;

use super::AppState;
use super::error::{ApiError, ApiJson, error_response, task_error};

fn task_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid task ID"))
}

/// List the caller's tasks, newest first.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state
        .tasks
        .list(user.user_id)
        .await
        .map_err(|e| task_error(&e))?;
    Ok(Json(tasks))
}

/// Create a task owned by the caller.
///
/// # Errors
///
/// - `400 Bad Request`: missing or oversized title, or a due date in the past
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(payload): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state
        .tasks
        .create(user.user_id, payload)
        .await
        .map_err(|e| task_error(&e))?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(path)?;
    let task = state
        .tasks
        .get(user.user_id, id)
        .await
        .map_err(|e| task_error(&e))?;
    Ok(Json(task))
}

/// Apply a partial update; omitted fields keep their values.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    path: Result<Path<Uuid>, PathRejection>,
    ApiJson(payload): ApiJson<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(path)?;
    let task = state
        .tasks
        .update(user.user_id, id, payload)
        .await
        .map_err(|e| task_error(&e))?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = task_id(path)?;
    state
        .tasks
        .delete(user.user_id, id)
        .await
        .map_err(|e| task_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a task done.
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(path)?;
    let task = state
        .tasks
        .complete(user.user_id, id)
        .await
        .map_err(|e| task_error(&e))?;
    Ok(Json(task))
}
