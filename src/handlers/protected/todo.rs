use axum::{
    extract::State,
    Extension, Json,
};
use tracing::debug;

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::todo::{TodoRequest, TodoResponse};
use crate::schemas::{Outcome, ValidatedJson, ValidatedPath};

/// POST /todo/ - Create a todo in one of the caller's lists
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<TodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state.store.create_todo(user.scope(), payload.into()).await?;
    debug!(user_id = user.id, todo_id = todo.id, "Created todo");
    Ok(Json(todo.into()))
}

/// GET /todos/
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let todos = state.store.list_todos(user.scope()).await?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

/// GET /todo/:id/
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state.store.get_todo(user.scope(), id).await?;
    Ok(Json(todo.into()))
}

/// PUT /todo/:id/ - Overwrite every field, possibly moving the todo to another list
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(payload): ValidatedJson<TodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state.store.update_todo(user.scope(), id, payload.into()).await?;
    Ok(Json(todo.into()))
}

/// DELETE /todo/:id/
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<Outcome>, ApiError> {
    state.store.delete_todo(user.scope(), id).await?;
    debug!(user_id = user.id, todo_id = id, "Deleted todo");
    Ok(Json(Outcome::ok("Todo deleted successfully.")))
}
