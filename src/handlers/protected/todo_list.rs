use axum::{
    extract::State,
    Extension, Json,
};
use tracing::debug;

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::todo::{TodoListRequest, TodoListResponse};
use crate::schemas::{Outcome, ValidatedJson, ValidatedPath};

/// GET /todo-lists
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<TodoListResponse>>, ApiError> {
    let lists = state.store.list_todo_lists(user.scope()).await?;
    Ok(Json(lists.into_iter().map(TodoListResponse::from).collect()))
}

/// GET /todo-list/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let list = state.store.get_todo_list(user.scope(), id).await?;
    Ok(Json(list.into()))
}

/// POST /todo-list/ - Create a list owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<TodoListRequest>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let list = state.store.create_todo_list(user.id, payload.into()).await?;
    debug!(user_id = user.id, list_id = list.id, "Created todo list");
    Ok(Json(list.into()))
}

/// PUT /todo-list/:id - Overwrite name and description
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(payload): ValidatedJson<TodoListRequest>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let list = state.store.update_todo_list(user.scope(), id, payload.into()).await?;
    Ok(Json(list.into()))
}

/// DELETE /todo-list/:id - Delete a list and every todo in it
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<Outcome>, ApiError> {
    state.store.delete_todo_list(user.scope(), id).await?;
    debug!(user_id = user.id, list_id = id, "Deleted todo list");
    Ok(Json(Outcome::ok("Todo list deleted successfully.")))
}
