use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::database::models::{Todo, TodoChanges, TodoList, TodoListChanges};

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TodoListRequest {
    #[validate(length(min = 1, max = 100, message = "Ensure this value has between 1 and 100 characters."))]
    pub name: String,
    pub description: Option<String>,
}

impl From<TodoListRequest> for TodoListChanges {
    fn from(request: TodoListRequest) -> Self {
        Self {
            name: request.name,
            description: request.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<TodoList> for TodoListResponse {
    fn from(list: TodoList) -> Self {
        Self {
            id: list.id,
            name: list.name,
            description: list.description,
            created: list.created,
            updated: list.updated,
        }
    }
}

/// Full set of todo fields; omitted optionals reset to their defaults.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TodoRequest {
    #[validate(length(min = 1, max = 200, message = "Ensure this value has between 1 and 200 characters."))]
    pub title: String,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub todo_list: i64,
}

impl From<TodoRequest> for TodoChanges {
    fn from(request: TodoRequest) -> Self {
        Self {
            todo_list_id: request.todo_list,
            title: request.title,
            description: request.description.unwrap_or_default(),
            is_completed: request.is_completed.unwrap_or(false),
            due_date: request.due_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub todo_list: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            is_completed: todo.is_completed,
            due_date: todo.due_date,
            todo_list: todo.todo_list_id,
            created: todo.created,
            updated: todo.updated,
        }
    }
}
