use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TodoList {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Every mutable column of a todo list. Updates overwrite all of them.
#[derive(Debug, Clone)]
pub struct TodoListChanges {
    pub name: String,
    pub description: String,
}
