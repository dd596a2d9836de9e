use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Todo {
    pub id: i64,
    pub todo_list_id: i64,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Every mutable column of a todo, including its parent list.
#[derive(Debug, Clone)]
pub struct TodoChanges {
    pub todo_list_id: i64,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub due_date: Option<DateTime<Utc>>,
}
