use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub dark_mode: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileChanges {
    pub dark_mode: bool,
}
