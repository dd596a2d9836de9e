use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    NewUser, Profile, ProfileChanges, Session, Todo, TodoChanges, TodoList, TodoListChanges, User,
};
use crate::database::store::{
    Scope, Store, DUPLICATE_USERNAME, PROFILE_NOT_FOUND, TODO_LIST_NOT_FOUND, TODO_NOT_FOUND, USER_NOT_FOUND,
};

const USER_COLUMNS: &str =
    "id, username, email, password, is_active, is_staff, is_superuser, date_joined, last_login";
const PROFILE_COLUMNS: &str = "id, user_id, dark_mode, created, updated";
const TODO_LIST_COLUMNS: &str = "id, user_id, name, description, created, updated";
const TODO_COLUMNS: &str =
    "t.id, t.todo_list_id, t.title, t.description, t.is_completed, t.due_date, t.created, t.updated";

/// PostgreSQL-backed store. Cascades and uniqueness are enforced by the schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_constraint(e, DUPLICATE_USERNAME, USER_NOT_FOUND))?;

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn record_login(&self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(USER_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: i64) -> Result<Profile, DatabaseError> {
        sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(PROFILE_NOT_FOUND.to_string()))
    }

    async fn update_profile(&self, user_id: i64, changes: ProfileChanges) -> Result<Profile, DatabaseError> {
        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET dark_mode = $1, updated = now() WHERE user_id = $2 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(changes.dark_mode)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(PROFILE_NOT_FOUND.to_string()))
    }

    async fn create_session(&self, session: Session) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO sessions (key, user_id, created, expires) VALUES ($1, $2, $3, $4)")
            .bind(&session.key)
            .bind(session.user_id)
            .bind(session.created)
            .bind(session.expires)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_constraint(e, "Session already exists", USER_NOT_FOUND))?;
        Ok(())
    }

    async fn find_session(&self, key: &str) -> Result<Option<Session>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>("SELECT key, user_id, created, expires FROM sessions WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn delete_session(&self, key: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM sessions WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_todo_lists(&self, scope: Scope) -> Result<Vec<TodoList>, DatabaseError> {
        let lists = sqlx::query_as::<_, TodoList>(&format!(
            "SELECT {TODO_LIST_COLUMNS} FROM todo_lists WHERE ($1::BIGINT IS NULL OR user_id = $1) ORDER BY id"
        ))
        .bind(scope.owner())
        .fetch_all(&self.pool)
        .await?;
        Ok(lists)
    }

    async fn get_todo_list(&self, scope: Scope, id: i64) -> Result<TodoList, DatabaseError> {
        sqlx::query_as::<_, TodoList>(&format!(
            "SELECT {TODO_LIST_COLUMNS} FROM todo_lists WHERE id = $1 AND ($2::BIGINT IS NULL OR user_id = $2)"
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(TODO_LIST_NOT_FOUND.to_string()))
    }

    async fn create_todo_list(&self, owner_id: i64, changes: TodoListChanges) -> Result<TodoList, DatabaseError> {
        sqlx::query_as::<_, TodoList>(&format!(
            "INSERT INTO todo_lists (user_id, name, description) VALUES ($1, $2, $3) RETURNING {TODO_LIST_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&changes.name)
        .bind(&changes.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_constraint(e, "Todo list already exists", USER_NOT_FOUND))
    }

    async fn update_todo_list(
        &self,
        scope: Scope,
        id: i64,
        changes: TodoListChanges,
    ) -> Result<TodoList, DatabaseError> {
        sqlx::query_as::<_, TodoList>(&format!(
            "UPDATE todo_lists SET name = $1, description = $2, updated = now() \
             WHERE id = $3 AND ($4::BIGINT IS NULL OR user_id = $4) RETURNING {TODO_LIST_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(TODO_LIST_NOT_FOUND.to_string()))
    }

    async fn delete_todo_list(&self, scope: Scope, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM todo_lists WHERE id = $1 AND ($2::BIGINT IS NULL OR user_id = $2)")
            .bind(id)
            .bind(scope.owner())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(TODO_LIST_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    async fn list_todos(&self, scope: Scope) -> Result<Vec<Todo>, DatabaseError> {
        let todos = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos t JOIN todo_lists l ON l.id = t.todo_list_id \
             WHERE ($1::BIGINT IS NULL OR l.user_id = $1) ORDER BY t.id"
        ))
        .bind(scope.owner())
        .fetch_all(&self.pool)
        .await?;
        Ok(todos)
    }

    async fn get_todo(&self, scope: Scope, id: i64) -> Result<Todo, DatabaseError> {
        sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos t JOIN todo_lists l ON l.id = t.todo_list_id \
             WHERE t.id = $1 AND ($2::BIGINT IS NULL OR l.user_id = $2)"
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(TODO_NOT_FOUND.to_string()))
    }

    async fn create_todo(&self, scope: Scope, changes: TodoChanges) -> Result<Todo, DatabaseError> {
        // Parent must be visible to the caller, not merely present
        self.get_todo_list(scope, changes.todo_list_id).await?;

        sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todos AS t (todo_list_id, title, description, is_completed, due_date) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {TODO_COLUMNS}"
        ))
        .bind(changes.todo_list_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.is_completed)
        .bind(changes.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_constraint(e, "Todo already exists", TODO_LIST_NOT_FOUND))
    }

    async fn update_todo(&self, scope: Scope, id: i64, changes: TodoChanges) -> Result<Todo, DatabaseError> {
        self.get_todo_list(scope, changes.todo_list_id).await?;

        sqlx::query_as::<_, Todo>(&format!(
            "UPDATE todos AS t SET todo_list_id = $1, title = $2, description = $3, is_completed = $4, \
             due_date = $5, updated = now() FROM todo_lists l \
             WHERE t.id = $6 AND l.id = t.todo_list_id AND ($7::BIGINT IS NULL OR l.user_id = $7) \
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(changes.todo_list_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.is_completed)
        .bind(changes.due_date)
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_constraint(e, "Todo already exists", TODO_LIST_NOT_FOUND))?
        .ok_or_else(|| DatabaseError::NotFound(TODO_NOT_FOUND.to_string()))
    }

    async fn delete_todo(&self, scope: Scope, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM todos t USING todo_lists l \
             WHERE t.id = $1 AND l.id = t.todo_list_id AND ($2::BIGINT IS NULL OR l.user_id = $2)",
        )
        .bind(id)
        .bind(scope.owner())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(TODO_NOT_FOUND.to_string()));
        }
        Ok(())
    }
}
