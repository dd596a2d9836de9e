use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    NewUser, Profile, ProfileChanges, Session, Todo, TodoChanges, TodoList, TodoListChanges, User,
};

/// Which todo lists an operation may see.
///
/// `Owner` restricts list and todo operations to lists owned by that user;
/// records outside the scope behave exactly like missing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Owner(i64),
    All,
}

impl Scope {
    pub fn for_user(user_id: i64, owner_scoping: bool) -> Self {
        if owner_scoping {
            Scope::Owner(user_id)
        } else {
            Scope::All
        }
    }

    /// Owner filter as a nullable SQL parameter.
    pub fn owner(&self) -> Option<i64> {
        match self {
            Scope::Owner(id) => Some(*id),
            Scope::All => None,
        }
    }

    pub fn permits(&self, owner_id: i64) -> bool {
        match self {
            Scope::Owner(id) => *id == owner_id,
            Scope::All => true,
        }
    }
}

pub const USER_NOT_FOUND: &str = "User not found";
pub const TODO_LIST_NOT_FOUND: &str = "Todo list not found";
pub const TODO_NOT_FOUND: &str = "Todo not found";
pub const PROFILE_NOT_FOUND: &str = "Profile not found";
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Persistence contract shared by the PostgreSQL and in-memory backends.
///
/// Deleting a user removes its profile, sessions, lists and their todos;
/// deleting a list removes its todos. Lookups that miss return
/// `DatabaseError::NotFound`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Users

    /// Inserts the user together with its default profile.
    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    async fn record_login(&self, id: i64) -> Result<(), DatabaseError>;
    async fn delete_user(&self, id: i64) -> Result<(), DatabaseError>;

    // Profiles

    async fn get_profile(&self, user_id: i64) -> Result<Profile, DatabaseError>;
    async fn update_profile(&self, user_id: i64, changes: ProfileChanges) -> Result<Profile, DatabaseError>;

    // Sessions

    async fn create_session(&self, session: Session) -> Result<(), DatabaseError>;
    async fn find_session(&self, key: &str) -> Result<Option<Session>, DatabaseError>;
    async fn delete_session(&self, key: &str) -> Result<(), DatabaseError>;

    // Todo lists

    async fn list_todo_lists(&self, scope: Scope) -> Result<Vec<TodoList>, DatabaseError>;
    async fn get_todo_list(&self, scope: Scope, id: i64) -> Result<TodoList, DatabaseError>;
    async fn create_todo_list(&self, owner_id: i64, changes: TodoListChanges) -> Result<TodoList, DatabaseError>;
    async fn update_todo_list(
        &self,
        scope: Scope,
        id: i64,
        changes: TodoListChanges,
    ) -> Result<TodoList, DatabaseError>;
    async fn delete_todo_list(&self, scope: Scope, id: i64) -> Result<(), DatabaseError>;

    // Todos

    async fn list_todos(&self, scope: Scope) -> Result<Vec<Todo>, DatabaseError>;
    async fn get_todo(&self, scope: Scope, id: i64) -> Result<Todo, DatabaseError>;
    /// Fails with `NotFound` when the parent list is absent or outside `scope`.
    async fn create_todo(&self, scope: Scope, changes: TodoChanges) -> Result<Todo, DatabaseError>;
    async fn update_todo(&self, scope: Scope, id: i64, changes: TodoChanges) -> Result<Todo, DatabaseError>;
    async fn delete_todo(&self, scope: Scope, id: i64) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_for_user_respects_flag() {
        assert_eq!(Scope::for_user(7, true), Scope::Owner(7));
        assert_eq!(Scope::for_user(7, false), Scope::All);
    }

    #[test]
    fn scope_permits_only_owner() {
        assert!(Scope::Owner(1).permits(1));
        assert!(!Scope::Owner(1).permits(2));
        assert!(Scope::All.permits(2));
        assert_eq!(Scope::All.owner(), None);
    }
}
