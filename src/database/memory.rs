use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    NewUser, Profile, ProfileChanges, Session, Todo, TodoChanges, TodoList, TodoListChanges, User,
};
use crate::database::store::{
    Scope, Store, DUPLICATE_USERNAME, PROFILE_NOT_FOUND, TODO_LIST_NOT_FOUND, TODO_NOT_FOUND, USER_NOT_FOUND,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    profiles: BTreeMap<i64, Profile>,
    sessions: HashMap<String, Session>,
    todo_lists: BTreeMap<i64, TodoList>,
    todos: BTreeMap<i64, Todo>,
    next_user_id: i64,
    next_profile_id: i64,
    next_todo_list_id: i64,
    next_todo_id: i64,
}

fn next_id(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl Tables {
    fn visible_list(&self, scope: Scope, id: i64) -> Result<&TodoList, DatabaseError> {
        self.todo_lists
            .get(&id)
            .filter(|list| scope.permits(list.user_id))
            .ok_or_else(|| DatabaseError::NotFound(TODO_LIST_NOT_FOUND.to_string()))
    }

    fn todo_visible(&self, scope: Scope, todo: &Todo) -> bool {
        self.todo_lists
            .get(&todo.todo_list_id)
            .map(|list| scope.permits(list.user_id))
            .unwrap_or(false)
    }

    fn remove_list_cascade(&mut self, id: i64) {
        self.todo_lists.remove(&id);
        self.todos.retain(|_, todo| todo.todo_list_id != id);
    }
}

/// In-process store with the same constraint and cascade rules as the
/// PostgreSQL schema. Data lives for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict(DUPLICATE_USERNAME.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: next_id(&mut tables.next_user_id),
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: now,
            last_login: None,
        };
        let profile = Profile {
            id: next_id(&mut tables.next_profile_id),
            user_id: user.id,
            dark_mode: false,
            created: now,
            updated: now,
        };
        tables.profiles.insert(profile.id, profile);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn record_login(&self, id: i64) -> Result<(), DatabaseError> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(DatabaseError::NotFound(USER_NOT_FOUND.to_string()));
        }

        tables.profiles.retain(|_, p| p.user_id != id);
        tables.sessions.retain(|_, s| s.user_id != id);
        let owned: Vec<i64> = tables
            .todo_lists
            .values()
            .filter(|list| list.user_id == id)
            .map(|list| list.id)
            .collect();
        for list_id in owned {
            tables.remove_list_cascade(list_id);
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: i64) -> Result<Profile, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(PROFILE_NOT_FOUND.to_string()))
    }

    async fn update_profile(&self, user_id: i64, changes: ProfileChanges) -> Result<Profile, DatabaseError> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .values_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| DatabaseError::NotFound(PROFILE_NOT_FOUND.to_string()))?;
        profile.dark_mode = changes.dark_mode;
        profile.updated = Utc::now();
        Ok(profile.clone())
    }

    async fn create_session(&self, session: Session) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(DatabaseError::NotFound(USER_NOT_FOUND.to_string()));
        }
        if tables.sessions.contains_key(&session.key) {
            return Err(DatabaseError::Conflict("Session already exists".to_string()));
        }
        tables.sessions.insert(session.key.clone(), session);
        Ok(())
    }

    async fn find_session(&self, key: &str) -> Result<Option<Session>, DatabaseError> {
        Ok(self.tables.read().await.sessions.get(key).cloned())
    }

    async fn delete_session(&self, key: &str) -> Result<(), DatabaseError> {
        self.tables.write().await.sessions.remove(key);
        Ok(())
    }

    async fn list_todo_lists(&self, scope: Scope) -> Result<Vec<TodoList>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .todo_lists
            .values()
            .filter(|list| scope.permits(list.user_id))
            .cloned()
            .collect())
    }

    async fn get_todo_list(&self, scope: Scope, id: i64) -> Result<TodoList, DatabaseError> {
        self.tables.read().await.visible_list(scope, id).cloned()
    }

    async fn create_todo_list(&self, owner_id: i64, changes: TodoListChanges) -> Result<TodoList, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(DatabaseError::NotFound(USER_NOT_FOUND.to_string()));
        }

        let now = Utc::now();
        let list = TodoList {
            id: next_id(&mut tables.next_todo_list_id),
            user_id: owner_id,
            name: changes.name,
            description: changes.description,
            created: now,
            updated: now,
        };
        tables.todo_lists.insert(list.id, list.clone());
        Ok(list)
    }

    async fn update_todo_list(
        &self,
        scope: Scope,
        id: i64,
        changes: TodoListChanges,
    ) -> Result<TodoList, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.visible_list(scope, id)?;

        let list = tables
            .todo_lists
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(TODO_LIST_NOT_FOUND.to_string()))?;
        list.name = changes.name;
        list.description = changes.description;
        list.updated = Utc::now();
        Ok(list.clone())
    }

    async fn delete_todo_list(&self, scope: Scope, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.visible_list(scope, id)?;
        tables.remove_list_cascade(id);
        Ok(())
    }

    async fn list_todos(&self, scope: Scope) -> Result<Vec<Todo>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .todos
            .values()
            .filter(|todo| tables.todo_visible(scope, todo))
            .cloned()
            .collect())
    }

    async fn get_todo(&self, scope: Scope, id: i64) -> Result<Todo, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .todos
            .get(&id)
            .filter(|todo| tables.todo_visible(scope, todo))
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(TODO_NOT_FOUND.to_string()))
    }

    async fn create_todo(&self, scope: Scope, changes: TodoChanges) -> Result<Todo, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.visible_list(scope, changes.todo_list_id)?;

        let now = Utc::now();
        let todo = Todo {
            id: next_id(&mut tables.next_todo_id),
            todo_list_id: changes.todo_list_id,
            title: changes.title,
            description: changes.description,
            is_completed: changes.is_completed,
            due_date: changes.due_date,
            created: now,
            updated: now,
        };
        tables.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn update_todo(&self, scope: Scope, id: i64, changes: TodoChanges) -> Result<Todo, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.visible_list(scope, changes.todo_list_id)?;
        let visible = tables
            .todos
            .get(&id)
            .map(|todo| tables.todo_visible(scope, todo))
            .unwrap_or(false);
        if !visible {
            return Err(DatabaseError::NotFound(TODO_NOT_FOUND.to_string()));
        }

        let todo = tables
            .todos
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(TODO_NOT_FOUND.to_string()))?;
        todo.todo_list_id = changes.todo_list_id;
        todo.title = changes.title;
        todo.description = changes.description;
        todo.is_completed = changes.is_completed;
        todo.due_date = changes.due_date;
        todo.updated = Utc::now();
        Ok(todo.clone())
    }

    async fn delete_todo(&self, scope: Scope, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let visible = tables
            .todos
            .get(&id)
            .map(|todo| tables.todo_visible(scope, todo))
            .unwrap_or(false);
        if !visible {
            return Err(DatabaseError::NotFound(TODO_NOT_FOUND.to_string()));
        }
        tables.todos.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password: "hashed".to_string(),
        }
    }

    fn list_changes(name: &str) -> TodoListChanges {
        TodoListChanges {
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn todo_changes(list_id: i64, title: &str) -> TodoChanges {
        TodoChanges {
            todo_list_id: list_id,
            title: title.to_string(),
            description: String::new(),
            is_completed: false,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
        assert!(store.get_user(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn creates_profile_with_user() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("bob")).await.unwrap();

        let profile = store.get_profile(user.id).await.unwrap();
        assert!(!profile.dark_mode);

        let updated = store.update_profile(user.id, ProfileChanges { dark_mode: true }).await.unwrap();
        assert!(updated.dark_mode);
        assert!(updated.updated >= profile.updated);
    }

    #[tokio::test]
    async fn deleting_list_cascades_to_todos() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("carol")).await.unwrap();
        let scope = Scope::Owner(user.id);
        let list = store.create_todo_list(user.id, list_changes("groceries")).await.unwrap();
        let todo = store.create_todo(scope, todo_changes(list.id, "milk")).await.unwrap();

        store.delete_todo_list(scope, list.id).await.unwrap();

        assert!(matches!(store.get_todo(scope, todo.id).await, Err(DatabaseError::NotFound(_))));
        assert!(store.list_todos(scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_user_cascades_everything() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("dave")).await.unwrap();
        let list = store.create_todo_list(user.id, list_changes("work")).await.unwrap();
        store.create_todo(Scope::All, todo_changes(list.id, "report")).await.unwrap();
        store
            .create_session(Session::new("key".to_string(), user.id, chrono::Duration::hours(1)))
            .await
            .unwrap();

        store.delete_user(user.id).await.unwrap();

        assert!(store.find_session("key").await.unwrap().is_none());
        assert!(store.get_profile(user.id).await.is_err());
        assert!(store.list_todo_lists(Scope::All).await.unwrap().is_empty());
        assert!(store.list_todos(Scope::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_scope_hides_foreign_lists() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let list = store.create_todo_list(alice.id, list_changes("private")).await.unwrap();

        let bob_scope = Scope::Owner(bob.id);
        assert!(store.list_todo_lists(bob_scope).await.unwrap().is_empty());
        assert!(store.get_todo_list(bob_scope, list.id).await.is_err());
        assert!(store.delete_todo_list(bob_scope, list.id).await.is_err());
        assert!(store.create_todo(bob_scope, todo_changes(list.id, "sneaky")).await.is_err());
        assert_eq!(store.list_todo_lists(Scope::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_reparents_todo() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("erin")).await.unwrap();
        let scope = Scope::Owner(user.id);
        let first = store.create_todo_list(user.id, list_changes("first")).await.unwrap();
        let second = store.create_todo_list(user.id, list_changes("second")).await.unwrap();
        let todo = store.create_todo(scope, todo_changes(first.id, "move me")).await.unwrap();

        let moved = store
            .update_todo(scope, todo.id, todo_changes(second.id, "moved"))
            .await
            .unwrap();
        assert_eq!(moved.todo_list_id, second.id);
        assert_eq!(moved.created, todo.created);

        store.delete_todo_list(scope, first.id).await.unwrap();
        assert_eq!(store.get_todo(scope, todo.id).await.unwrap().title, "moved");
    }

    #[tokio::test]
    async fn create_todo_requires_parent() {
        let store = MemoryStore::new();
        let err = store.create_todo(Scope::All, todo_changes(42, "orphan")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(msg) if msg == TODO_LIST_NOT_FOUND));
    }
}
