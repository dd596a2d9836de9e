pub mod profile;
pub mod session;
pub mod todo;
pub mod todo_list;
pub mod user;

pub use profile::{Profile, ProfileChanges};
pub use session::Session;
pub use todo::{Todo, TodoChanges};
pub use todo_list::{TodoList, TodoListChanges};
pub use user::{NewUser, User};
