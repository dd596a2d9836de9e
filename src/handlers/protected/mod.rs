// handlers/protected/mod.rs - Protected handlers (session required)
//
// Every handler here receives the request principal as
// `Extension<CurrentUser>`, injected by `middleware::require_session`.

pub mod session;
pub mod todo;
pub mod todo_list;
pub mod user;

pub use session::logout as session_logout;
pub use user::{delete as user_delete, profile_get, profile_put, whoami as user_whoami};
