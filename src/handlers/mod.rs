// handlers/mod.rs - Two-tier handler layout
//
// Public (no session) → Protected (session cookie, CSRF on unsafe methods)

pub mod public;    // /register, /login, /set-csrf-token
pub mod protected; // /user, /todo-lists, /todos/, ...
