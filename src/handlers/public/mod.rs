// handlers/public/mod.rs - Public handlers (no authentication required)

pub mod auth;

pub use auth::csrf_token;
pub use auth::login;
pub use auth::register;
