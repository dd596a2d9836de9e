pub mod csrf;
pub mod session;

pub use csrf::verify_csrf;
pub use session::require_session;
