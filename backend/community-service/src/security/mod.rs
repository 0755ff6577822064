//! Password hashing and cookie-backed sessions

pub mod password;
pub mod session;

pub use session::{SessionManager, SESSION_COOKIE};
