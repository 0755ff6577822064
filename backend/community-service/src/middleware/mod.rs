/// Request extractors for session authentication
pub mod auth;

pub use auth::{AdminUser, AuthenticatedUser, OptionalUser};
