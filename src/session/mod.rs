// Public API - what other modules can use
pub use models::{CreateSessionParams, SessionModel};
pub use repository::{InMemorySessionRepository, PostgresSessionRepository, SessionRepository};
pub use self::validator::validate_session;

// Internal modules
pub mod models;
pub mod repository;
mod validator;
