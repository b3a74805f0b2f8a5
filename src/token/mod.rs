// Public API - what other modules can use
pub use errors::TokenError;
pub use generators::{OsRngTokenIdGenerator, TokenIdGenerator};
pub use maker::{JwtMaker, TokenMaker, MIN_SECRET_KEY_SIZE};
pub use payload::Payload;

// Internal modules
mod errors;
mod generators;
mod maker;
mod payload;
