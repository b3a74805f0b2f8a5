use rand::rngs::OsRng;
use rand::TryRngCore;
use uuid::Uuid;

use super::TokenError;

/// Source of fresh token ids, injected into the token maker
pub trait TokenIdGenerator: Send + Sync {
    fn generate(&self) -> Result<Uuid, TokenError>;
}

/// Random v4 ids drawn from the operating system RNG
#[derive(Debug, Default)]
pub struct OsRngTokenIdGenerator;

impl OsRngTokenIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl TokenIdGenerator for OsRngTokenIdGenerator {
    fn generate(&self) -> Result<Uuid, TokenError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError::Internal(format!("cannot generate token id: {e}")))?;

        Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}
