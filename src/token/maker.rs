use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{OsRngTokenIdGenerator, Payload, TokenError, TokenIdGenerator};

pub const MIN_SECRET_KEY_SIZE: usize = 32;

/// Only symmetric HMAC signatures are accepted; `none` never decodes into one of these
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Creates and verifies signed bearer tokens
pub trait TokenMaker: Send + Sync {
    fn create_token(&self, user_id: i32, duration: Duration)
        -> Result<(String, Payload), TokenError>;
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError>;
}

/// HMAC-signed JWT implementation of [`TokenMaker`]
#[derive(Clone)]
pub struct JwtMaker {
    secret: String,
    id_generator: Arc<dyn TokenIdGenerator>,
}

impl JwtMaker {
    pub fn new(secret: impl Into<String>) -> Result<Self, TokenError> {
        Self::with_id_generator(secret, Arc::new(OsRngTokenIdGenerator::new()))
    }

    /// Builds a maker with an explicit token id source; the secret length is checked here once
    pub fn with_id_generator(
        secret: impl Into<String>,
        id_generator: Arc<dyn TokenIdGenerator>,
    ) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.chars().count() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::InvalidKeySize(MIN_SECRET_KEY_SIZE));
        }

        Ok(Self {
            secret,
            id_generator,
        })
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        // Expiry lives in `expired_at` and is checked without leeway after the signature
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        validation
    }
}

impl TokenMaker for JwtMaker {
    #[instrument(skip(self))]
    fn create_token(
        &self,
        user_id: i32,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let token_id = self.id_generator.generate()?;
        let payload = Payload::new(token_id, user_id, duration);

        debug!(
            token_id = %payload.id,
            expired_at = %payload.expired_at,
            "Creating JWT token"
        );

        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            TokenError::Internal(e.to_string())
        })?;

        Ok((token, payload))
    }

    #[instrument(skip(self, token))]
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let payload = decode::<Payload>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Self::validation(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            TokenError::InvalidToken
        })?;

        if payload.is_expired() {
            debug!(token_id = %payload.id, "JWT token has expired");
            return Err(TokenError::ExpiredToken);
        }

        Ok(payload)
    }
}
