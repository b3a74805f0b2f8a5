use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenError {
    #[error("invalid key size: must be at least {0} characters")]
    InvalidKeySize(usize),

    #[error("token is invalid")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token error: {0}")]
    Internal(String),
}
