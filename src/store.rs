use sqlx::{Postgres, Transaction};
use thiserror::Error;
use tracing::warn;

/// PostgreSQL error codes the repositories translate into tagged variants
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Constraint names shared by the Postgres schema and the in-memory stores
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const USERS_NICKNAME_KEY: &str = "users_nickname_key";
pub const SESSIONS_PKEY: &str = "sessions_pkey";
pub const GOODS_CATEGORIES_PKEY: &str = "goods_categories_pkey";
pub const GOODS_CATEGORIES_CATEGORY_ID_FKEY: &str = "goods_categories_category_id_fkey";
pub const GOODS_CATEGORIES_GOODS_ID_FKEY: &str = "goods_categories_goods_id_fkey";
pub const GOODS_IMAGES_GOODS_ID_FKEY: &str = "goods_images_goods_id_fkey";

/// Error returned by every repository implementation.
///
/// Services match on the tagged variants exactly once and never look at
/// driver-specific error internals.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique violation on {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key violation on {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("tx err: {source}, rb err: {rollback}")]
    Rollback {
        source: Box<StoreError>,
        rollback: String,
    },

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }

    pub fn foreign_key(constraint: &str) -> Self {
        StoreError::ForeignKeyViolation {
            constraint: constraint.to_string(),
        }
    }

    pub fn is_unique_violation(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }

    pub fn is_foreign_key_violation(&self, name: &str) -> bool {
        matches!(self, StoreError::ForeignKeyViolation { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => return StoreError::UniqueViolation { constraint },
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    return StoreError::ForeignKeyViolation { constraint }
                }
                _ => {}
            }
        }

        StoreError::Database(err.to_string())
    }
}

/// Commits the transaction when the unit of work succeeded and rolls it back otherwise.
///
/// When the rollback itself fails both errors are surfaced together.
pub async fn finish_tx<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => match tx.rollback().await {
            Ok(()) => Err(err),
            Err(rb_err) => {
                warn!(error = %err, rollback_error = %rb_err, "Transaction rollback failed");
                Err(StoreError::Rollback {
                    source: Box::new(err),
                    rollback: rb_err.to_string(),
                })
            }
        },
    }
}
