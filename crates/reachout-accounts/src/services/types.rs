use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity supplied by the external auth provider. The provider has
/// already authenticated the caller; this layer trusts it.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthIdentity {
    pub provider_id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Quota snapshot for one (user, metric, period) counter.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub used: i32,
    pub limit: i32,
    pub exceeded: bool,
}

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("User not found")]
    UserNotFound,

    #[error("Constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                AccountError::ConstraintViolation {
                    reason: "A unique constraint was violated".to_string(),
                }
            }
            Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_)) => {
                AccountError::ConstraintViolation {
                    reason: "A foreign key constraint was violated".to_string(),
                }
            }
            _ => AccountError::DatabaseError {
                reason: error.to_string(),
            },
        }
    }
}
