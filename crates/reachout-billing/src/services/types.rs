use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Webhook signature rejected: {0}")]
    InvalidSignature(String),

    #[error("Unknown subscription status: {0}")]
    UnknownStatus(String),

    #[error("Constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    #[error("Payment provider error: {message}")]
    Provider { message: String },

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },
}

impl From<sea_orm::DbErr> for BillingError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                BillingError::ConstraintViolation {
                    reason: "A unique constraint was violated".to_string(),
                }
            }
            Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_)) => {
                BillingError::ConstraintViolation {
                    reason: "A foreign key constraint was violated".to_string(),
                }
            }
            _ => BillingError::DatabaseError {
                reason: error.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for BillingError {
    fn from(error: reqwest::Error) -> Self {
        BillingError::Provider {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(error: serde_json::Error) -> Self {
        BillingError::InvalidPayload(error.to_string())
    }
}
