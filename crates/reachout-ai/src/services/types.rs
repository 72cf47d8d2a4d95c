use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Template not found")]
    TemplateNotFound,

    #[error("AI provider error: {message}")]
    Provider { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },
}

impl From<sea_orm::DbErr> for AiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => AiError::ConstraintViolation {
                reason: "A unique constraint was violated".to_string(),
            },
            Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_)) => {
                AiError::ConstraintViolation {
                    reason: "A foreign key constraint was violated".to_string(),
                }
            }
            _ => AiError::DatabaseError {
                reason: error.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(error: reqwest::Error) -> Self {
        AiError::Provider {
            message: error.to_string(),
        }
    }
}
