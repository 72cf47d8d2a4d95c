use serde::Deserialize;
use thiserror::Error;

/// One row of a bulk company import (CSV upload or URL extraction on
/// the dashboard). Status arrives as a string and is validated against
/// the closed set before anything is written.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewCompanyRow {
    pub name: String,
    pub domain: Option<String>,
    pub website_url: Option<String>,
    pub industry: Option<String>,
    pub employee_count_range: Option<String>,
    pub revenue_range: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub domain: Option<String>,
    pub website_url: Option<String>,
    pub industry: Option<String>,
    pub employee_count_range: Option<String>,
    pub revenue_range: Option<String>,
    pub country: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContactRequest {
    pub contact_type: String,
    pub value: String,
    pub contact_person_name: Option<String>,
    pub contact_person_title: Option<String>,
    pub department: Option<String>,
    pub is_primary: bool,
}

#[derive(Error, Debug)]
pub enum ProspectError {
    #[error("Company not found")]
    CompanyNotFound,

    #[error("List not found")]
    ListNotFound,

    #[error("Contact not found")]
    ContactNotFound,

    #[error("Constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },
}

impl From<sea_orm::DbErr> for ProspectError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                ProspectError::ConstraintViolation {
                    reason: "A unique constraint was violated".to_string(),
                }
            }
            Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_)) => {
                ProspectError::ConstraintViolation {
                    reason: "A foreign key constraint was violated".to_string(),
                }
            }
            _ => ProspectError::DatabaseError {
                reason: error.to_string(),
            },
        }
    }
}

impl From<sea_orm::TransactionError<ProspectError>> for ProspectError {
    fn from(error: sea_orm::TransactionError<ProspectError>) -> Self {
        match error {
            sea_orm::TransactionError::Connection(db) => db.into(),
            sea_orm::TransactionError::Transaction(inner) => inner,
        }
    }
}
