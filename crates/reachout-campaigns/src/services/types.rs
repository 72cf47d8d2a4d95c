use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use reachout_core::UtcDateTime;
use reachout_entities::types::{ActivityStatus, CampaignStatus, CampaignType};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub list_id: Uuid,
    pub campaign_type: CampaignType,
    pub target_count: Option<i32>,
    pub ai_config: Option<serde_json::Value>,
    pub template_config: Option<serde_json::Value>,
    pub schedule_config: Option<serde_json::Value>,
    pub rate_limit_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmailActivityRequest {
    pub campaign_id: Uuid,
    pub company_id: Uuid,
    pub to_email: String,
    pub from_email: String,
    pub subject: String,
    pub content: String,
    pub html_content: Option<String>,
    pub scheduled_at: Option<UtcDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFormActivityRequest {
    pub campaign_id: Uuid,
    pub company_id: Uuid,
    pub form_url: String,
    pub form_fields: serde_json::Value,
    pub content: Option<String>,
    pub scheduled_at: Option<UtcDateTime>,
}

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Campaign not found")]
    CampaignNotFound,

    #[error("Activity not found")]
    ActivityNotFound,

    #[error("List not found")]
    ListNotFound,

    #[error("List belongs to a different user")]
    ListOwnershipViolation,

    #[error("Invalid campaign transition: {from} -> {to}")]
    InvalidCampaignTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("Invalid activity transition: {from} -> {to}")]
    InvalidActivityTransition {
        from: ActivityStatus,
        to: ActivityStatus,
    },

    #[error("Constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },
}

impl From<sea_orm::DbErr> for CampaignError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                CampaignError::ConstraintViolation {
                    reason: "A unique constraint was violated".to_string(),
                }
            }
            Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_)) => {
                CampaignError::ConstraintViolation {
                    reason: "A foreign key constraint was violated".to_string(),
                }
            }
            _ => CampaignError::DatabaseError {
                reason: error.to_string(),
            },
        }
    }
}

impl From<sea_orm::TransactionError<CampaignError>> for CampaignError {
    fn from(error: sea_orm::TransactionError<CampaignError>) -> Self {
        match error {
            sea_orm::TransactionError::Connection(db) => db.into(),
            sea_orm::TransactionError::Transaction(inner) => inner,
        }
    }
}
