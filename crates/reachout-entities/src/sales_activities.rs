use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};
use reachout_core::DBDateTime;

use super::types::{ActivityStatus, ActivityType};

/// One outreach attempt against one company within one campaign.
/// Requires both parents to exist; deleting either cascades here and to
/// the channel detail row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub company_id: Uuid,
    pub activity_type: ActivityType,
    pub status: ActivityStatus,
    pub channel: String,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub response_content: Option<String>,
    pub metadata: Option<Json>,
    pub scheduled_at: Option<DBDateTime>,
    pub executed_at: Option<DBDateTime>,
    pub responded_at: Option<DBDateTime>,
    pub created_at: DBDateTime,
    pub updated_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaigns::Entity",
        from = "Column::CampaignId",
        to = "super::campaigns::Column::Id"
    )]
    Campaign,
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Company,
    #[sea_orm(has_one = "super::email_activities::Entity")]
    EmailActivity,
    #[sea_orm(has_one = "super::form_activities::Entity")]
    FormActivity,
}

impl Related<super::campaigns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::email_activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmailActivity.def()
    }
}

impl Related<super::form_activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormActivity.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            if self.id.is_not_set() {
                self.id = Set(Uuid::new_v4());
            }
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }

        Ok(self)
    }
}
