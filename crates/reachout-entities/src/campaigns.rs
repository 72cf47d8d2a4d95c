use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};
use reachout_core::DBDateTime;

use super::types::{CampaignStatus, CampaignType};

/// Outreach run against exactly one company list. The list reference is
/// RESTRICT on delete: a list cannot disappear under a live campaign.
/// Ownership (campaign user == list user) is checked by the campaign
/// service; the foreign key only guarantees existence.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub target_count: Option<i32>,
    pub success_count: i32,
    /// AI generation parameters (tone, language, temperature, ...)
    pub ai_config: Json,
    /// Message template reference and overrides
    pub template_config: Json,
    pub schedule_config: Option<Json>,
    /// Send throttling, defaults to {"per_hour": 10, "per_day": 100}
    pub rate_limit_config: Option<Json>,
    pub started_at: Option<DBDateTime>,
    pub completed_at: Option<DBDateTime>,
    pub created_at: DBDateTime,
    pub updated_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::company_lists::Entity",
        from = "Column::ListId",
        to = "super::company_lists::Column::Id"
    )]
    List,
    #[sea_orm(has_many = "super::sales_activities::Entity")]
    SalesActivities,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::company_lists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::List.def()
    }
}

impl Related<super::sales_activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesActivities.def()
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
