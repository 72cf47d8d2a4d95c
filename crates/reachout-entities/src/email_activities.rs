use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};
use reachout_core::DBDateTime;

/// Email channel detail for one sales activity (1:1). `tracking_id` is
/// the unique key open/click/reply callbacks correlate on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub activity_id: Uuid,
    pub to_email: String,
    pub from_email: String,
    pub subject: String,
    pub content: String,
    pub html_content: Option<String>,
    pub tracking_id: Option<String>,
    pub sent_at: Option<DBDateTime>,
    pub opened_at: Option<DBDateTime>,
    pub clicked_at: Option<DBDateTime>,
    pub replied_at: Option<DBDateTime>,
    pub bounced_at: Option<DBDateTime>,
    pub bounce_reason: Option<String>,
    pub smtp_response: Option<String>,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_activities::Entity",
        from = "Column::ActivityId",
        to = "super::sales_activities::Column::Id"
    )]
    Activity,
}

impl Related<super::sales_activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert {
            if self.id.is_not_set() {
                self.id = Set(Uuid::new_v4());
            }
            if self.created_at.is_not_set() {
                self.created_at = Set(chrono::Utc::now());
            }
        }

        Ok(self)
    }
}
