use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};
use reachout_core::DBDateTime;

use super::types::CompanyStatus;

/// Prospect organization, owned by exactly one user. `list_id` records
/// which list a bulk import created the row under; the row survives list
/// deletion with the reference nulled.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub list_id: Option<Uuid>,
    pub name: String,
    pub domain: Option<String>,
    pub website_url: Option<String>,
    pub industry: Option<String>,
    pub employee_count_range: Option<String>,
    pub revenue_range: Option<String>,
    pub country: String,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub status: CompanyStatus,
    pub last_contacted_at: Option<DBDateTime>,
    pub response_status: Option<String>,
    pub tags: Option<Json>,
    pub custom_fields: Option<Json>,
    pub created_at: DBDateTime,
    pub updated_at: DBDateTime,
    pub deleted_at: Option<DBDateTime>,
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
    #[sea_orm(has_many = "super::company_contacts::Entity")]
    Contacts,
    #[sea_orm(has_many = "super::company_list_items::Entity")]
    ListItems,
    #[sea_orm(has_many = "super::sales_activities::Entity")]
    SalesActivities,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::company_contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacts.def()
    }
}

impl Related<super::company_list_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListItems.def()
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
