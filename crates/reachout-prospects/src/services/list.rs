use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use reachout_database::DbConnection;
use reachout_entities::types::CompanyStatus;
use reachout_entities::{companies, company_list_items, company_lists};

use super::types::{NewCompanyRow, ProspectError};

/// Company lists and their membership. Bulk creation is a single
/// transaction: either the list and every company land together or
/// nothing is written.
pub struct ListService {
    db: Arc<DbConnection>,
}

impl ListService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    /// Insert a list, then bulk-insert the imported companies tagged
    /// with the new list id and owning user, plus one membership row
    /// per company. Any invalid row rolls back the whole batch.
    pub async fn create_list_with_companies(
        &self,
        user_id: Uuid,
        name: &str,
        description: Option<&str>,
        rows: Vec<NewCompanyRow>,
    ) -> Result<company_lists::Model, ProspectError> {
        if name.trim().is_empty() {
            return Err(ProspectError::InvalidInput(
                "list name is required".to_string(),
            ));
        }

        let name = name.to_string();
        let description = description.map(str::to_string);

        let list = self
            .db
            .transaction::<_, company_lists::Model, ProspectError>(move |txn| {
                Box::pin(async move {
                    let list = company_lists::ActiveModel {
                        user_id: Set(user_id),
                        name: Set(name),
                        description: Set(description),
                        total_companies: Set(rows.len() as i32),
                        is_public: Set(false),
                        ..Default::default()
                    };
                    let list = list.insert(txn).await?;

                    if rows.is_empty() {
                        return Ok(list);
                    }

                    let now = Utc::now();
                    let mut company_models = Vec::with_capacity(rows.len());
                    let mut item_models = Vec::with_capacity(rows.len());

                    for (position, row) in rows.into_iter().enumerate() {
                        if row.name.trim().is_empty() {
                            return Err(ProspectError::InvalidInput(format!(
                                "company row {} is missing a name",
                                position + 1
                            )));
                        }
                        let status = match row.status.as_deref() {
                            None => CompanyStatus::Active,
                            Some(raw) => CompanyStatus::from_str(raw).ok_or_else(|| {
                                ProspectError::InvalidInput(format!(
                                    "invalid company status: {raw}"
                                ))
                            })?,
                        };

                        // insert_many bypasses ActiveModelBehavior, so ids
                        // and timestamps are set here
                        let company_id = Uuid::new_v4();
                        company_models.push(companies::ActiveModel {
                            id: Set(company_id),
                            user_id: Set(user_id),
                            list_id: Set(Some(list.id)),
                            name: Set(row.name),
                            domain: Set(row.domain),
                            website_url: Set(row.website_url),
                            industry: Set(row.industry),
                            employee_count_range: Set(row.employee_count_range),
                            revenue_range: Set(row.revenue_range),
                            country: Set("Japan".to_string()),
                            prefecture: Set(row.prefecture),
                            city: Set(row.city),
                            description: Set(row.description),
                            status: Set(status),
                            tags: Set(row.tags.map(|t| serde_json::json!(t))),
                            custom_fields: Set(row.custom_fields),
                            created_at: Set(now),
                            updated_at: Set(now),
                            ..Default::default()
                        });
                        item_models.push(company_list_items::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            list_id: Set(list.id),
                            company_id: Set(company_id),
                            position: Set(Some(position as i32)),
                            added_at: Set(now),
                            ..Default::default()
                        });
                    }

                    companies::Entity::insert_many(company_models)
                        .exec(txn)
                        .await?;
                    company_list_items::Entity::insert_many(item_models)
                        .exec(txn)
                        .await?;

                    Ok(list)
                })
            })
            .await?;

        info!(list_id = %list.id, companies = list.total_companies, "created company list");
        Ok(list)
    }

    pub async fn get_list(&self, list_id: Uuid) -> Result<company_lists::Model, ProspectError> {
        company_lists::Entity::find_by_id(list_id)
            .filter(company_lists::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(ProspectError::ListNotFound)
    }

    pub async fn lists_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<company_lists::Model>, ProspectError> {
        Ok(company_lists::Entity::find()
            .filter(company_lists::Column::UserId.eq(user_id))
            .filter(company_lists::Column::DeletedAt.is_null())
            .order_by_desc(company_lists::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    /// Companies in list order.
    pub async fn list_companies(
        &self,
        list_id: Uuid,
    ) -> Result<Vec<companies::Model>, ProspectError> {
        Ok(companies::Entity::find()
            .join(JoinType::InnerJoin, companies::Relation::ListItems.def())
            .filter(company_list_items::Column::ListId.eq(list_id))
            .order_by_asc(company_list_items::Column::Position)
            .all(self.db.as_ref())
            .await?)
    }

    /// Add an existing company to a list. Adding the same company twice
    /// is a constraint violation.
    pub async fn add_company(
        &self,
        list_id: Uuid,
        company_id: Uuid,
        position: Option<i32>,
    ) -> Result<company_list_items::Model, ProspectError> {
        let item = company_list_items::ActiveModel {
            list_id: Set(list_id),
            company_id: Set(company_id),
            position: Set(position),
            ..Default::default()
        };
        let item = item.insert(self.db.as_ref()).await?;
        self.refresh_total(list_id).await?;
        Ok(item)
    }

    pub async fn remove_company(
        &self,
        list_id: Uuid,
        company_id: Uuid,
    ) -> Result<(), ProspectError> {
        let result = company_list_items::Entity::delete_many()
            .filter(company_list_items::Column::ListId.eq(list_id))
            .filter(company_list_items::Column::CompanyId.eq(company_id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ProspectError::CompanyNotFound);
        }
        self.refresh_total(list_id).await?;
        Ok(())
    }

    pub async fn soft_delete_list(&self, list_id: Uuid) -> Result<(), ProspectError> {
        let list = self.get_list(list_id).await?;
        let mut active: company_lists::ActiveModel = list.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    /// Hard delete. Fails with a constraint violation while a campaign
    /// still references the list.
    pub async fn delete_list(&self, list_id: Uuid) -> Result<(), ProspectError> {
        let result = company_lists::Entity::delete_by_id(list_id)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ProspectError::ListNotFound);
        }
        Ok(())
    }

    async fn refresh_total(&self, list_id: Uuid) -> Result<(), ProspectError> {
        let count = company_list_items::Entity::find()
            .filter(company_list_items::Column::ListId.eq(list_id))
            .count(self.db.as_ref())
            .await?;
        if let Some(list) = company_lists::Entity::find_by_id(list_id)
            .one(self.db.as_ref())
            .await?
        {
            let mut active: company_lists::ActiveModel = list.into();
            active.total_companies = Set(count as i32);
            active.update(self.db.as_ref()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachout_database::test_utils::TestDatabase;
    use reachout_entities::types::UserStatus;
    use reachout_entities::users;

    async fn seed_user(db: &DbConnection) -> anyhow::Result<users::Model> {
        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set("prospects@example.com".to_string()),
            name: Set("Prospects".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        Ok(user.insert(db).await?)
    }

    fn row(name: &str) -> NewCompanyRow {
        NewCompanyRow {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn bulk_creation_tags_companies_with_list_and_owner() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let lists = ListService::new(test_db.db.clone());

        let list = lists
            .create_list_with_companies(
                user.id,
                "My List",
                Some("desc"),
                vec![row("Acme"), row("Beta")],
            )
            .await?;
        assert_eq!(list.name, "My List");
        assert_eq!(list.total_companies, 2);

        let members = lists.list_companies(list.id).await?;
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "Acme");
        assert_eq!(members[1].name, "Beta");
        for company in &members {
            assert_eq!(company.user_id, user.id);
            assert_eq!(company.list_id, Some(list.id));
        }

        assert_eq!(
            company_lists::Entity::find()
                .count(test_db.db.as_ref())
                .await?,
            1
        );

        Ok(())
    }

    #[tokio::test]
    async fn invalid_row_rolls_back_the_whole_batch() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let lists = ListService::new(test_db.db.clone());

        let err = lists
            .create_list_with_companies(
                user.id,
                "Broken import",
                None,
                vec![row("Acme"), row("   "), row("Gamma")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProspectError::InvalidInput(_)));

        // Nothing survives: no orphaned list, no partial company batch
        assert_eq!(
            company_lists::Entity::find()
                .count(test_db.db.as_ref())
                .await?,
            0
        );
        assert_eq!(
            companies::Entity::find().count(test_db.db.as_ref()).await?,
            0
        );

        Ok(())
    }

    #[tokio::test]
    async fn out_of_set_row_status_rolls_back() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let lists = ListService::new(test_db.db.clone());

        let mut bad = row("Acme");
        bad.status = Some("pending".to_string());

        let err = lists
            .create_list_with_companies(user.id, "Bad status", None, vec![bad])
            .await
            .unwrap_err();
        assert!(matches!(err, ProspectError::InvalidInput(_)));
        assert_eq!(
            company_lists::Entity::find()
                .count(test_db.db.as_ref())
                .await?,
            0
        );

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_membership_is_a_constraint_violation() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let lists = ListService::new(test_db.db.clone());

        let list = lists
            .create_list_with_companies(user.id, "Dup list", None, vec![row("Acme")])
            .await?;
        let company = lists.list_companies(list.id).await?.remove(0);

        let err = lists
            .add_company(list.id, company.id, Some(9))
            .await
            .unwrap_err();
        assert!(matches!(err, ProspectError::ConstraintViolation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn membership_changes_keep_the_counter_fresh() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let lists = ListService::new(test_db.db.clone());

        let list = lists
            .create_list_with_companies(user.id, "Counter", None, vec![row("Acme"), row("Beta")])
            .await?;
        let members = lists.list_companies(list.id).await?;

        lists.remove_company(list.id, members[0].id).await?;
        let list = lists.get_list(list.id).await?;
        assert_eq!(list.total_companies, 1);

        Ok(())
    }
}
