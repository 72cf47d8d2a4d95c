use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use reachout_core::PaginationParams;
use reachout_database::DbConnection;
use reachout_entities::types::CompanyStatus;
use reachout_entities::{companies, company_contacts};

use super::types::{CreateCompanyRequest, CreateContactRequest, ProspectError};

/// Prospect companies and their contact channels.
pub struct CompanyService {
    db: Arc<DbConnection>,
}

impl CompanyService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    pub async fn create_company(
        &self,
        user_id: Uuid,
        request: CreateCompanyRequest,
    ) -> Result<companies::Model, ProspectError> {
        if request.name.trim().is_empty() {
            return Err(ProspectError::InvalidInput(
                "company name is required".to_string(),
            ));
        }

        let company = companies::ActiveModel {
            user_id: Set(user_id),
            name: Set(request.name),
            domain: Set(request.domain),
            website_url: Set(request.website_url),
            industry: Set(request.industry),
            employee_count_range: Set(request.employee_count_range),
            revenue_range: Set(request.revenue_range),
            country: Set(request.country.unwrap_or_else(|| "Japan".to_string())),
            prefecture: Set(request.prefecture),
            city: Set(request.city),
            description: Set(request.description),
            status: Set(CompanyStatus::Active),
            tags: Set(request.tags.map(|t| serde_json::json!(t))),
            custom_fields: Set(request.custom_fields),
            ..Default::default()
        };
        Ok(company.insert(self.db.as_ref()).await?)
    }

    pub async fn get_company(&self, company_id: Uuid) -> Result<companies::Model, ProspectError> {
        companies::Entity::find_by_id(company_id)
            .filter(companies::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(ProspectError::CompanyNotFound)
    }

    pub async fn companies_for_user(
        &self,
        user_id: Uuid,
        status: Option<CompanyStatus>,
        pagination: PaginationParams,
    ) -> Result<Vec<companies::Model>, ProspectError> {
        let (page, page_size) = pagination.normalize();

        let mut query = companies::Entity::find()
            .filter(companies::Column::UserId.eq(user_id))
            .filter(companies::Column::DeletedAt.is_null());
        if let Some(status) = status {
            query = query.filter(companies::Column::Status.eq(status.as_str()));
        }

        Ok(query
            .order_by_desc(companies::Column::CreatedAt)
            .paginate(self.db.as_ref(), page_size)
            .fetch_page(page - 1)
            .await?)
    }

    pub async fn set_status(
        &self,
        company_id: Uuid,
        status: CompanyStatus,
    ) -> Result<companies::Model, ProspectError> {
        let company = self.get_company(company_id).await?;
        let mut active: companies::ActiveModel = company.into();
        active.status = Set(status);
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Blacklisted companies keep their history but are excluded from
    /// campaign targeting.
    pub async fn blacklist(&self, company_id: Uuid) -> Result<companies::Model, ProspectError> {
        self.set_status(company_id, CompanyStatus::Blacklist).await
    }

    /// Stamp the company as contacted now. Called after every executed
    /// outreach attempt.
    pub async fn record_contact(
        &self,
        company_id: Uuid,
    ) -> Result<companies::Model, ProspectError> {
        let company = self.get_company(company_id).await?;
        let mut active: companies::ActiveModel = company.into();
        active.last_contacted_at = Set(Some(Utc::now()));
        Ok(active.update(self.db.as_ref()).await?)
    }

    pub async fn soft_delete_company(&self, company_id: Uuid) -> Result<(), ProspectError> {
        let company = self.get_company(company_id).await?;
        let mut active: companies::ActiveModel = company.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    pub async fn add_contact(
        &self,
        company_id: Uuid,
        request: CreateContactRequest,
    ) -> Result<company_contacts::Model, ProspectError> {
        if request.value.trim().is_empty() {
            return Err(ProspectError::InvalidInput(
                "contact value is required".to_string(),
            ));
        }

        let contact = company_contacts::ActiveModel {
            company_id: Set(company_id),
            contact_type: Set(request.contact_type),
            value: Set(request.value),
            contact_person_name: Set(request.contact_person_name),
            contact_person_title: Set(request.contact_person_title),
            department: Set(request.department),
            is_primary: Set(request.is_primary),
            is_verified: Set(false),
            ..Default::default()
        };
        Ok(contact.insert(self.db.as_ref()).await?)
    }

    pub async fn contacts_for_company(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<company_contacts::Model>, ProspectError> {
        Ok(company_contacts::Entity::find()
            .filter(company_contacts::Column::CompanyId.eq(company_id))
            .order_by_desc(company_contacts::Column::IsPrimary)
            .all(self.db.as_ref())
            .await?)
    }

    /// Make one contact the primary channel, demoting every other
    /// contact of the same company in the same transaction.
    pub async fn set_primary_contact(&self, contact_id: Uuid) -> Result<(), ProspectError> {
        let contact = company_contacts::Entity::find_by_id(contact_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(ProspectError::ContactNotFound)?;

        self.db
            .transaction::<_, (), ProspectError>(move |txn| {
                Box::pin(async move {
                    company_contacts::Entity::update_many()
                        .col_expr(company_contacts::Column::IsPrimary, Expr::value(false))
                        .filter(company_contacts::Column::CompanyId.eq(contact.company_id))
                        .exec(txn)
                        .await?;

                    let mut active: company_contacts::ActiveModel = contact.into();
                    active.is_primary = Set(true);
                    active.update(txn).await?;
                    Ok(())
                })
            })
            .await?;

        Ok(())
    }

    pub async fn mark_contact_verified(
        &self,
        contact_id: Uuid,
    ) -> Result<company_contacts::Model, ProspectError> {
        let contact = company_contacts::Entity::find_by_id(contact_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(ProspectError::ContactNotFound)?;
        let mut active: company_contacts::ActiveModel = contact.into();
        active.is_verified = Set(true);
        active.verification_date = Set(Some(Utc::now()));
        Ok(active.update(self.db.as_ref()).await?)
    }
}
