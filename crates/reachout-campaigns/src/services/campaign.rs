use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::info;
use uuid::Uuid;

use reachout_database::DbConnection;
use reachout_entities::types::{CampaignStatus, CampaignType};
use reachout_entities::{campaigns, company_lists};
use reachout_telemetry::Telemetry;

use super::types::{CampaignError, CreateCampaignRequest};

fn default_rate_limit() -> serde_json::Value {
    serde_json::json!({ "per_hour": 10, "per_day": 100 })
}

/// Campaign lifecycle. Status changes go through the state machine on
/// `CampaignStatus`; the foreign key only guarantees the target list
/// exists, so list ownership is checked here.
pub struct CampaignService {
    db: Arc<DbConnection>,
    telemetry: Telemetry,
}

impl CampaignService {
    pub fn new(db: Arc<DbConnection>, telemetry: Telemetry) -> Self {
        Self { db, telemetry }
    }

    pub async fn create_campaign(
        &self,
        user_id: Uuid,
        request: CreateCampaignRequest,
    ) -> Result<campaigns::Model, CampaignError> {
        if request.name.trim().is_empty() {
            return Err(CampaignError::InvalidInput(
                "campaign name is required".to_string(),
            ));
        }

        let list = company_lists::Entity::find_by_id(request.list_id)
            .filter(company_lists::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(CampaignError::ListNotFound)?;
        if list.user_id != user_id {
            return Err(CampaignError::ListOwnershipViolation);
        }

        let campaign = campaigns::ActiveModel {
            user_id: Set(user_id),
            list_id: Set(request.list_id),
            name: Set(request.name),
            campaign_type: Set(request.campaign_type),
            status: Set(CampaignStatus::Draft),
            target_count: Set(request.target_count),
            success_count: Set(0),
            ai_config: Set(request.ai_config.unwrap_or_else(|| serde_json::json!({}))),
            template_config: Set(request
                .template_config
                .unwrap_or_else(|| serde_json::json!({}))),
            schedule_config: Set(request.schedule_config),
            rate_limit_config: Set(Some(
                request.rate_limit_config.unwrap_or_else(default_rate_limit),
            )),
            ..Default::default()
        };
        let campaign = campaign.insert(self.db.as_ref()).await?;

        info!(campaign_id = %campaign.id, "created campaign");
        self.telemetry.track_campaign("created", campaign.id);

        Ok(campaign)
    }

    pub async fn get_campaign(&self, campaign_id: Uuid) -> Result<campaigns::Model, CampaignError> {
        campaigns::Entity::find_by_id(campaign_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(CampaignError::CampaignNotFound)
    }

    pub async fn campaigns_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<campaigns::Model>, CampaignError> {
        Ok(campaigns::Entity::find()
            .filter(campaigns::Column::UserId.eq(user_id))
            .order_by_desc(campaigns::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    /// Validate and apply one status transition, stamping the
    /// lifecycle timestamps as states are entered.
    pub async fn transition_status(
        &self,
        campaign_id: Uuid,
        next: CampaignStatus,
    ) -> Result<campaigns::Model, CampaignError> {
        let campaign = self.get_campaign(campaign_id).await?;

        if !campaign.status.can_transition_to(next) {
            return Err(CampaignError::InvalidCampaignTransition {
                from: campaign.status,
                to: next,
            });
        }

        let was_draft = campaign.status == CampaignStatus::Draft;
        let mut active: campaigns::ActiveModel = campaign.into();
        active.status = Set(next);
        match next {
            CampaignStatus::Active if was_draft => {
                active.started_at = Set(Some(Utc::now()));
            }
            CampaignStatus::Completed => {
                active.completed_at = Set(Some(Utc::now()));
            }
            _ => {}
        }
        let campaign = active.update(self.db.as_ref()).await?;

        self.telemetry
            .track_campaign(campaign.status.as_str(), campaign.id);
        Ok(campaign)
    }

    pub async fn start(&self, campaign_id: Uuid) -> Result<campaigns::Model, CampaignError> {
        self.transition_status(campaign_id, CampaignStatus::Active)
            .await
    }

    pub async fn pause(&self, campaign_id: Uuid) -> Result<campaigns::Model, CampaignError> {
        self.transition_status(campaign_id, CampaignStatus::Paused)
            .await
    }

    pub async fn complete(&self, campaign_id: Uuid) -> Result<campaigns::Model, CampaignError> {
        self.transition_status(campaign_id, CampaignStatus::Completed)
            .await
    }

    pub async fn cancel(&self, campaign_id: Uuid) -> Result<campaigns::Model, CampaignError> {
        self.transition_status(campaign_id, CampaignStatus::Canceled)
            .await
    }

    /// Bump the success counter after a delivered/replied outcome.
    pub async fn increment_success(&self, campaign_id: Uuid) -> Result<(), CampaignError> {
        let result = campaigns::Entity::update_many()
            .col_expr(
                campaigns::Column::SuccessCount,
                Expr::col(campaigns::Column::SuccessCount).add(1),
            )
            .filter(campaigns::Column::Id.eq(campaign_id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(CampaignError::CampaignNotFound);
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
    use reachout_prospects::ListService;

    async fn seed_user(db: &DbConnection, email: &str) -> anyhow::Result<users::Model> {
        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set("Campaigns".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        Ok(user.insert(db).await?)
    }

    fn request(list_id: Uuid) -> CreateCampaignRequest {
        CreateCampaignRequest {
            name: "Spring outreach".to_string(),
            list_id,
            campaign_type: CampaignType::Email,
            target_count: Some(50),
            ai_config: None,
            template_config: None,
            schedule_config: None,
            rate_limit_config: None,
        }
    }

    #[tokio::test]
    async fn creation_applies_rate_limit_defaults() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref(), "limits@example.com").await?;
        let list = ListService::new(test_db.db.clone())
            .create_list_with_companies(user.id, "Targets", None, vec![])
            .await?;

        let service = CampaignService::new(test_db.db.clone(), Telemetry::disabled());
        let campaign = service.create_campaign(user.id, request(list.id)).await?;

        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(
            campaign.rate_limit_config,
            Some(serde_json::json!({ "per_hour": 10, "per_day": 100 }))
        );

        Ok(())
    }

    #[tokio::test]
    async fn campaigns_cannot_target_another_users_list() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let owner = seed_user(test_db.db.as_ref(), "owner@example.com").await?;
        let intruder = seed_user(test_db.db.as_ref(), "intruder@example.com").await?;
        let list = ListService::new(test_db.db.clone())
            .create_list_with_companies(owner.id, "Private", None, vec![])
            .await?;

        let service = CampaignService::new(test_db.db.clone(), Telemetry::disabled());
        let err = service
            .create_campaign(intruder.id, request(list.id))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::ListOwnershipViolation));

        Ok(())
    }

    #[tokio::test]
    async fn lifecycle_transitions_are_validated() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref(), "lifecycle@example.com").await?;
        let list = ListService::new(test_db.db.clone())
            .create_list_with_companies(user.id, "Lifecycle", None, vec![])
            .await?;

        let service = CampaignService::new(test_db.db.clone(), Telemetry::disabled());
        let campaign = service.create_campaign(user.id, request(list.id)).await?;

        // A draft cannot jump straight to completed
        let err = service.complete(campaign.id).await.unwrap_err();
        assert!(matches!(
            err,
            CampaignError::InvalidCampaignTransition {
                from: CampaignStatus::Draft,
                to: CampaignStatus::Completed,
            }
        ));

        let started = service.start(campaign.id).await?;
        assert_eq!(started.status, CampaignStatus::Active);
        assert!(started.started_at.is_some());

        let paused = service.pause(campaign.id).await?;
        assert_eq!(paused.status, CampaignStatus::Paused);

        let resumed = service.start(campaign.id).await?;
        assert_eq!(resumed.status, CampaignStatus::Active);

        let completed = service.complete(campaign.id).await?;
        assert_eq!(completed.status, CampaignStatus::Completed);
        assert!(completed.completed_at.is_some());

        // Terminal states accept nothing further
        let err = service.start(campaign.id).await.unwrap_err();
        assert!(matches!(
            err,
            CampaignError::InvalidCampaignTransition { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn success_counter_increments() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref(), "counter@example.com").await?;
        let list = ListService::new(test_db.db.clone())
            .create_list_with_companies(user.id, "Counter", None, vec![])
            .await?;

        let service = CampaignService::new(test_db.db.clone(), Telemetry::disabled());
        let campaign = service.create_campaign(user.id, request(list.id)).await?;

        service.increment_success(campaign.id).await?;
        service.increment_success(campaign.id).await?;

        let campaign = service.get_campaign(campaign.id).await?;
        assert_eq!(campaign.success_count, 2);

        Ok(())
    }
}
