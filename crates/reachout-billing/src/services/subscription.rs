use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter,
};
use tracing::info;
use uuid::Uuid;

use reachout_core::UtcDateTime;
use reachout_database::DbConnection;
use reachout_entities::subscriptions;
use reachout_entities::types::SubscriptionStatus;

use super::types::BillingError;

#[derive(Debug, Clone)]
pub struct CreateSubscriptionRequest {
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: Option<String>,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<UtcDateTime>,
    pub current_period_end: Option<UtcDateTime>,
    pub trial_end: Option<UtcDateTime>,
}

/// Subscription rows mirroring the payment provider's state.
pub struct SubscriptionService {
    db: Arc<DbConnection>,
}

impl SubscriptionService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    pub async fn find_subscription_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<subscriptions::Model, BillingError> {
        subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or(BillingError::SubscriptionNotFound)
    }

    pub async fn find_subscription_by_customer(
        &self,
        stripe_customer_id: &str,
    ) -> Result<subscriptions::Model, BillingError> {
        subscriptions::Entity::find()
            .filter(subscriptions::Column::StripeCustomerId.eq(stripe_customer_id))
            .one(self.db.as_ref())
            .await?
            .ok_or(BillingError::SubscriptionNotFound)
    }

    pub async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<subscriptions::Model, BillingError> {
        let subscription = subscriptions::ActiveModel {
            user_id: Set(request.user_id),
            stripe_customer_id: Set(request.stripe_customer_id),
            stripe_subscription_id: Set(request.stripe_subscription_id),
            plan_id: Set(request.plan_id),
            status: Set(request.status),
            current_period_start: Set(request.current_period_start),
            current_period_end: Set(request.current_period_end),
            cancel_at_period_end: Set(false),
            trial_end: Set(request.trial_end),
            ..Default::default()
        };
        Ok(subscription.insert(self.db.as_ref()).await?)
    }

    /// Overwrite the status of every subscription row for a provider
    /// customer, stamping `updated_at`. Applying the same status twice
    /// leaves state unchanged; the affected-row count is returned either
    /// way.
    pub async fn update_subscription_status(
        &self,
        stripe_customer_id: &str,
        status: SubscriptionStatus,
    ) -> Result<u64, BillingError> {
        let result = subscriptions::Entity::update_many()
            .col_expr(subscriptions::Column::Status, Expr::value(status.as_str()))
            .col_expr(subscriptions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(subscriptions::Column::StripeCustomerId.eq(stripe_customer_id))
            .exec(self.db.as_ref())
            .await?;

        info!(
            customer = %stripe_customer_id,
            status = %status,
            rows = result.rows_affected,
            "subscription status updated"
        );

        Ok(result.rows_affected)
    }

    pub async fn set_cancel_at_period_end(
        &self,
        user_id: Uuid,
        cancel: bool,
    ) -> Result<subscriptions::Model, BillingError> {
        let subscription = self.find_subscription_by_user(user_id).await?;
        let mut active: subscriptions::ActiveModel = subscription.into();
        active.cancel_at_period_end = Set(cancel);
        Ok(active.update(self.db.as_ref()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachout_database::test_utils::TestDatabase;
    use reachout_entities::types::UserStatus;
    use reachout_entities::users;
    use sea_orm::PaginatorTrait;

    async fn seed_user(db: &DbConnection, email: &str) -> anyhow::Result<users::Model> {
        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set("Billing".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        Ok(user.insert(db).await?)
    }

    #[tokio::test]
    async fn missing_subscription_reports_not_found() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let billing = SubscriptionService::new(test_db.db.clone());

        let err = billing
            .find_subscription_by_user(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::SubscriptionNotFound));

        Ok(())
    }

    #[tokio::test]
    async fn status_update_is_idempotent() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref(), "idempotent@example.com").await?;
        let billing = SubscriptionService::new(test_db.db.clone());

        billing
            .create_subscription(CreateSubscriptionRequest {
                user_id: user.id,
                stripe_customer_id: "cus_123".to_string(),
                stripe_subscription_id: Some("sub_123".to_string()),
                plan_id: "pro".to_string(),
                status: SubscriptionStatus::Active,
                current_period_start: None,
                current_period_end: None,
                trial_end: None,
            })
            .await?;

        let first = billing
            .update_subscription_status("cus_123", SubscriptionStatus::Canceled)
            .await?;
        let second = billing
            .update_subscription_status("cus_123", SubscriptionStatus::Canceled)
            .await?;
        assert_eq!(first, 1);
        assert_eq!(second, 1);

        // Exactly one row, carrying the canceled status
        assert_eq!(
            subscriptions::Entity::find()
                .count(test_db.db.as_ref())
                .await?,
            1
        );
        let subscription = billing.find_subscription_by_customer("cus_123").await?;
        assert_eq!(subscription.status, SubscriptionStatus::Canceled);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_customer_updates_zero_rows() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let billing = SubscriptionService::new(test_db.db.clone());

        let rows = billing
            .update_subscription_status("cus_missing", SubscriptionStatus::PastDue)
            .await?;
        assert_eq!(rows, 0);

        Ok(())
    }
}
