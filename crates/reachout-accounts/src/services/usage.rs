use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use reachout_core::UtcDateTime;
use reachout_database::DbConnection;
use reachout_entities::usage_metrics;

use super::types::{AccountError, QuotaStatus};

/// Per-user usage counters backing quota enforcement (e.g. daily email
/// sends). One row per (user, metric type, period start), guaranteed by
/// the schema's unique index.
pub struct UsageService {
    db: Arc<DbConnection>,
}

impl UsageService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    /// Add `amount` to the counter for the given period, creating the
    /// row on first use. A concurrent first-use insert loses the race as
    /// a unique violation and is retried as an increment.
    pub async fn record_usage(
        &self,
        user_id: Uuid,
        metric_type: &str,
        period_start: UtcDateTime,
        period_end: UtcDateTime,
        amount: i32,
    ) -> Result<(), AccountError> {
        if amount < 0 {
            return Err(AccountError::InvalidInput(
                "usage amount cannot be negative".to_string(),
            ));
        }

        if self
            .increment_existing(user_id, metric_type, period_start, amount)
            .await?
        {
            return Ok(());
        }

        let metric = usage_metrics::ActiveModel {
            user_id: Set(user_id),
            metric_type: Set(metric_type.to_string()),
            metric_value: Set(amount),
            period_start: Set(period_start),
            period_end: Set(period_end),
            ..Default::default()
        };

        match metric.insert(self.db.as_ref()).await {
            Ok(_) => Ok(()),
            // Lost the first-insert race; the row exists now
            Err(err)
                if matches!(
                    err.sql_err(),
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                ) =>
            {
                self.increment_existing(user_id, metric_type, period_start, amount)
                    .await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn increment_existing(
        &self,
        user_id: Uuid,
        metric_type: &str,
        period_start: UtcDateTime,
        amount: i32,
    ) -> Result<bool, AccountError> {
        let updated = usage_metrics::Entity::update_many()
            .col_expr(
                usage_metrics::Column::MetricValue,
                Expr::col(usage_metrics::Column::MetricValue).add(amount),
            )
            .filter(usage_metrics::Column::UserId.eq(user_id))
            .filter(usage_metrics::Column::MetricType.eq(metric_type))
            .filter(usage_metrics::Column::PeriodStart.eq(period_start))
            .exec(self.db.as_ref())
            .await?;

        Ok(updated.rows_affected > 0)
    }

    pub async fn get_usage(
        &self,
        user_id: Uuid,
        metric_type: &str,
        period_start: UtcDateTime,
    ) -> Result<Option<usage_metrics::Model>, AccountError> {
        Ok(usage_metrics::Entity::find()
            .filter(usage_metrics::Column::UserId.eq(user_id))
            .filter(usage_metrics::Column::MetricType.eq(metric_type))
            .filter(usage_metrics::Column::PeriodStart.eq(period_start))
            .one(self.db.as_ref())
            .await?)
    }

    /// Compare the current counter against a plan limit.
    pub async fn check_quota(
        &self,
        user_id: Uuid,
        metric_type: &str,
        period_start: UtcDateTime,
        limit: i32,
    ) -> Result<QuotaStatus, AccountError> {
        let used = self
            .get_usage(user_id, metric_type, period_start)
            .await?
            .map(|m| m.metric_value)
            .unwrap_or(0);

        Ok(QuotaStatus {
            used,
            limit,
            exceeded: used >= limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachout_database::test_utils::TestDatabase;
    use reachout_entities::types::UserStatus;
    use reachout_entities::users;
    use sea_orm::PaginatorTrait;

    async fn seed_user(db: &DbConnection) -> anyhow::Result<users::Model> {
        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set("usage@example.com".to_string()),
            name: Set("Usage".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        Ok(user.insert(db).await?)
    }

    #[tokio::test]
    async fn usage_accumulates_in_a_single_row() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let usage = UsageService::new(test_db.db.clone());

        let period_start = chrono::Utc::now();
        let period_end = period_start + chrono::Duration::days(1);

        usage
            .record_usage(user.id, "email_sends", period_start, period_end, 3)
            .await?;
        usage
            .record_usage(user.id, "email_sends", period_start, period_end, 2)
            .await?;

        let row = usage
            .get_usage(user.id, "email_sends", period_start)
            .await?
            .expect("counter row");
        assert_eq!(row.metric_value, 5);

        assert_eq!(
            usage_metrics::Entity::find()
                .count(test_db.db.as_ref())
                .await?,
            1
        );

        Ok(())
    }

    #[tokio::test]
    async fn quota_check_reports_exceeded_at_limit() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let usage = UsageService::new(test_db.db.clone());

        let period_start = chrono::Utc::now();
        let period_end = period_start + chrono::Duration::days(1);

        let quota = usage
            .check_quota(user.id, "email_sends", period_start, 100)
            .await?;
        assert_eq!(quota.used, 0);
        assert!(!quota.exceeded);

        usage
            .record_usage(user.id, "email_sends", period_start, period_end, 100)
            .await?;

        let quota = usage
            .check_quota(user.id, "email_sends", period_start, 100)
            .await?;
        assert_eq!(quota.used, 100);
        assert!(quota.exceeded);

        Ok(())
    }

    #[tokio::test]
    async fn negative_amounts_are_rejected() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;
        let usage = UsageService::new(test_db.db.clone());

        let now = chrono::Utc::now();
        let err = usage
            .record_usage(user.id, "email_sends", now, now, -1)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidInput(_)));

        Ok(())
    }
}
