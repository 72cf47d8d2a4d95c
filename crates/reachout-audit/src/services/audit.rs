use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;
use uuid::Uuid;

use reachout_core::UtcDateTime;
use reachout_database::DbConnection;
use reachout_entities::audit_logs;

/// One mutating action to record. `old_values`/`new_values` carry the
/// before/after snapshots the dashboard diff view renders.
#[derive(Debug, Clone)]
pub struct RecordAudit {
    pub user_id: Option<Uuid>,
    pub table_name: String,
    pub record_id: Uuid,
    pub action: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Append-only audit trail. There are deliberately no update or delete
/// methods here.
pub struct AuditService {
    db: Arc<DbConnection>,
}

impl AuditService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    pub async fn record(&self, entry: RecordAudit) -> anyhow::Result<audit_logs::Model> {
        let log = audit_logs::ActiveModel {
            user_id: Set(entry.user_id),
            table_name: Set(entry.table_name),
            record_id: Set(entry.record_id),
            action: Set(entry.action),
            old_values: Set(entry.old_values),
            new_values: Set(entry.new_values),
            ip_address: Set(entry.ip_address),
            user_agent: Set(entry.user_agent),
            ..Default::default()
        };

        log.insert(self.db.as_ref())
            .await
            .context("Failed to create audit log")
    }

    pub async fn logs_for_user(
        &self,
        user_id: Uuid,
        limit: Option<u64>,
    ) -> anyhow::Result<Vec<audit_logs::Model>> {
        let mut query = audit_logs::Entity::find()
            .filter(audit_logs::Column::UserId.eq(user_id))
            .order_by_desc(audit_logs::Column::CreatedAt);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        Ok(query.all(self.db.as_ref()).await?)
    }

    pub async fn logs_for_record(
        &self,
        table_name: &str,
        record_id: Uuid,
    ) -> anyhow::Result<Vec<audit_logs::Model>> {
        Ok(audit_logs::Entity::find()
            .filter(audit_logs::Column::TableName.eq(table_name))
            .filter(audit_logs::Column::RecordId.eq(record_id))
            .order_by_desc(audit_logs::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn filter_logs(
        &self,
        action: Option<&str>,
        user_id: Option<Uuid>,
        from: Option<UtcDateTime>,
        to: Option<UtcDateTime>,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Vec<audit_logs::Model>> {
        let mut query = audit_logs::Entity::find();

        if let Some(action) = action {
            query = query.filter(audit_logs::Column::Action.contains(action));
        }
        if let Some(user_id) = user_id {
            query = query.filter(audit_logs::Column::UserId.eq(user_id));
        }
        if let Some(from) = from {
            query = query.filter(audit_logs::Column::CreatedAt.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(audit_logs::Column::CreatedAt.lte(to));
        }

        query
            .order_by_desc(audit_logs::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .context("Failed to load filtered audit logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachout_database::test_utils::TestDatabase;
    use reachout_entities::types::UserStatus;
    use reachout_entities::users;

    #[tokio::test]
    async fn records_are_queryable_by_user_and_record() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;

        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set("audit@example.com".to_string()),
            name: Set("Audit".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        let user = user.insert(test_db.db.as_ref()).await?;

        let service = AuditService::new(test_db.db.clone());
        let record_id = Uuid::new_v4();

        service
            .record(RecordAudit {
                user_id: Some(user.id),
                table_name: "companies".to_string(),
                record_id,
                action: "update".to_string(),
                old_values: Some(serde_json::json!({ "status": "active" })),
                new_values: Some(serde_json::json!({ "status": "blacklist" })),
                ip_address: Some("203.0.113.10".to_string()),
                user_agent: Some("Mozilla/5.0".to_string()),
            })
            .await?;

        let by_user = service.logs_for_user(user.id, Some(10)).await?;
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].action, "update");

        let by_record = service.logs_for_record("companies", record_id).await?;
        assert_eq!(by_record.len(), 1);

        let filtered = service
            .filter_logs(Some("upd"), Some(user.id), None, None, 50, 0)
            .await?;
        assert_eq!(filtered.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn anonymous_actions_are_recorded_without_a_user() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let service = AuditService::new(test_db.db.clone());

        let log = service
            .record(RecordAudit {
                user_id: None,
                table_name: "subscriptions".to_string(),
                record_id: Uuid::new_v4(),
                action: "webhook_update".to_string(),
                old_values: None,
                new_values: Some(serde_json::json!({ "status": "canceled" })),
                ip_address: None,
                user_agent: None,
            })
            .await?;
        assert!(log.user_id.is_none());

        Ok(())
    }
}
