use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;

use reachout_database::DbConnection;
use reachout_entities::system_logs;
use reachout_entities::types::LogLevel;

/// Append-only operational event log.
pub struct SystemLogService {
    db: Arc<DbConnection>,
}

impl SystemLogService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    pub async fn log(
        &self,
        level: LogLevel,
        message: &str,
        module: Option<&str>,
        context: Option<serde_json::Value>,
        trace_id: Option<&str>,
    ) -> anyhow::Result<system_logs::Model> {
        let entry = system_logs::ActiveModel {
            level: Set(level),
            message: Set(message.to_string()),
            module: Set(module.map(str::to_string)),
            context: Set(context),
            trace_id: Set(trace_id.map(str::to_string)),
            ..Default::default()
        };

        entry
            .insert(self.db.as_ref())
            .await
            .context("Failed to write system log")
    }

    pub async fn recent(&self, limit: u64) -> anyhow::Result<Vec<system_logs::Model>> {
        Ok(system_logs::Entity::find()
            .order_by_desc(system_logs::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn by_level(
        &self,
        level: LogLevel,
        limit: u64,
    ) -> anyhow::Result<Vec<system_logs::Model>> {
        Ok(system_logs::Entity::find()
            .filter(system_logs::Column::Level.eq(level.as_str()))
            .order_by_desc(system_logs::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachout_database::test_utils::TestDatabase;

    #[tokio::test]
    async fn logs_filter_by_level() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let service = SystemLogService::new(test_db.db.clone());

        service
            .log(LogLevel::Info, "campaign scheduler tick", Some("campaigns"), None, None)
            .await?;
        service
            .log(
                LogLevel::Error,
                "ai provider timeout",
                Some("ai"),
                Some(serde_json::json!({ "elapsed_ms": 30000 })),
                Some("trace-1"),
            )
            .await?;

        let errors = service.by_level(LogLevel::Error, 10).await?;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "ai provider timeout");
        assert_eq!(errors[0].trace_id.as_deref(), Some("trace-1"));

        let recent = service.recent(10).await?;
        assert_eq!(recent.len(), 2);

        Ok(())
    }
}
