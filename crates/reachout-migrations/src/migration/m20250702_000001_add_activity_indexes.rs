use sea_orm_migration::prelude::*;

/// Indexes for the send scheduler and engagement tracking queries.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sales_activities_status_scheduled")
                    .table(Alias::new("sales_activities"))
                    .col(Alias::new("status"))
                    .col(Alias::new("scheduled_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_email_activities_opened_at")
                    .table(Alias::new("email_activities"))
                    .col(Alias::new("opened_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_companies_last_contacted")
                    .table(Alias::new("companies"))
                    .col(Alias::new("last_contacted_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_usage_metrics_user_metric")
                    .table(Alias::new("usage_metrics"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("metric_type"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_usage_metrics_user_metric")
                    .table(Alias::new("usage_metrics"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_companies_last_contacted")
                    .table(Alias::new("companies"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_email_activities_opened_at")
                    .table(Alias::new("email_activities"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_sales_activities_status_scheduled")
                    .table(Alias::new("sales_activities"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
