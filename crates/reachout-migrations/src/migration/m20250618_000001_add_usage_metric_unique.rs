use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // At most one usage row per (user, metric type, period start);
        // quota enforcement relies on this.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("usage_metrics_user_metric_period_unique")
                    .table(Alias::new("usage_metrics"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("metric_type"))
                    .col(Alias::new("period_start"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("usage_metrics_user_metric_period_unique")
                    .table(Alias::new("usage_metrics"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
