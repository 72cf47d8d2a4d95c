pub use sea_orm_migration::prelude::*;

mod m20250601_000001_initial_schema;
mod m20250618_000001_add_usage_metric_unique;
mod m20250702_000001_add_activity_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_initial_schema::Migration),
            Box::new(m20250618_000001_add_usage_metric_unique::Migration),
            Box::new(m20250702_000001_add_activity_indexes::Migration),
        ]
    }
}
