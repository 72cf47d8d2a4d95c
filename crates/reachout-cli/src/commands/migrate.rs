use clap::Args;
use sea_orm::Database;
use tracing::info;

use reachout_migrations::{Migrator, MigratorTrait};

#[derive(Args)]
pub struct MigrateCommand {
    /// Database connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

impl MigrateCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        let db = Database::connect(&self.database_url).await?;

        let pending = Migrator::get_pending_migrations(&db).await?;
        if pending.is_empty() {
            info!("database is up to date");
            return Ok(());
        }

        info!(count = pending.len(), "applying pending migrations");
        Migrator::up(&db, None).await?;
        info!("migrations complete");

        Ok(())
    }
}
