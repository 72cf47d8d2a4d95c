use clap::Args;
use sea_orm::{ConnectionTrait, Database, Statement};
use tracing::info;

#[derive(Args)]
pub struct CheckCommand {
    /// Database connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

impl CheckCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        let db = Database::connect(&self.database_url).await?;

        let result = db
            .query_one(Statement::from_string(
                db.get_database_backend(),
                "SELECT 1".to_owned(),
            ))
            .await?;
        anyhow::ensure!(result.is_some(), "probe query returned no row");

        info!("database connection ok");
        Ok(())
    }
}
