//! Database connection and query utilities

pub use sea_orm;
mod connection;

pub use connection::{establish_connection, DbConnection};

// Export test utilities for use by other crates in their tests
pub mod test_utils;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ConnectionTrait;
    use test_utils::TestDatabase;

    #[tokio::test]
    async fn test_establish_connection_with_migrations() -> anyhow::Result<()> {
        let test_db = TestDatabase::new().await?;

        // establish_connection runs migrations on a fresh database
        let db = establish_connection(&test_db.database_url).await?;

        let result = sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT COUNT(*) FROM users".to_owned(),
        );
        let query_result = db.query_one(result).await?;
        assert!(query_result.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_database_probe() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        test_db.test_connection().await?;
        Ok(())
    }
}
