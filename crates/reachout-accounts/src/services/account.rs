use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter,
};
use tracing::info;
use uuid::Uuid;

use reachout_database::DbConnection;
use reachout_entities::types::UserStatus;
use reachout_entities::users;
use reachout_telemetry::Telemetry;

use super::types::{AccountError, AuthIdentity};

/// Account lookup and provisioning. The auth provider owns credentials;
/// this service only maps a trusted identity to a users row.
pub struct AccountService {
    db: Arc<DbConnection>,
    telemetry: Telemetry,
}

impl AccountService {
    pub fn new(db: Arc<DbConnection>, telemetry: Telemetry) -> Self {
        Self { db, telemetry }
    }

    /// Look up an account by email. Soft-deleted accounts do not match.
    pub async fn find_user_by_email(&self, email: &str) -> Result<users::Model, AccountError> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<users::Model, AccountError> {
        users::Entity::find_by_id(user_id)
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    /// Return the account for an auth-provider identity, creating it on
    /// first sign-in.
    pub async fn get_or_provision(
        &self,
        identity: AuthIdentity,
    ) -> Result<users::Model, AccountError> {
        if identity.email.is_empty() {
            return Err(AccountError::InvalidInput(
                "identity is missing an email address".to_string(),
            ));
        }

        let existing = users::Entity::find()
            .filter(users::Column::AuthProviderId.eq(identity.provider_id))
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?;

        if let Some(user) = existing {
            return Ok(user);
        }

        let user = users::ActiveModel {
            auth_provider_id: Set(identity.provider_id),
            email: Set(identity.email),
            name: Set(identity.name),
            avatar_url: Set(identity.avatar_url),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        let user = user.insert(self.db.as_ref()).await?;

        info!(user_id = %user.id, "provisioned account");
        self.telemetry.identify(
            user.id,
            serde_json::json!({ "email": user.email, "name": user.name }),
        );

        Ok(user)
    }

    pub async fn set_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
    ) -> Result<users::Model, AccountError> {
        let user = self.find_user_by_id(user_id).await?;
        let mut active: users::ActiveModel = user.into();
        active.status = Set(status);
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Mark an account deleted without removing its rows. The account no
    /// longer resolves through lookups but stays for audit.
    pub async fn soft_delete_user(&self, user_id: Uuid) -> Result<users::Model, AccountError> {
        let user = self.find_user_by_id(user_id).await?;
        let mut active: users::ActiveModel = user.into();
        active.status = Set(UserStatus::Inactive);
        active.deleted_at = Set(Some(Utc::now()));
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Remove the account row entirely. Owned entities go with it via
    /// the schema's cascade rules.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AccountError> {
        let result = users::Entity::delete_by_id(user_id)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(AccountError::UserNotFound);
        }
        info!(%user_id, "deleted account and owned data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachout_database::test_utils::TestDatabase;

    fn service(db: Arc<DbConnection>) -> AccountService {
        AccountService::new(db, Telemetry::disabled())
    }

    #[tokio::test]
    async fn lookup_by_email_reports_not_found() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let accounts = service(test_db.db.clone());

        let err = accounts
            .find_user_by_email("nobody@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::UserNotFound));

        Ok(())
    }

    #[tokio::test]
    async fn provisioning_is_idempotent_per_identity() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let accounts = service(test_db.db.clone());

        let identity = AuthIdentity {
            provider_id: Uuid::new_v4(),
            email: "taro@example.com".to_string(),
            name: "Taro".to_string(),
            avatar_url: None,
        };

        let first = accounts.get_or_provision(identity.clone()).await?;
        let second = accounts.get_or_provision(identity).await?;
        assert_eq!(first.id, second.id);

        let found = accounts.find_user_by_email("taro@example.com").await?;
        assert_eq!(found.id, first.id);
        assert_eq!(found.timezone, "Asia/Tokyo");

        Ok(())
    }

    #[tokio::test]
    async fn soft_deleted_accounts_do_not_resolve() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let accounts = service(test_db.db.clone());

        let user = accounts
            .get_or_provision(AuthIdentity {
                provider_id: Uuid::new_v4(),
                email: "gone@example.com".to_string(),
                name: "Gone".to_string(),
                avatar_url: None,
            })
            .await?;

        accounts.soft_delete_user(user.id).await?;

        let err = accounts
            .find_user_by_email("gone@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::UserNotFound));

        // The row itself is retained for audit
        let raw = users::Entity::find_by_id(user.id)
            .one(test_db.db.as_ref())
            .await?;
        assert!(raw.is_some());

        Ok(())
    }
}
