use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};

use reachout_core::UtcDateTime;
use reachout_entities::types::SubscriptionStatus;

use super::subscription::SubscriptionService;
use super::types::BillingError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload before it is rejected as replayed.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Inbound webhook body. The provider sends more fields than we read;
/// only the customer/status pair drives a state change.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub object: Option<WebhookObject>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// HMAC-SHA256 verification of the provider's `t=<ts>,v1=<sig>` header.
/// The signed message is `<ts>.<raw body>`; any matching `v1` candidate
/// within the replay window passes.
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), BillingError> {
        self.verify_at(payload, header, Utc::now())
    }

    pub fn verify_at(
        &self,
        payload: &[u8],
        header: &str,
        now: UtcDateTime,
    ) -> Result<(), BillingError> {
        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<Vec<u8>> = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = value.parse().ok();
                }
                Some(("v1", value)) => {
                    if let Ok(decoded) = hex::decode(value) {
                        candidates.push(decoded);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            BillingError::InvalidSignature("header is missing a timestamp".to_string())
        })?;
        if candidates.is_empty() {
            return Err(BillingError::InvalidSignature(
                "header carries no v1 signature".to_string(),
            ));
        }

        let age = (now.timestamp() - timestamp).abs();
        if age > SIGNATURE_TOLERANCE_SECS {
            return Err(BillingError::InvalidSignature(format!(
                "timestamp outside tolerance ({age}s old)"
            )));
        }

        for candidate in &candidates {
            let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
                .map_err(|e| BillingError::InvalidSignature(e.to_string()))?;
            mac.update(timestamp.to_string().as_bytes());
            mac.update(b".");
            mac.update(payload);
            if mac.verify_slice(candidate).is_ok() {
                return Ok(());
            }
        }

        Err(BillingError::InvalidSignature(
            "no signature candidate matched".to_string(),
        ))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Subscription rows were overwritten with the payload status
    Updated { rows: u64 },
    /// Payload carried no customer/status pair; nothing to apply
    Ignored,
}

/// Applies verified billing webhooks to the subscriptions table.
pub struct WebhookProcessor {
    verifier: SignatureVerifier,
    subscriptions: Arc<SubscriptionService>,
}

impl WebhookProcessor {
    pub fn new(verifier: SignatureVerifier, subscriptions: Arc<SubscriptionService>) -> Self {
        Self {
            verifier,
            subscriptions,
        }
    }

    /// Verify, parse and apply one webhook delivery. The signature is
    /// checked before the body is even parsed; unknown status strings
    /// are rejected without touching the store.
    pub async fn process(
        &self,
        body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, BillingError> {
        self.verifier.verify(body, signature_header)?;
        self.apply(body).await
    }

    async fn apply(&self, body: &[u8]) -> Result<WebhookOutcome, BillingError> {
        let payload: WebhookPayload = serde_json::from_slice(body)?;

        let object = payload.data.and_then(|d| d.object);
        let (customer, status) = match object {
            Some(WebhookObject {
                customer: Some(customer),
                status: Some(status),
            }) => (customer, status),
            _ => {
                info!(event_type = ?payload.event_type, "webhook without customer/status ignored");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let status = SubscriptionStatus::from_str(&status)
            .ok_or_else(|| BillingError::UnknownStatus(status.clone()))?;

        let rows = self
            .subscriptions
            .update_subscription_status(&customer, status)
            .await?;
        if rows == 0 {
            warn!(%customer, "webhook for unknown customer");
        }

        Ok(WebhookOutcome::Updated { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={sig}")
    }

    #[test]
    fn valid_signature_passes() {
        let secret = "whsec_test";
        let body = br#"{"data":{"object":{"customer":"cus_1","status":"active"}}}"#;
        let now = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
        let header = sign(secret, now.timestamp(), body);

        let verifier = SignatureVerifier::new(secret);
        assert!(verifier.verify_at(body, &header, now).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"{}";
        let now = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
        let header = sign("whsec_other", now.timestamp(), body);

        let verifier = SignatureVerifier::new("whsec_test");
        let err = verifier.verify_at(body, &header, now).unwrap_err();
        assert!(matches!(err, BillingError::InvalidSignature(_)));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let secret = "whsec_test";
        let now = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
        let header = sign(secret, now.timestamp(), b"original");

        let verifier = SignatureVerifier::new(secret);
        let err = verifier.verify_at(b"tampered", &header, now).unwrap_err();
        assert!(matches!(err, BillingError::InvalidSignature(_)));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let secret = "whsec_test";
        let body = b"{}";
        let signed_at = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
        let header = sign(secret, signed_at.timestamp(), body);

        let verifier = SignatureVerifier::new(secret);
        let later = signed_at + chrono::Duration::seconds(SIGNATURE_TOLERANCE_SECS + 1);
        let err = verifier.verify_at(body, &header, later).unwrap_err();
        assert!(matches!(err, BillingError::InvalidSignature(_)));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let verifier = SignatureVerifier::new("whsec_test");
        let err = verifier
            .verify_at(b"{}", "not-a-signature", Utc::now())
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidSignature(_)));
    }

    #[test]
    fn payload_parsing_tolerates_missing_fields() {
        let payload: WebhookPayload =
            serde_json::from_str(r#"{"type":"invoice.paid"}"#).unwrap();
        assert!(payload.data.is_none());

        let payload: WebhookPayload = serde_json::from_str(
            r#"{"data":{"object":{"customer":"cus_1","status":"past_due"}}}"#,
        )
        .unwrap();
        let object = payload.data.unwrap().object.unwrap();
        assert_eq!(object.customer.as_deref(), Some("cus_1"));
        assert_eq!(object.status.as_deref(), Some("past_due"));
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::services::subscription::CreateSubscriptionRequest;
    use reachout_database::test_utils::TestDatabase;
    use reachout_entities::types::UserStatus;
    use reachout_entities::users;
    use sea_orm::{ActiveModelTrait, ActiveValue::Set};
    use uuid::Uuid;

    fn signed(secret: &str, body: &[u8]) -> String {
        let timestamp = Utc::now().timestamp();
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={sig}")
    }

    async fn seed_subscription(
        db: &Arc<reachout_database::DbConnection>,
        customer: &str,
    ) -> anyhow::Result<()> {
        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set(format!("{customer}@example.com")),
            name: Set("Webhook".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        let user = user.insert(db.as_ref()).await?;

        SubscriptionService::new(db.clone())
            .create_subscription(CreateSubscriptionRequest {
                user_id: user.id,
                stripe_customer_id: customer.to_string(),
                stripe_subscription_id: Some(format!("sub_{customer}")),
                plan_id: "pro".to_string(),
                status: SubscriptionStatus::Active,
                current_period_start: None,
                current_period_end: None,
                trial_end: None,
            })
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn verified_webhook_overwrites_status() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        seed_subscription(&test_db.db, "cus_hook").await?;

        let secret = "whsec_test";
        let processor = WebhookProcessor::new(
            SignatureVerifier::new(secret),
            Arc::new(SubscriptionService::new(test_db.db.clone())),
        );

        let body = br#"{"data":{"object":{"customer":"cus_hook","status":"canceled"}}}"#;
        let outcome = processor.process(body, &signed(secret, body)).await?;
        assert_eq!(outcome, WebhookOutcome::Updated { rows: 1 });

        let subscription = SubscriptionService::new(test_db.db.clone())
            .find_subscription_by_customer("cus_hook")
            .await?;
        assert_eq!(subscription.status, SubscriptionStatus::Canceled);

        Ok(())
    }

    #[tokio::test]
    async fn unsigned_webhook_changes_nothing() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        seed_subscription(&test_db.db, "cus_unsigned").await?;

        let processor = WebhookProcessor::new(
            SignatureVerifier::new("whsec_test"),
            Arc::new(SubscriptionService::new(test_db.db.clone())),
        );

        let body = br#"{"data":{"object":{"customer":"cus_unsigned","status":"canceled"}}}"#;
        let err = processor.process(body, "t=0,v1=deadbeef").await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidSignature(_)));

        let subscription = SubscriptionService::new(test_db.db.clone())
            .find_subscription_by_customer("cus_unsigned")
            .await?;
        assert_eq!(subscription.status, SubscriptionStatus::Active);

        Ok(())
    }

    #[tokio::test]
    async fn out_of_set_status_is_rejected() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        seed_subscription(&test_db.db, "cus_badstatus").await?;

        let secret = "whsec_test";
        let processor = WebhookProcessor::new(
            SignatureVerifier::new(secret),
            Arc::new(SubscriptionService::new(test_db.db.clone())),
        );

        let body = br#"{"data":{"object":{"customer":"cus_badstatus","status":"pending"}}}"#;
        let err = processor.process(body, &signed(secret, body)).await.unwrap_err();
        assert!(matches!(err, BillingError::UnknownStatus(_)));

        let subscription = SubscriptionService::new(test_db.db.clone())
            .find_subscription_by_customer("cus_badstatus")
            .await?;
        assert_eq!(subscription.status, SubscriptionStatus::Active);

        Ok(())
    }

    #[tokio::test]
    async fn payload_without_customer_is_ignored() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;

        let secret = "whsec_test";
        let processor = WebhookProcessor::new(
            SignatureVerifier::new(secret),
            Arc::new(SubscriptionService::new(test_db.db.clone())),
        );

        let body = br#"{"type":"invoice.created","data":{"object":{}}}"#;
        let outcome = processor.process(body, &signed(secret, body)).await?;
        assert_eq!(outcome, WebhookOutcome::Ignored);

        Ok(())
    }
}
