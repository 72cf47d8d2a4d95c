use serde::Deserialize;
use tracing::debug;

use reachout_core::BillingConfig;

use super::types::BillingError;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PortalSessionResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    items: SubscriptionItems,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    plan: Plan,
}

#[derive(Debug, Deserialize)]
struct Plan {
    product: String,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Thin client over the payment provider's hosted API. Only the calls
/// the dashboard needs: customer creation, the billing portal, and plan
/// name resolution. Everything else stays on the provider's side.
pub struct StripeClient {
    http_client: reqwest::Client,
    secret_key: String,
    base_url: String,
    public_url: String,
}

impl StripeClient {
    pub fn new(config: &BillingConfig) -> Result<Self, BillingError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Reachout/0.1")
            .build()
            .map_err(|e| BillingError::Provider {
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            secret_key: config.secret_key.clone(),
            base_url: STRIPE_API_BASE.to_string(),
            public_url: config.public_url.clone(),
        })
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, BillingError> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, BillingError> {
        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BillingError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Err(BillingError::Provider { message })
    }

    /// Create a provider customer for a freshly provisioned account and
    /// return its id.
    pub async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        auth_provider_id: &str,
    ) -> Result<String, BillingError> {
        let name = name.unwrap_or("");
        let response = self
            .post_form(
                "/customers",
                &[
                    ("email", email),
                    ("name", name),
                    ("metadata[auth_provider_id]", auth_provider_id),
                ],
            )
            .await?;

        let customer: CustomerResponse = response.json().await?;
        debug!(customer = %customer.id, "created provider customer");
        Ok(customer.id)
    }

    /// Create a billing portal session and return the hosted URL the
    /// dashboard redirects to.
    pub async fn billing_portal_url(&self, customer_id: &str) -> Result<String, BillingError> {
        let return_url = format!("{}/dashboard", self.public_url);
        let response = self
            .post_form(
                "/billing_portal/sessions",
                &[("customer", customer_id), ("return_url", &return_url)],
            )
            .await?;

        let session: PortalSessionResponse = response.json().await?;
        Ok(session.url)
    }

    /// Resolve the product name behind a provider subscription. Two
    /// round-trips: subscription -> product id -> product.
    pub async fn plan_name(&self, stripe_subscription_id: &str) -> Result<String, BillingError> {
        let response = self
            .get(&format!("/subscriptions/{stripe_subscription_id}"))
            .await?;
        let subscription: SubscriptionResponse = response.json().await?;

        let product_id = subscription
            .items
            .data
            .first()
            .map(|item| item.plan.product.clone())
            .ok_or_else(|| BillingError::Provider {
                message: "subscription has no items".to_string(),
            })?;

        let response = self.get(&format!("/products/{product_id}")).await?;
        let product: ProductResponse = response.json().await?;
        Ok(product.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_responses_deserialize() {
        let customer: CustomerResponse =
            serde_json::from_str(r#"{"id":"cus_9s6XKzkNRiz8i3","object":"customer"}"#).unwrap();
        assert_eq!(customer.id, "cus_9s6XKzkNRiz8i3");

        let session: PortalSessionResponse = serde_json::from_str(
            r#"{"id":"bps_1","url":"https://billing.stripe.com/p/session/test"}"#,
        )
        .unwrap();
        assert_eq!(session.url, "https://billing.stripe.com/p/session/test");

        let subscription: SubscriptionResponse = serde_json::from_str(
            r#"{"id":"sub_1","items":{"data":[{"plan":{"product":"prod_123"}}]}}"#,
        )
        .unwrap();
        assert_eq!(subscription.items.data[0].plan.product, "prod_123");
    }

    #[test]
    fn error_body_is_optional() {
        let error: ErrorResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(error.error.is_none());

        let error: ErrorResponse =
            serde_json::from_str(r#"{"error":{"message":"No such customer"}}"#).unwrap();
        assert_eq!(
            error.error.unwrap().message.as_deref(),
            Some("No such customer")
        );
    }
}
