//! Configuration management utilities

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> ServiceResult<Self> {
        let url = std::env::var("DATABASE_URL").map_err(|_| ServiceError::Configuration {
            message: "DATABASE_URL environment variable is not set".to_string(),
        })?;

        Ok(Self {
            url,
            max_connections: 100,
            min_connections: 5,
        })
    }
}

/// Payment provider (Stripe) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Secret API key for outbound provider calls
    pub secret_key: String,
    /// Signing secret used to verify inbound webhook payloads
    pub webhook_secret: String,
    /// Public base URL of the dashboard, used for billing portal return links
    pub public_url: String,
}

impl BillingConfig {
    pub fn from_env() -> ServiceResult<Self> {
        let secret_key =
            std::env::var("STRIPE_SECRET_KEY").map_err(|_| ServiceError::Configuration {
                message: "STRIPE_SECRET_KEY environment variable is not set".to_string(),
            })?;
        let webhook_secret =
            std::env::var("STRIPE_WEBHOOK_SECRET").map_err(|_| ServiceError::Configuration {
                message: "STRIPE_WEBHOOK_SECRET environment variable is not set".to_string(),
            })?;
        let public_url =
            std::env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            secret_key,
            webhook_secret,
            public_url,
        })
    }
}

/// AI generation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl AiProviderConfig {
    pub fn from_env() -> ServiceResult<Self> {
        let endpoint =
            std::env::var("AI_PROVIDER_ENDPOINT").map_err(|_| ServiceError::Configuration {
                message: "AI_PROVIDER_ENDPOINT environment variable is not set".to_string(),
            })?;
        let api_key =
            std::env::var("AI_PROVIDER_API_KEY").map_err(|_| ServiceError::Configuration {
                message: "AI_PROVIDER_API_KEY environment variable is not set".to_string(),
            })?;
        let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Ok(Self {
            endpoint,
            api_key,
            model,
            timeout_secs: 60,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_requires_url() {
        std::env::remove_var("DATABASE_URL");
        let result = DatabaseConfig::from_env();
        assert!(matches!(
            result,
            Err(ServiceError::Configuration { .. })
        ));
    }
}
