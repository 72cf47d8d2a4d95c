mod stripe;
mod subscription;
mod types;
mod webhook;

pub use stripe::StripeClient;
pub use subscription::{CreateSubscriptionRequest, SubscriptionService};
pub use types::BillingError;
pub use webhook::{SignatureVerifier, WebhookOutcome, WebhookProcessor};
