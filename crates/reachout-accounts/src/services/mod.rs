mod account;
mod types;
mod usage;

pub use account::AccountService;
pub use types::{AccountError, AuthIdentity, QuotaStatus};
pub use usage::UsageService;
