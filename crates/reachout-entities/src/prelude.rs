pub use super::ai_generations::Entity as AiGenerations;
pub use super::ai_templates::Entity as AiTemplates;
pub use super::audit_logs::Entity as AuditLogs;
pub use super::campaigns::Entity as Campaigns;
pub use super::companies::Entity as Companies;
pub use super::company_contacts::Entity as CompanyContacts;
pub use super::company_list_items::Entity as CompanyListItems;
pub use super::company_lists::Entity as CompanyLists;
pub use super::email_activities::Entity as EmailActivities;
pub use super::form_activities::Entity as FormActivities;
pub use super::sales_activities::Entity as SalesActivities;
pub use super::subscriptions::Entity as Subscriptions;
pub use super::system_logs::Entity as SystemLogs;
pub use super::usage_metrics::Entity as UsageMetrics;
pub use super::users::Entity as Users;

pub use super::types::{
    ActivityStatus, ActivityType, CampaignStatus, CampaignType, CompanyStatus, LogLevel,
    SubscriptionStatus, TemplateType, UserStatus,
};
