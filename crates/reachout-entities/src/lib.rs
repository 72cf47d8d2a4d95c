pub mod types;
pub mod users;
pub mod subscriptions;
pub mod usage_metrics;
pub mod companies;
pub mod company_contacts;
pub mod company_lists;
pub mod company_list_items;
pub mod campaigns;
pub mod sales_activities;
pub mod email_activities;
pub mod form_activities;
pub mod ai_templates;
pub mod ai_generations;

// Audit / operational log entities
pub mod audit_logs;
pub mod system_logs;

pub mod prelude;
