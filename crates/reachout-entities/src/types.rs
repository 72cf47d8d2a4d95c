//! Status enums shared by the Reachout entities.
//!
//! All enums are stored as text columns so the same schema works on
//! Postgres and SQLite. Inbound strings from webhooks or import files go
//! through `from_str`, which returns `None` for anything outside the
//! declared set.

use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

impl Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(UserStatus::Active),
            "inactive" => Some(UserStatus::Inactive),
            "suspended" => Some(UserStatus::Suspended),
            _ => None,
        }
    }
}

/// Billing status mirrored from the payment provider.
///
/// Webhook payloads carry the status as a string; anything that does not
/// parse here is rejected before it reaches the subscriptions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "canceled")]
    Canceled,
    #[sea_orm(string_value = "past_due")]
    PastDue,
    #[sea_orm(string_value = "trialing")]
    Trialing,
    #[sea_orm(string_value = "incomplete")]
    Incomplete,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "trialing" => Some(SubscriptionStatus::Trialing),
            "incomplete" => Some(SubscriptionStatus::Incomplete),
            _ => None,
        }
    }
}

/// Prospect company status. Blacklisted companies are excluded from
/// campaign targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "blacklist")]
    Blacklist,
}

impl Display for CompanyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Inactive => "inactive",
            CompanyStatus::Blacklist => "blacklist",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CompanyStatus::Active),
            "inactive" => Some(CompanyStatus::Inactive),
            "blacklist" => Some(CompanyStatus::Blacklist),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "form")]
    Form,
    #[sea_orm(string_value = "mixed")]
    Mixed,
}

impl Display for CampaignType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignType::Email => "email",
            CampaignType::Form => "form",
            CampaignType::Mixed => "mixed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(CampaignType::Email),
            "form" => Some(CampaignType::Form),
            "mixed" => Some(CampaignType::Mixed),
            _ => None,
        }
    }
}

/// Campaign lifecycle status.
///
/// Transitions are validated by `can_transition_to` before any write:
/// draft -> active, active -> paused/completed/canceled, paused ->
/// active/canceled. Completed and canceled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

impl Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(CampaignStatus::Draft),
            "active" => Some(CampaignStatus::Active),
            "paused" => Some(CampaignStatus::Paused),
            "completed" => Some(CampaignStatus::Completed),
            "canceled" => Some(CampaignStatus::Canceled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Active)
                | (Active, Paused)
                | (Active, Completed)
                | (Active, Canceled)
                | (Paused, Active)
                | (Paused, Canceled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "form")]
    Form,
    #[sea_orm(string_value = "call")]
    Call,
    #[sea_orm(string_value = "meeting")]
    Meeting,
    #[sea_orm(string_value = "note")]
    Note,
}

impl Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Email => "email",
            ActivityType::Form => "form",
            ActivityType::Call => "call",
            ActivityType::Meeting => "meeting",
            ActivityType::Note => "note",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(ActivityType::Email),
            "form" => Some(ActivityType::Form),
            "call" => Some(ActivityType::Call),
            "meeting" => Some(ActivityType::Meeting),
            "note" => Some(ActivityType::Note),
            _ => None,
        }
    }
}

/// Outreach attempt progression.
///
/// The happy path is pending -> processing -> sent -> delivered ->
/// opened/clicked/replied. Bounced and failed are reachable from the
/// in-flight states; no transition may skip forward or move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "opened")]
    Opened,
    #[sea_orm(string_value = "clicked")]
    Clicked,
    #[sea_orm(string_value = "replied")]
    Replied,
    #[sea_orm(string_value = "bounced")]
    Bounced,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Processing => "processing",
            ActivityStatus::Sent => "sent",
            ActivityStatus::Delivered => "delivered",
            ActivityStatus::Opened => "opened",
            ActivityStatus::Clicked => "clicked",
            ActivityStatus::Replied => "replied",
            ActivityStatus::Bounced => "bounced",
            ActivityStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ActivityStatus::Pending),
            "processing" => Some(ActivityStatus::Processing),
            "sent" => Some(ActivityStatus::Sent),
            "delivered" => Some(ActivityStatus::Delivered),
            "opened" => Some(ActivityStatus::Opened),
            "clicked" => Some(ActivityStatus::Clicked),
            "replied" => Some(ActivityStatus::Replied),
            "bounced" => Some(ActivityStatus::Bounced),
            "failed" => Some(ActivityStatus::Failed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: ActivityStatus) -> bool {
        use ActivityStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Processing, Sent)
                | (Processing, Failed)
                | (Sent, Delivered)
                | (Sent, Bounced)
                | (Sent, Failed)
                | (Delivered, Opened)
                | (Delivered, Clicked)
                | (Delivered, Replied)
                | (Delivered, Bounced)
                | (Opened, Clicked)
                | (Opened, Replied)
                | (Clicked, Replied)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivityStatus::Replied | ActivityStatus::Bounced | ActivityStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "form")]
    Form,
    #[sea_orm(string_value = "subject")]
    Subject,
}

impl Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Email => "email",
            TemplateType::Form => "form",
            TemplateType::Subject => "subject",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(TemplateType::Email),
            "form" => Some(TemplateType::Form),
            "subject" => Some(TemplateType::Subject),
            _ => None,
        }
    }
}

/// Severity level for operational system logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum LogLevel {
    #[sea_orm(string_value = "DEBUG")]
    Debug,
    #[sea_orm(string_value = "INFO")]
    Info,
    #[sea_orm(string_value = "WARNING")]
    Warning,
    #[sea_orm(string_value = "ERROR")]
    Error,
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Incomplete,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn out_of_set_values_are_rejected() {
        assert_eq!(CompanyStatus::from_str("pending"), None);
        assert_eq!(SubscriptionStatus::from_str("unpaid"), None);
        assert_eq!(ActivityStatus::from_str("queued"), None);
        assert_eq!(LogLevel::from_str("info"), None);
    }

    #[test]
    fn campaign_transitions_follow_lifecycle() {
        use CampaignStatus::*;
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Active.can_transition_to(Completed));
        assert!(Paused.can_transition_to(Active));
        assert!(Paused.can_transition_to(Canceled));

        assert!(!Draft.can_transition_to(Completed));
        assert!(!Draft.can_transition_to(Paused));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Canceled.can_transition_to(Draft));
        assert!(Completed.is_terminal());
    }

    #[test]
    fn activity_transitions_cannot_skip_states() {
        use ActivityStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Opened));
        assert!(Opened.can_transition_to(Replied));
        assert!(Sent.can_transition_to(Bounced));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Sent));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Sent.can_transition_to(Opened));
        assert!(!Replied.can_transition_to(Opened));
        assert!(!Bounced.can_transition_to(Sent));
        assert!(Replied.is_terminal());
        assert!(Failed.is_terminal());
    }
}
