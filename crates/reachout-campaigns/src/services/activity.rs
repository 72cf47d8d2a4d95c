use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use reachout_database::DbConnection;
use reachout_entities::types::{ActivityStatus, ActivityType};
use reachout_entities::{email_activities, form_activities, sales_activities};
use reachout_telemetry::Telemetry;

use super::types::{CampaignError, CreateEmailActivityRequest, CreateFormActivityRequest};

/// Outreach attempts and their channel detail rows. An activity and its
/// detail are created in one transaction; engagement callbacks correlate
/// on the email tracking id.
pub struct ActivityService {
    db: Arc<DbConnection>,
    telemetry: Telemetry,
}

impl ActivityService {
    pub fn new(db: Arc<DbConnection>, telemetry: Telemetry) -> Self {
        Self { db, telemetry }
    }

    pub async fn create_email_activity(
        &self,
        request: CreateEmailActivityRequest,
    ) -> Result<(sales_activities::Model, email_activities::Model), CampaignError> {
        if request.to_email.trim().is_empty() {
            return Err(CampaignError::InvalidInput(
                "recipient address is required".to_string(),
            ));
        }

        let telemetry = self.telemetry.clone();
        let (activity, email) = self
            .db
            .transaction::<_, (sales_activities::Model, email_activities::Model), CampaignError>(
                move |txn| {
                    Box::pin(async move {
                        let activity = sales_activities::ActiveModel {
                            campaign_id: Set(request.campaign_id),
                            company_id: Set(request.company_id),
                            activity_type: Set(ActivityType::Email),
                            status: Set(ActivityStatus::Pending),
                            channel: Set("email".to_string()),
                            subject: Set(Some(request.subject.clone())),
                            content: Set(Some(request.content.clone())),
                            scheduled_at: Set(request.scheduled_at),
                            ..Default::default()
                        };
                        let activity = activity.insert(txn).await?;

                        let email = email_activities::ActiveModel {
                            activity_id: Set(activity.id),
                            to_email: Set(request.to_email),
                            from_email: Set(request.from_email),
                            subject: Set(request.subject),
                            content: Set(request.content),
                            html_content: Set(request.html_content),
                            tracking_id: Set(Some(Uuid::new_v4().to_string())),
                            ..Default::default()
                        };
                        let email = email.insert(txn).await?;

                        Ok((activity, email))
                    })
                },
            )
            .await?;

        telemetry.track_sales_activity(
            "email",
            serde_json::json!({ "campaign_id": activity.campaign_id }),
        );
        Ok((activity, email))
    }

    pub async fn create_form_activity(
        &self,
        request: CreateFormActivityRequest,
    ) -> Result<(sales_activities::Model, form_activities::Model), CampaignError> {
        let parsed = url::Url::parse(&request.form_url)
            .map_err(|e| CampaignError::InvalidInput(format!("invalid form url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CampaignError::InvalidInput(
                "form url must be http or https".to_string(),
            ));
        }

        let telemetry = self.telemetry.clone();
        let (activity, form) = self
            .db
            .transaction::<_, (sales_activities::Model, form_activities::Model), CampaignError>(
                move |txn| {
                    Box::pin(async move {
                        let activity = sales_activities::ActiveModel {
                            campaign_id: Set(request.campaign_id),
                            company_id: Set(request.company_id),
                            activity_type: Set(ActivityType::Form),
                            status: Set(ActivityStatus::Pending),
                            channel: Set("form".to_string()),
                            content: Set(request.content.clone()),
                            scheduled_at: Set(request.scheduled_at),
                            ..Default::default()
                        };
                        let activity = activity.insert(txn).await?;

                        let form = form_activities::ActiveModel {
                            activity_id: Set(activity.id),
                            form_url: Set(request.form_url),
                            form_fields: Set(request.form_fields),
                            success: Set(false),
                            has_recaptcha: Set(false),
                            ..Default::default()
                        };
                        let form = form.insert(txn).await?;

                        Ok((activity, form))
                    })
                },
            )
            .await?;

        telemetry.track_sales_activity(
            "form",
            serde_json::json!({ "campaign_id": activity.campaign_id }),
        );
        Ok((activity, form))
    }

    pub async fn get_activity(
        &self,
        activity_id: Uuid,
    ) -> Result<sales_activities::Model, CampaignError> {
        sales_activities::Entity::find_by_id(activity_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(CampaignError::ActivityNotFound)
    }

    /// Validate and apply one status transition. A repeated transition
    /// to the current status is a no-op so delivery callbacks can be
    /// redelivered safely.
    pub async fn transition_status(
        &self,
        activity_id: Uuid,
        next: ActivityStatus,
    ) -> Result<sales_activities::Model, CampaignError> {
        let activity = self.get_activity(activity_id).await?;

        if activity.status == next {
            return Ok(activity);
        }
        if !activity.status.can_transition_to(next) {
            return Err(CampaignError::InvalidActivityTransition {
                from: activity.status,
                to: next,
            });
        }

        let mut active: sales_activities::ActiveModel = activity.into();
        active.status = Set(next);
        match next {
            ActivityStatus::Sent => {
                active.executed_at = Set(Some(Utc::now()));
            }
            ActivityStatus::Replied => {
                active.responded_at = Set(Some(Utc::now()));
            }
            _ => {}
        }
        Ok(active.update(self.db.as_ref()).await?)
    }

    pub async fn mark_processing(
        &self,
        activity_id: Uuid,
    ) -> Result<sales_activities::Model, CampaignError> {
        self.transition_status(activity_id, ActivityStatus::Processing)
            .await
    }

    /// The message left our hands: stamp the activity and the email
    /// detail with the SMTP outcome.
    pub async fn mark_sent(
        &self,
        activity_id: Uuid,
        smtp_response: Option<String>,
    ) -> Result<sales_activities::Model, CampaignError> {
        let activity = self
            .transition_status(activity_id, ActivityStatus::Sent)
            .await?;

        if let Some(email) = self.email_for_activity(activity_id).await? {
            let mut active: email_activities::ActiveModel = email.into();
            active.sent_at = Set(Some(Utc::now()));
            active.smtp_response = Set(smtp_response);
            active.update(self.db.as_ref()).await?;
        }

        Ok(activity)
    }

    pub async fn mark_delivered(
        &self,
        activity_id: Uuid,
    ) -> Result<sales_activities::Model, CampaignError> {
        self.transition_status(activity_id, ActivityStatus::Delivered)
            .await
    }

    pub async fn mark_failed(
        &self,
        activity_id: Uuid,
    ) -> Result<sales_activities::Model, CampaignError> {
        self.transition_status(activity_id, ActivityStatus::Failed)
            .await
    }

    pub async fn record_open(
        &self,
        tracking_id: &str,
    ) -> Result<sales_activities::Model, CampaignError> {
        let email = self.email_by_tracking_id(tracking_id).await?;
        let activity = self
            .transition_status(email.activity_id, ActivityStatus::Opened)
            .await?;

        if email.opened_at.is_none() {
            let mut active: email_activities::ActiveModel = email.into();
            active.opened_at = Set(Some(Utc::now()));
            active.update(self.db.as_ref()).await?;
        }
        Ok(activity)
    }

    pub async fn record_click(
        &self,
        tracking_id: &str,
    ) -> Result<sales_activities::Model, CampaignError> {
        let email = self.email_by_tracking_id(tracking_id).await?;
        let activity = self
            .transition_status(email.activity_id, ActivityStatus::Clicked)
            .await?;

        if email.clicked_at.is_none() {
            let mut active: email_activities::ActiveModel = email.into();
            active.clicked_at = Set(Some(Utc::now()));
            active.update(self.db.as_ref()).await?;
        }
        Ok(activity)
    }

    pub async fn record_reply(
        &self,
        tracking_id: &str,
        response_content: Option<String>,
    ) -> Result<sales_activities::Model, CampaignError> {
        let email = self.email_by_tracking_id(tracking_id).await?;
        let activity = self
            .transition_status(email.activity_id, ActivityStatus::Replied)
            .await?;

        let mut email_active: email_activities::ActiveModel = email.into();
        email_active.replied_at = Set(Some(Utc::now()));
        email_active.update(self.db.as_ref()).await?;

        if response_content.is_some() {
            let mut active: sales_activities::ActiveModel = activity.clone().into();
            active.response_content = Set(response_content);
            return Ok(active.update(self.db.as_ref()).await?);
        }
        Ok(activity)
    }

    pub async fn record_bounce(
        &self,
        tracking_id: &str,
        reason: Option<String>,
    ) -> Result<sales_activities::Model, CampaignError> {
        let email = self.email_by_tracking_id(tracking_id).await?;
        let activity = self
            .transition_status(email.activity_id, ActivityStatus::Bounced)
            .await?;

        let mut active: email_activities::ActiveModel = email.into();
        active.bounced_at = Set(Some(Utc::now()));
        active.bounce_reason = Set(reason);
        active.update(self.db.as_ref()).await?;

        info!(activity_id = %activity.id, "email bounced");
        Ok(activity)
    }

    /// Apply a form submission outcome: success moves the activity to
    /// sent, failure to failed, with the detail row updated either way.
    pub async fn record_form_result(
        &self,
        activity_id: Uuid,
        success: bool,
        error_message: Option<String>,
        response_html: Option<String>,
    ) -> Result<sales_activities::Model, CampaignError> {
        let form = form_activities::Entity::find()
            .filter(form_activities::Column::ActivityId.eq(activity_id))
            .one(self.db.as_ref())
            .await?
            .ok_or(CampaignError::ActivityNotFound)?;

        let next = if success {
            ActivityStatus::Sent
        } else {
            ActivityStatus::Failed
        };
        let activity = self.transition_status(activity_id, next).await?;

        let mut active: form_activities::ActiveModel = form.into();
        active.submitted_at = Set(Some(Utc::now()));
        active.success = Set(success);
        active.error_message = Set(error_message);
        active.response_html = Set(response_html);
        active.update(self.db.as_ref()).await?;

        Ok(activity)
    }

    async fn email_for_activity(
        &self,
        activity_id: Uuid,
    ) -> Result<Option<email_activities::Model>, CampaignError> {
        Ok(email_activities::Entity::find()
            .filter(email_activities::Column::ActivityId.eq(activity_id))
            .one(self.db.as_ref())
            .await?)
    }

    async fn email_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<email_activities::Model, CampaignError> {
        email_activities::Entity::find()
            .filter(email_activities::Column::TrackingId.eq(tracking_id))
            .one(self.db.as_ref())
            .await?
            .ok_or(CampaignError::ActivityNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::campaign::CampaignService;
    use crate::services::types::CreateCampaignRequest;
    use reachout_database::test_utils::TestDatabase;
    use reachout_entities::types::{CampaignType, UserStatus};
    use reachout_entities::users;
    use reachout_prospects::ListService;

    struct Fixture {
        _test_db: TestDatabase,
        db: Arc<DbConnection>,
        campaign: reachout_entities::campaigns::Model,
        company: reachout_entities::companies::Model,
    }

    async fn fixture() -> anyhow::Result<Fixture> {
        let test_db = TestDatabase::with_migrations().await?;
        let db = test_db.db.clone();

        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set("activities@example.com".to_string()),
            name: Set("Activities".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        let user = user.insert(db.as_ref()).await?;

        let lists = ListService::new(db.clone());
        let list = lists
            .create_list_with_companies(
                user.id,
                "Activity targets",
                None,
                vec![reachout_prospects::NewCompanyRow {
                    name: "Acme".to_string(),
                    ..Default::default()
                }],
            )
            .await?;
        let company = lists.list_companies(list.id).await?.remove(0);

        let campaign = CampaignService::new(db.clone(), Telemetry::disabled())
            .create_campaign(
                user.id,
                CreateCampaignRequest {
                    name: "Activity campaign".to_string(),
                    list_id: list.id,
                    campaign_type: CampaignType::Email,
                    target_count: None,
                    ai_config: None,
                    template_config: None,
                    schedule_config: None,
                    rate_limit_config: None,
                },
            )
            .await?;

        Ok(Fixture {
            _test_db: test_db,
            db,
            campaign,
            company,
        })
    }

    fn email_request(fixture: &Fixture) -> CreateEmailActivityRequest {
        CreateEmailActivityRequest {
            campaign_id: fixture.campaign.id,
            company_id: fixture.company.id,
            to_email: "info@acme.example".to_string(),
            from_email: "sales@reachout.example".to_string(),
            subject: "ご提案".to_string(),
            content: "こんにちは".to_string(),
            html_content: None,
            scheduled_at: None,
        }
    }

    #[tokio::test]
    async fn email_activity_creates_both_rows() -> anyhow::Result<()> {
        let fx = fixture().await?;
        let service = ActivityService::new(fx.db.clone(), Telemetry::disabled());

        let (activity, email) = service.create_email_activity(email_request(&fx)).await?;
        assert_eq!(activity.status, ActivityStatus::Pending);
        assert_eq!(email.activity_id, activity.id);
        assert!(email.tracking_id.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn delivery_pipeline_cannot_skip_states() -> anyhow::Result<()> {
        let fx = fixture().await?;
        let service = ActivityService::new(fx.db.clone(), Telemetry::disabled());

        let (activity, email) = service.create_email_activity(email_request(&fx)).await?;
        let tracking_id = email.tracking_id.unwrap();

        // pending -> sent skips processing and is rejected
        let err = service.mark_sent(activity.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            CampaignError::InvalidActivityTransition {
                from: ActivityStatus::Pending,
                to: ActivityStatus::Sent,
            }
        ));

        service.mark_processing(activity.id).await?;
        let sent = service.mark_sent(activity.id, Some("250 OK".to_string())).await?;
        assert_eq!(sent.status, ActivityStatus::Sent);
        assert!(sent.executed_at.is_some());

        service.mark_delivered(activity.id).await?;
        let opened = service.record_open(&tracking_id).await?;
        assert_eq!(opened.status, ActivityStatus::Opened);

        // Redelivered open callback is a no-op, not an error
        let again = service.record_open(&tracking_id).await?;
        assert_eq!(again.status, ActivityStatus::Opened);

        let replied = service
            .record_reply(&tracking_id, Some("興味があります".to_string()))
            .await?;
        assert_eq!(replied.status, ActivityStatus::Replied);
        assert!(replied.responded_at.is_some());
        assert_eq!(replied.response_content.as_deref(), Some("興味があります"));

        // Terminal: no further transitions
        let err = service.mark_delivered(activity.id).await.unwrap_err();
        assert!(matches!(
            err,
            CampaignError::InvalidActivityTransition { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn bounce_records_reason_on_the_email_detail() -> anyhow::Result<()> {
        let fx = fixture().await?;
        let service = ActivityService::new(fx.db.clone(), Telemetry::disabled());

        let (activity, email) = service.create_email_activity(email_request(&fx)).await?;
        let tracking_id = email.tracking_id.unwrap();

        service.mark_processing(activity.id).await?;
        service.mark_sent(activity.id, None).await?;
        let bounced = service
            .record_bounce(&tracking_id, Some("mailbox full".to_string()))
            .await?;
        assert_eq!(bounced.status, ActivityStatus::Bounced);

        let email = email_activities::Entity::find()
            .filter(email_activities::Column::ActivityId.eq(activity.id))
            .one(fx.db.as_ref())
            .await?
            .unwrap();
        assert!(email.bounced_at.is_some());
        assert_eq!(email.bounce_reason.as_deref(), Some("mailbox full"));

        Ok(())
    }

    #[tokio::test]
    async fn form_activities_validate_the_url() -> anyhow::Result<()> {
        let fx = fixture().await?;
        let service = ActivityService::new(fx.db.clone(), Telemetry::disabled());

        let err = service
            .create_form_activity(CreateFormActivityRequest {
                campaign_id: fx.campaign.id,
                company_id: fx.company.id,
                form_url: "not a url".to_string(),
                form_fields: serde_json::json!({}),
                content: None,
                scheduled_at: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidInput(_)));

        let (activity, form) = service
            .create_form_activity(CreateFormActivityRequest {
                campaign_id: fx.campaign.id,
                company_id: fx.company.id,
                form_url: "https://acme.example/contact".to_string(),
                form_fields: serde_json::json!({ "message": "こんにちは" }),
                content: None,
                scheduled_at: None,
            })
            .await?;
        assert_eq!(activity.activity_type, ActivityType::Form);
        assert!(!form.success);

        service.mark_processing(activity.id).await?;
        let submitted = service
            .record_form_result(activity.id, true, None, None)
            .await?;
        assert_eq!(submitted.status, ActivityStatus::Sent);

        let form = form_activities::Entity::find()
            .filter(form_activities::Column::ActivityId.eq(activity.id))
            .one(fx.db.as_ref())
            .await?
            .unwrap();
        assert!(form.success);
        assert!(form.submitted_at.is_some());

        Ok(())
    }
}
