use std::sync::Arc;
use std::time::Instant;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::info;
use uuid::Uuid;

use reachout_database::DbConnection;
use reachout_entities::ai_generations;

use crate::client::{AiClient, GenerationRequest};

use super::template::{render_template, TemplateService};
use super::types::AiError;

/// Runs one AI invocation end to end: render the prompt, call the
/// provider, and persist the generation record (tokens, latency, cost,
/// template link).
pub struct GenerationService {
    db: Arc<DbConnection>,
    client: Arc<dyn AiClient>,
    templates: TemplateService,
    default_model: String,
    /// USD per token, used when the provider reports usage but no cost
    cost_per_token: Option<f64>,
}

impl GenerationService {
    pub fn new(db: Arc<DbConnection>, client: Arc<dyn AiClient>, default_model: String) -> Self {
        let templates = TemplateService::new(db.clone());
        Self {
            db,
            client,
            templates,
            default_model,
            cost_per_token: None,
        }
    }

    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = Some(cost);
        self
    }

    /// Draft one message. With a template the prompt is the rendered
    /// template content; without one the input must carry a `prompt`
    /// field. Provider failures surface as recoverable errors and leave
    /// no generation record behind.
    pub async fn generate_draft(
        &self,
        user_id: Uuid,
        template_id: Option<Uuid>,
        input: serde_json::Value,
    ) -> Result<ai_generations::Model, AiError> {
        let prompt = match template_id {
            Some(template_id) => {
                let template = self.templates.get_template(template_id).await?;
                render_template(&template.template_content, &input)
            }
            None => input
                .get("prompt")
                .and_then(|p| p.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    AiError::InvalidInput("input must carry a prompt field".to_string())
                })?,
        };

        let request = GenerationRequest {
            prompt,
            model: self.default_model.clone(),
            temperature: input.get("temperature").and_then(|t| t.as_f64()),
            max_tokens: None,
        };

        let started = Instant::now();
        let reply = self.client.generate(&request).await?;
        let elapsed_ms = started.elapsed().as_millis() as i32;

        let cost_usd = self
            .cost_per_token
            .map(|rate| rate * reply.usage.tokens as f64);

        let generation = ai_generations::ActiveModel {
            user_id: Set(user_id),
            template_id: Set(template_id),
            input_data: Set(input),
            generated_content: Set(reply.content),
            prompt_tokens: Set(reply.usage.prompt_tokens),
            completion_tokens: Set(reply.usage.completion_tokens),
            total_tokens: Set(Some(reply.usage.tokens)),
            model_used: Set(reply.model.or_else(|| Some(self.default_model.clone()))),
            generation_time_ms: Set(Some(elapsed_ms)),
            cost_usd: Set(cost_usd),
            ..Default::default()
        };
        let generation = generation.insert(self.db.as_ref()).await?;

        if let Some(template_id) = template_id {
            self.templates.increment_usage(template_id).await?;
        }

        info!(
            generation_id = %generation.id,
            tokens = reply.usage.tokens,
            elapsed_ms,
            "recorded AI generation"
        );
        Ok(generation)
    }

    pub async fn generations_for_user(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ai_generations::Model>, AiError> {
        Ok(ai_generations::Entity::find()
            .filter(ai_generations::Column::UserId.eq(user_id))
            .order_by_desc(ai_generations::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn rate_generation(
        &self,
        generation_id: Uuid,
        quality_rating: i32,
    ) -> Result<ai_generations::Model, AiError> {
        if !(1..=5).contains(&quality_rating) {
            return Err(AiError::InvalidInput(
                "quality rating must be between 1 and 5".to_string(),
            ));
        }
        let generation = ai_generations::Entity::find_by_id(generation_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(AiError::InvalidInput("generation not found".to_string()))?;
        let mut active: ai_generations::ActiveModel = generation.into();
        active.quality_rating = Set(Some(quality_rating));
        Ok(active.update(self.db.as_ref()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StaticAiClient;
    use crate::services::template::CreateTemplateRequest;
    use async_trait::async_trait;
    use reachout_database::test_utils::TestDatabase;
    use reachout_entities::types::{TemplateType, UserStatus};
    use reachout_entities::users;
    use sea_orm::PaginatorTrait;

    struct FailingClient;

    #[async_trait]
    impl AiClient for FailingClient {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<crate::client::GenerationReply, AiError> {
            Err(AiError::Provider {
                message: "provider returned 503".to_string(),
            })
        }
    }

    async fn seed_user(db: &DbConnection) -> anyhow::Result<users::Model> {
        let user = users::ActiveModel {
            auth_provider_id: Set(Uuid::new_v4()),
            email: Set("ai@example.com".to_string()),
            name: Set("Ai".to_string()),
            timezone: Set("Asia/Tokyo".to_string()),
            locale: Set("ja".to_string()),
            status: Set(UserStatus::Active),
            ..Default::default()
        };
        Ok(user.insert(db).await?)
    }

    #[tokio::test]
    async fn drafting_records_usage_and_bumps_the_template() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;

        let templates = TemplateService::new(test_db.db.clone());
        let template = templates
            .create_template(
                user.id,
                CreateTemplateRequest {
                    name: "Opener".to_string(),
                    template_type: TemplateType::Email,
                    tone: "formal".to_string(),
                    language: None,
                    industry: None,
                    template_content: "{{company_name}}様、はじめまして。".to_string(),
                    variables: Some(vec!["company_name".to_string()]),
                },
            )
            .await?;

        let service = GenerationService::new(
            test_db.db.clone(),
            Arc::new(StaticAiClient::with_content("生成された下書き")),
            "gpt-4o-mini".to_string(),
        )
        .with_cost_per_token(0.000002);

        let generation = service
            .generate_draft(
                user.id,
                Some(template.id),
                serde_json::json!({ "company_name": "Acme" }),
            )
            .await?;

        assert_eq!(generation.generated_content, "生成された下書き");
        assert_eq!(generation.total_tokens, Some(42));
        assert_eq!(generation.template_id, Some(template.id));
        assert!(generation.generation_time_ms.is_some());
        assert!(generation.cost_usd.unwrap() > 0.0);

        let template = templates.get_template(template.id).await?;
        assert_eq!(template.usage_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn prompt_is_required_without_a_template() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;

        let service = GenerationService::new(
            test_db.db.clone(),
            Arc::new(StaticAiClient::with_content("x")),
            "gpt-4o-mini".to_string(),
        );

        let err = service
            .generate_draft(user.id, None, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::InvalidInput(_)));

        Ok(())
    }

    #[tokio::test]
    async fn provider_failure_is_recoverable_and_records_nothing() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;
        let user = seed_user(test_db.db.as_ref()).await?;

        let service = GenerationService::new(
            test_db.db.clone(),
            Arc::new(FailingClient),
            "gpt-4o-mini".to_string(),
        );

        let err = service
            .generate_draft(user.id, None, serde_json::json!({ "prompt": "書いて" }))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Provider { .. }));

        assert_eq!(
            ai_generations::Entity::find()
                .count(test_db.db.as_ref())
                .await?,
            0
        );

        Ok(())
    }
}
