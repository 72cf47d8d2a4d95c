use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use uuid::Uuid;

use reachout_database::DbConnection;
use reachout_entities::ai_templates;
use reachout_entities::types::TemplateType;

use super::types::AiError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub template_type: TemplateType,
    pub tone: String,
    pub language: Option<String>,
    pub industry: Option<String>,
    pub template_content: String,
    pub variables: Option<Vec<String>>,
}

/// Substitute `{{name}}` placeholders from a JSON object. Unknown
/// placeholders are left in place so a half-filled draft is visible
/// rather than silently blank.
pub fn render_template(content: &str, vars: &serde_json::Value) -> String {
    let mut rendered = content.to_string();
    if let Some(map) = vars.as_object() {
        for (key, value) in map {
            let placeholder = format!("{{{{{key}}}}}");
            let replacement = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&placeholder, &replacement);
        }
    }
    rendered
}

/// Reusable prompt templates with usage and rating counters.
pub struct TemplateService {
    db: Arc<DbConnection>,
}

impl TemplateService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    pub async fn create_template(
        &self,
        user_id: Uuid,
        request: CreateTemplateRequest,
    ) -> Result<ai_templates::Model, AiError> {
        if request.template_content.trim().is_empty() {
            return Err(AiError::InvalidInput(
                "template content is required".to_string(),
            ));
        }

        let template = ai_templates::ActiveModel {
            user_id: Set(user_id),
            name: Set(request.name),
            template_type: Set(request.template_type),
            industry: Set(request.industry),
            tone: Set(request.tone),
            language: Set(request.language.unwrap_or_else(|| "ja".to_string())),
            template_content: Set(request.template_content),
            variables: Set(request.variables.map(|v| serde_json::json!(v))),
            usage_count: Set(0),
            is_public: Set(false),
            rating: Set(0.0),
            ..Default::default()
        };
        Ok(template.insert(self.db.as_ref()).await?)
    }

    pub async fn get_template(&self, template_id: Uuid) -> Result<ai_templates::Model, AiError> {
        ai_templates::Entity::find_by_id(template_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(AiError::TemplateNotFound)
    }

    pub async fn templates_for_user(
        &self,
        user_id: Uuid,
        template_type: Option<TemplateType>,
    ) -> Result<Vec<ai_templates::Model>, AiError> {
        let mut query =
            ai_templates::Entity::find().filter(ai_templates::Column::UserId.eq(user_id));
        if let Some(template_type) = template_type {
            query = query.filter(ai_templates::Column::TemplateType.eq(template_type.as_str()));
        }
        Ok(query
            .order_by_desc(ai_templates::Column::UsageCount)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn increment_usage(&self, template_id: Uuid) -> Result<(), AiError> {
        let result = ai_templates::Entity::update_many()
            .col_expr(
                ai_templates::Column::UsageCount,
                Expr::col(ai_templates::Column::UsageCount).add(1),
            )
            .filter(ai_templates::Column::Id.eq(template_id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(AiError::TemplateNotFound);
        }
        Ok(())
    }

    pub async fn set_rating(
        &self,
        template_id: Uuid,
        rating: f64,
    ) -> Result<ai_templates::Model, AiError> {
        if !(0.0..=5.0).contains(&rating) {
            return Err(AiError::InvalidInput(
                "rating must be between 0 and 5".to_string(),
            ));
        }
        let template = self.get_template(template_id).await?;
        let mut active: ai_templates::ActiveModel = template.into();
        active.rating = Set(rating);
        Ok(active.update(self.db.as_ref()).await?)
    }
}
