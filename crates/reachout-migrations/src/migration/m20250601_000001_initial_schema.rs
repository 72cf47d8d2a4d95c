use sea_orm_migration::prelude::*;

/// Initial Reachout schema: accounts, billing, prospect lists, campaigns,
/// activities, AI templates and audit tables, with the ownership and
/// cascade rules the services rely on.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("users"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("auth_provider_id"))
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("email"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("company_name")).string().null())
                    .col(ColumnDef::new(Alias::new("avatar_url")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("timezone"))
                            .string()
                            .not_null()
                            .default("Asia/Tokyo"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("locale"))
                            .string()
                            .not_null()
                            .default("ja"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("deleted_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create subscriptions table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("subscriptions"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().not_null())
                    .col(
                        ColumnDef::new(Alias::new("stripe_customer_id"))
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("stripe_subscription_id"))
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("plan_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("status")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("current_period_start"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("current_period_end"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("cancel_at_period_end"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("trial_end"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("metadata")).json_binary().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_user_id")
                            .from(Alias::new("subscriptions"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create usage_metrics table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("usage_metrics"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().not_null())
                    .col(
                        ColumnDef::new(Alias::new("metric_type"))
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("metric_value"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("period_start"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("period_end"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_usage_metrics_user_id")
                            .from(Alias::new("usage_metrics"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create company_lists table (before companies, which reference it)
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("company_lists"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("description")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("total_companies"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Alias::new("tags")).json_binary().null())
                    .col(
                        ColumnDef::new(Alias::new("is_public"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("deleted_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_lists_user_id")
                            .from(Alias::new("company_lists"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create companies table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("companies"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("list_id")).uuid().null())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("domain")).string().null())
                    .col(ColumnDef::new(Alias::new("website_url")).text().null())
                    .col(ColumnDef::new(Alias::new("industry")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("employee_count_range"))
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("revenue_range")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("country"))
                            .string()
                            .not_null()
                            .default("Japan"),
                    )
                    .col(ColumnDef::new(Alias::new("prefecture")).string().null())
                    .col(ColumnDef::new(Alias::new("city")).string().null())
                    .col(ColumnDef::new(Alias::new("description")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("last_contacted_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("response_status"))
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("tags")).json_binary().null())
                    .col(
                        ColumnDef::new(Alias::new("custom_fields"))
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("deleted_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_companies_user_id")
                            .from(Alias::new("companies"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_companies_list_id")
                            .from(Alias::new("companies"), Alias::new("list_id"))
                            .to(Alias::new("company_lists"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create company_contacts table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("company_contacts"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("company_id")).uuid().not_null())
                    .col(
                        ColumnDef::new(Alias::new("contact_type"))
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("value")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("contact_person_name"))
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("contact_person_title"))
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("department")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("is_primary"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("is_verified"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("verification_date"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("notes")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_contacts_company_id")
                            .from(Alias::new("company_contacts"), Alias::new("company_id"))
                            .to(Alias::new("companies"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create company_list_items table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("company_list_items"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("list_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("company_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("position")).integer().null())
                    .col(
                        ColumnDef::new(Alias::new("custom_data"))
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("added_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_list_items_list_id")
                            .from(Alias::new("company_list_items"), Alias::new("list_id"))
                            .to(Alias::new("company_lists"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_list_items_company_id")
                            .from(Alias::new("company_list_items"), Alias::new("company_id"))
                            .to(Alias::new("companies"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A company appears at most once per list
        manager
            .create_index(
                Index::create()
                    .name("company_list_items_list_company_unique")
                    .table(Alias::new("company_list_items"))
                    .col(Alias::new("list_id"))
                    .col(Alias::new("company_id"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create campaigns table. list_id is RESTRICT: the referenced list
        // cannot be deleted while the campaign exists.
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("campaigns"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("list_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("campaign_type"))
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .text()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Alias::new("target_count")).integer().null())
                    .col(
                        ColumnDef::new(Alias::new("success_count"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("ai_config"))
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("template_config"))
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("schedule_config"))
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("rate_limit_config"))
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("started_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("completed_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaigns_user_id")
                            .from(Alias::new("campaigns"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaigns_list_id")
                            .from(Alias::new("campaigns"), Alias::new("list_id"))
                            .to(Alias::new("company_lists"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Create sales_activities table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("sales_activities"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("campaign_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("company_id")).uuid().not_null())
                    .col(
                        ColumnDef::new(Alias::new("activity_type"))
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("status")).text().not_null())
                    .col(ColumnDef::new(Alias::new("channel")).string().not_null())
                    .col(ColumnDef::new(Alias::new("subject")).string().null())
                    .col(ColumnDef::new(Alias::new("content")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("response_content"))
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("metadata")).json_binary().null())
                    .col(
                        ColumnDef::new(Alias::new("scheduled_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("executed_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("responded_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_activities_campaign_id")
                            .from(Alias::new("sales_activities"), Alias::new("campaign_id"))
                            .to(Alias::new("campaigns"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_activities_company_id")
                            .from(Alias::new("sales_activities"), Alias::new("company_id"))
                            .to(Alias::new("companies"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create email_activities table (1:1 channel detail)
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("email_activities"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("activity_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("to_email")).string().not_null())
                    .col(ColumnDef::new(Alias::new("from_email")).string().not_null())
                    .col(ColumnDef::new(Alias::new("subject")).string().not_null())
                    .col(ColumnDef::new(Alias::new("content")).text().not_null())
                    .col(ColumnDef::new(Alias::new("html_content")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("tracking_id"))
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("sent_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("opened_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("clicked_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("replied_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("bounced_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("bounce_reason")).text().null())
                    .col(ColumnDef::new(Alias::new("smtp_response")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_email_activities_activity_id")
                            .from(Alias::new("email_activities"), Alias::new("activity_id"))
                            .to(Alias::new("sales_activities"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create form_activities table (1:1 channel detail)
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("form_activities"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("activity_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("form_url")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("form_fields"))
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("submitted_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("success"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Alias::new("error_message")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("has_recaptcha"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("recaptcha_version"))
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("response_html")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_activities_activity_id")
                            .from(Alias::new("form_activities"), Alias::new("activity_id"))
                            .to(Alias::new("sales_activities"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create ai_templates table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("ai_templates"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("template_type"))
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("industry")).string().null())
                    .col(ColumnDef::new(Alias::new("tone")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("language"))
                            .string()
                            .not_null()
                            .default("ja"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("template_content"))
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("variables")).json_binary().null())
                    .col(
                        ColumnDef::new(Alias::new("usage_count"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("is_public"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("rating"))
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_templates_user_id")
                            .from(Alias::new("ai_templates"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create ai_generations table. template_id is SET NULL so deleting
        // a template keeps the generation history.
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("ai_generations"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("template_id")).uuid().null())
                    .col(
                        ColumnDef::new(Alias::new("input_data"))
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("generated_content"))
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("prompt_tokens"))
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("completion_tokens"))
                            .integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("total_tokens")).integer().null())
                    .col(ColumnDef::new(Alias::new("model_used")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("generation_time_ms"))
                            .integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("cost_usd")).double().null())
                    .col(
                        ColumnDef::new(Alias::new("quality_rating"))
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_generations_user_id")
                            .from(Alias::new("ai_generations"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_generations_template_id")
                            .from(Alias::new("ai_generations"), Alias::new("template_id"))
                            .to(Alias::new("ai_templates"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create audit_logs table (append-only)
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("audit_logs"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).uuid().null())
                    .col(ColumnDef::new(Alias::new("table_name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("record_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("action")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("old_values"))
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("new_values"))
                            .json_binary()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("ip_address")).string().null())
                    .col(ColumnDef::new(Alias::new("user_agent")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_logs_user_id")
                            .from(Alias::new("audit_logs"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create system_logs table (append-only)
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("system_logs"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("level")).text().not_null())
                    .col(ColumnDef::new(Alias::new("message")).text().not_null())
                    .col(ColumnDef::new(Alias::new("module")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("function_name"))
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("line_number")).integer().null())
                    .col(ColumnDef::new(Alias::new("context")).json_binary().null())
                    .col(ColumnDef::new(Alias::new("trace_id")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes for better performance
        manager
            .create_index(
                Index::create()
                    .name("idx_users_auth_provider_id")
                    .table(Alias::new("users"))
                    .col(Alias::new("auth_provider_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_user_id")
                    .table(Alias::new("subscriptions"))
                    .col(Alias::new("user_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_stripe_customer_id")
                    .table(Alias::new("subscriptions"))
                    .col(Alias::new("stripe_customer_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_companies_user_id_status")
                    .table(Alias::new("companies"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("status"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_companies_domain")
                    .table(Alias::new("companies"))
                    .col(Alias::new("domain"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_company_lists_user_id")
                    .table(Alias::new("company_lists"))
                    .col(Alias::new("user_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_company_list_items_list_id")
                    .table(Alias::new("company_list_items"))
                    .col(Alias::new("list_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_campaigns_user_id_status")
                    .table(Alias::new("campaigns"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("status"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_activities_campaign_company")
                    .table(Alias::new("sales_activities"))
                    .col(Alias::new("campaign_id"))
                    .col(Alias::new("company_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ai_templates_user_type")
                    .table(Alias::new("ai_templates"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("template_type"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ai_generations_user_created")
                    .table(Alias::new("ai_generations"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("created_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_user_table_created")
                    .table(Alias::new("audit_logs"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("table_name"))
                    .col(Alias::new("created_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_system_logs_level_created")
                    .table(Alias::new("system_logs"))
                    .col(Alias::new("level"))
                    .col(Alias::new("created_at"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to handle foreign key constraints
        manager
            .drop_table(Table::drop().table(Alias::new("system_logs")).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("audit_logs")).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("ai_generations")).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("ai_templates")).to_owned())
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("form_activities"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("email_activities"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("sales_activities"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("campaigns")).to_owned())
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("company_list_items"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("company_contacts"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("companies")).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("company_lists")).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("usage_metrics")).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("subscriptions")).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("users")).to_owned())
            .await?;

        Ok(())
    }
}
