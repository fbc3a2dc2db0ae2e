//! Reminder log entity model
//!
//! One immutable row per dispatch attempt. Rows are inserted and read, never
//! updated or deleted.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reminder_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub customer_id: Uuid,

    pub template_id: Uuid,

    /// `birthday` or `anniversary`
    pub occasion_type: String,

    /// The occurrence of the occasion this reminder was sent for
    pub occasion_date: Date,

    /// Rendered message body
    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// `sms` or `whatsapp`
    pub channel: String,

    /// `sent` or `failed`
    pub status: String,

    /// Provider error text for failed attempts
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    /// Provider-assigned message identifier, when one was returned
    #[sea_orm(column_type = "Text", nullable)]
    pub message_sid: Option<String>,

    pub sent_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Ledger entry as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReminderLogResponse {
    pub id: String,
    pub customer_id: String,
    pub template_id: String,
    #[schema(example = "birthday")]
    pub occasion_type: String,
    #[schema(example = "2025-03-14")]
    pub occasion_date: String,
    pub message: String,
    #[schema(example = "whatsapp")]
    pub channel: String,
    #[schema(example = "sent")]
    pub status: String,
    pub error_message: Option<String>,
    pub message_sid: Option<String>,
    #[schema(example = "2025-03-07T09:00:02Z")]
    pub sent_at: String,
}

impl From<Model> for ReminderLogResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id.to_string(),
            customer_id: model.customer_id.to_string(),
            template_id: model.template_id.to_string(),
            occasion_type: model.occasion_type,
            occasion_date: model.occasion_date.to_string(),
            message: model.message,
            channel: model.channel,
            status: model.status,
            error_message: model.error_message,
            message_sid: model.message_sid,
            sent_at: model.sent_at.to_rfc3339(),
        }
    }
}
