//! Reminder template entity model
//!
//! A tenant keeps at most one template per occasion type; only an active one
//! is used by the reminder cycle.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::occasion::OccasionType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reminder_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// `birthday` or `anniversary`
    pub occasion_type: String,

    /// Message body containing the customer name placeholder
    #[sea_orm(column_type = "Text")]
    pub message: String,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
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

/// Template as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReminderTemplateResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub occasion_type: OccasionType,
    #[schema(example = "Happy birthday [CustomerName]! Enjoy 20% off this week.")]
    pub message: String,
    pub is_active: bool,
    #[schema(example = "2025-01-01T00:00:00Z")]
    pub created_at: String,
    #[schema(example = "2025-01-01T00:00:00Z")]
    pub updated_at: String,
}

impl TryFrom<Model> for ReminderTemplateResponse {
    type Error = super::occasion::UnknownVariant;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id.to_string(),
            occasion_type: model.occasion_type.parse()?,
            message: model.message,
            is_active: model.is_active,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        })
    }
}
