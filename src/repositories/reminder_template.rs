//! # Reminder Template Repository
//!
//! A tenant holds at most one template per occasion type. Creating a second
//! one, or retyping an existing one onto a taken type, is a conflict.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::OccasionType;
use crate::models::reminder_template::{
    ActiveModel as TemplateActiveModel, Column as TemplateColumn, Entity as Template,
    Model as TemplateModel,
};

const TYPE_CONFLICT: &str = "Template for this type already exists";
const MAX_MESSAGE_LEN: usize = 1600;

#[derive(Debug, Clone)]
pub struct CreateTemplateRequest {
    pub occasion_type: OccasionType,
    pub message: String,
    pub is_active: bool,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTemplateRequest {
    pub occasion_type: Option<OccasionType>,
    pub message: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ReminderTemplateRepository {
    db: Arc<DatabaseConnection>,
}

impl ReminderTemplateRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        request: CreateTemplateRequest,
    ) -> Result<TemplateModel, RepositoryError> {
        let message = validate_message(&request.message)?;

        if self
            .find_by_type(tenant_id, request.occasion_type)
            .await?
            .is_some()
        {
            return Err(RepositoryError::Conflict(TYPE_CONFLICT.to_string()));
        }

        let now = Utc::now();
        let template = TemplateActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            occasion_type: Set(request.occasion_type.as_str().to_string()),
            message: Set(message),
            is_active: Set(request.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        template
            .insert(self.db.as_ref())
            .await
            .map_err(conflict_on_unique)
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<TemplateModel>, RepositoryError> {
        Template::find()
            .filter(TemplateColumn::TenantId.eq(tenant_id))
            .order_by_asc(TemplateColumn::OccasionType)
            .order_by_asc(TemplateColumn::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<TemplateModel>, RepositoryError> {
        Template::find_by_id(template_id)
            .filter(TemplateColumn::TenantId.eq(tenant_id))
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    /// The active template used by the reminder cycle. `None` means the
    /// occasion type is skipped for this tenant.
    pub async fn get_active(
        &self,
        tenant_id: Uuid,
        occasion: OccasionType,
    ) -> Result<Option<TemplateModel>, RepositoryError> {
        Template::find()
            .filter(TemplateColumn::TenantId.eq(tenant_id))
            .filter(TemplateColumn::OccasionType.eq(occasion.as_str()))
            .filter(TemplateColumn::IsActive.eq(true))
            .order_by_desc(TemplateColumn::UpdatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        request: UpdateTemplateRequest,
    ) -> Result<TemplateModel, RepositoryError> {
        let existing = self
            .get(tenant_id, template_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Template not found".to_string()))?;

        let mut active = existing.clone().into_active_model();

        if let Some(occasion) = request.occasion_type
            && occasion.as_str() != existing.occasion_type
        {
            if self.find_by_type(tenant_id, occasion).await?.is_some() {
                return Err(RepositoryError::Conflict(TYPE_CONFLICT.to_string()));
            }
            active.occasion_type = Set(occasion.as_str().to_string());
        }

        if let Some(message) = request.message {
            active.message = Set(validate_message(&message)?);
        }

        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db.as_ref())
            .await
            .map_err(conflict_on_unique)
    }

    pub async fn delete(&self, tenant_id: Uuid, template_id: Uuid) -> Result<(), RepositoryError> {
        let template = self
            .get(tenant_id, template_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Template not found".to_string()))?;

        template
            .delete(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    async fn find_by_type(
        &self,
        tenant_id: Uuid,
        occasion: OccasionType,
    ) -> Result<Option<TemplateModel>, RepositoryError> {
        Template::find()
            .filter(TemplateColumn::TenantId.eq(tenant_id))
            .filter(TemplateColumn::OccasionType.eq(occasion.as_str()))
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }
}

fn validate_message(message: &str) -> Result<String, RepositoryError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_error("Message cannot be empty"));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(RepositoryError::validation_error(format!(
            "Message cannot exceed {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// The partial unique index backs up the type check under concurrent writes.
fn conflict_on_unique(err: sea_orm::DbErr) -> RepositoryError {
    match RepositoryError::database_error(err) {
        RepositoryError::Conflict(_) => RepositoryError::Conflict(TYPE_CONFLICT.to_string()),
        other => other,
    }
}
