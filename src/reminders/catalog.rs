//! Template lookup seam.
//!
//! The engine asks for the tenant's active template once per occasion type;
//! `None` skips the occasion for that tenant.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::OccasionType;
use crate::models::reminder_template::Model as TemplateModel;
use crate::repositories::ReminderTemplateRepository;

#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn active_template(
        &self,
        tenant_id: Uuid,
        occasion: OccasionType,
    ) -> Result<Option<TemplateModel>, RepositoryError>;
}

#[async_trait]
impl TemplateCatalog for ReminderTemplateRepository {
    async fn active_template(
        &self,
        tenant_id: Uuid,
        occasion: OccasionType,
    ) -> Result<Option<TemplateModel>, RepositoryError> {
        self.get_active(tenant_id, occasion).await
    }
}
