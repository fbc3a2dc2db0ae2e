//! # Tenant Repository
//!
//! Tenants are created at registration and deactivated, never deleted.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::tenant::{
    ActiveModel as TenantActiveModel, Column as TenantColumn, Entity as Tenant,
    Model as TenantModel, NotificationPreferences,
};

/// Request data for creating a new tenant
#[derive(Debug, Clone)]
pub struct CreateTenantRequest {
    pub name: String,
    pub preferences: NotificationPreferences,
}

/// Repository for tenant database operations
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: Arc<DatabaseConnection>,
}

impl TenantRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create an active tenant
    pub async fn create(&self, request: CreateTenantRequest) -> Result<TenantModel, RepositoryError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(RepositoryError::validation_error("Tenant name cannot be empty"));
        }

        let prefs = request.preferences;
        let tenant = TenantActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            is_active: Set(true),
            birthday_reminders: Set(prefs.birthday_reminders),
            anniversary_reminders: Set(prefs.anniversary_reminders),
            whatsapp_notifications: Set(prefs.whatsapp_enabled),
            sms_notifications: Set(prefs.sms_enabled),
            created_at: Set(Utc::now().into()),
        };

        tenant
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, tenant_id: Uuid) -> Result<Option<TenantModel>, RepositoryError> {
        Tenant::find_by_id(tenant_id)
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Active tenants ordered by id so cycles visit them deterministically
    pub async fn list_active(&self) -> Result<Vec<TenantModel>, RepositoryError> {
        Tenant::find()
            .filter(TenantColumn::IsActive.eq(true))
            .order_by_asc(TenantColumn::Id)
            .all(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Mark a tenant inactive; its customers, templates and logs are kept.
    pub async fn deactivate(&self, tenant_id: Uuid) -> Result<TenantModel, RepositoryError> {
        let tenant = self
            .get(tenant_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Tenant not found".to_string()))?;

        let mut active = tenant.into_active_model();
        active.is_active = Set(false);

        active
            .update(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> TenantRepository {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        TenantRepository::new(Arc::new(db))
    }

    fn request(name: &str) -> CreateTenantRequest {
        CreateTenantRequest {
            name: name.to_string(),
            preferences: NotificationPreferences::default(),
        }
    }

    #[tokio::test]
    async fn deactivated_tenants_are_not_listed() {
        let repo = setup().await;
        let kept = repo.create(request("Kept Salon")).await.unwrap();
        let gone = repo.create(request("Closed Salon")).await.unwrap();

        repo.deactivate(gone.id).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.id);
        assert!(!repo.get(gone.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let repo = setup().await;
        let err = repo.create(request("   ")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn preferences_round_trip_through_model() {
        let repo = setup().await;
        let prefs = NotificationPreferences {
            anniversary_reminders: false,
            whatsapp_enabled: false,
            ..Default::default()
        };
        let tenant = repo
            .create(CreateTenantRequest {
                name: "Quiet Salon".to_string(),
                preferences: prefs,
            })
            .await
            .unwrap();

        assert_eq!(tenant.preferences(), prefs);
    }
}
