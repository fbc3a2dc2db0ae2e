//! # Reminder Log Repository
//!
//! Append-only access to the delivery ledger. There is deliberately no
//! update or delete here.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::reminder_log::{
    ActiveModel as ReminderLogActiveModel, Column as ReminderLogColumn, Entity as ReminderLog,
    Model as ReminderLogModel,
};
use crate::models::{Channel, DeliveryStatus, OccasionType};

/// One dispatch attempt, ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminderLog {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub template_id: Uuid,
    pub occasion_type: OccasionType,
    pub occasion_date: NaiveDate,
    pub message: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub message_sid: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReminderLogRepository {
    db: Arc<DatabaseConnection>,
}

impl ReminderLogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn append(&self, entry: NewReminderLog) -> Result<ReminderLogModel, RepositoryError> {
        let row = ReminderLogActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(entry.tenant_id),
            customer_id: Set(entry.customer_id),
            template_id: Set(entry.template_id),
            occasion_type: Set(entry.occasion_type.as_str().to_string()),
            occasion_date: Set(entry.occasion_date),
            message: Set(entry.message),
            channel: Set(entry.channel.as_str().to_string()),
            status: Set(entry.status.as_str().to_string()),
            error_message: Set(entry.error_message),
            message_sid: Set(entry.message_sid),
            sent_at: Set(entry.sent_at.into()),
        };

        row.insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Whether a successful send already exists for this occurrence.
    pub async fn has_sent(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        occasion: OccasionType,
        occasion_date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let count = ReminderLog::find()
            .filter(ReminderLogColumn::TenantId.eq(tenant_id))
            .filter(ReminderLogColumn::CustomerId.eq(customer_id))
            .filter(ReminderLogColumn::OccasionType.eq(occasion.as_str()))
            .filter(ReminderLogColumn::OccasionDate.eq(occasion_date))
            .filter(ReminderLogColumn::Status.eq(DeliveryStatus::Sent.as_str()))
            .count(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(count > 0)
    }

    /// Newest entries first.
    pub async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ReminderLogModel>, RepositoryError> {
        ReminderLog::find()
            .filter(ReminderLogColumn::TenantId.eq(tenant_id))
            .order_by_desc(ReminderLogColumn::SentAt)
            .order_by_desc(ReminderLogColumn::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tenant::NotificationPreferences;
    use crate::repositories::tenant::{CreateTenantRequest, TenantRepository};
    use chrono::Duration;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> (ReminderLogRepository, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let db = Arc::new(db);
        let tenant = TenantRepository::new(db.clone())
            .create(CreateTenantRequest {
                name: "Salon".to_string(),
                preferences: NotificationPreferences::default(),
            })
            .await
            .unwrap();
        (ReminderLogRepository::new(db), tenant.id)
    }

    fn entry(tenant_id: Uuid, customer_id: Uuid, status: DeliveryStatus) -> NewReminderLog {
        NewReminderLog {
            tenant_id,
            customer_id,
            template_id: Uuid::new_v4(),
            occasion_type: OccasionType::Birthday,
            occasion_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            message: "Happy birthday Ana!".to_string(),
            channel: Channel::WhatsApp,
            status,
            error_message: None,
            message_sid: None,
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn only_sent_entries_count_as_sent() {
        let (repo, tenant_id) = setup().await;
        let customer_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        repo.append(NewReminderLog {
            error_message: Some("unreachable".to_string()),
            ..entry(tenant_id, customer_id, DeliveryStatus::Failed)
        })
        .await
        .unwrap();
        assert!(!repo
            .has_sent(tenant_id, customer_id, OccasionType::Birthday, date)
            .await
            .unwrap());

        repo.append(entry(tenant_id, customer_id, DeliveryStatus::Sent))
            .await
            .unwrap();
        assert!(repo
            .has_sent(tenant_id, customer_id, OccasionType::Birthday, date)
            .await
            .unwrap());

        // A different occurrence of the same occasion is not covered
        let next_year = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert!(!repo
            .has_sent(tenant_id, customer_id, OccasionType::Birthday, next_year)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn lists_newest_first_with_limit() {
        let (repo, tenant_id) = setup().await;
        let now = Utc::now();

        for offset in 0..3 {
            repo.append(NewReminderLog {
                sent_at: now - Duration::minutes(offset),
                ..entry(tenant_id, Uuid::new_v4(), DeliveryStatus::Sent)
            })
            .await
            .unwrap();
        }

        let rows = repo.list_by_tenant(tenant_id, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].sent_at >= rows[1].sent_at);
        assert!(repo.list_by_tenant(Uuid::new_v4(), 10).await.unwrap().is_empty());
    }
}
