//! Delivery ledger seam.
//!
//! The engine appends one entry per dispatch attempt and consults the ledger
//! before sending so that an occurrence already delivered is not sent again.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::OccasionType;
use crate::repositories::ReminderLogRepository;
use crate::repositories::reminder_log::NewReminderLog;

#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// Append one entry. Entries are never updated afterwards.
    async fn record(&self, entry: NewReminderLog) -> Result<(), RepositoryError>;

    /// Whether a `sent` entry exists for this occurrence.
    async fn has_sent(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        occasion: OccasionType,
        occasion_date: NaiveDate,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
impl DeliveryLedger for ReminderLogRepository {
    async fn record(&self, entry: NewReminderLog) -> Result<(), RepositoryError> {
        self.append(entry).await.map(|_| ())
    }

    async fn has_sent(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        occasion: OccasionType,
        occasion_date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        ReminderLogRepository::has_sent(self, tenant_id, customer_id, occasion, occasion_date).await
    }
}
