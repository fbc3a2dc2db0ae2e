//! Test utilities for database and gateway testing.
//!
//! In-memory SQLite databases with migrations applied, fixture helpers for
//! tenants, customers and templates, and scriptable gateway/ledger fakes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};
use uuid::Uuid;

use reminders::error::RepositoryError;
use reminders::gateway::{
    GatewayError, MessagingGateway, OutboundMessage, SendReceipt, SenderIdentities,
};
use reminders::models::OccasionType;
use reminders::models::customer::Model as CustomerModel;
use reminders::models::reminder_log::Model as ReminderLogModel;
use reminders::models::reminder_template::Model as TemplateModel;
use reminders::models::tenant::NotificationPreferences;
use reminders::reminders::{CycleSettings, DeliveryLedger, ReminderService, TemplateCatalog};
use reminders::repositories::customer::CreateCustomerRequest;
use reminders::repositories::reminder_log::NewReminderLog;
use reminders::repositories::reminder_template::CreateTemplateRequest;
use reminders::repositories::tenant::CreateTenantRequest;
use reminders::repositories::{
    CustomerRepository, ReminderLogRepository, ReminderTemplateRepository, TenantRepository,
};

pub const SMS_FROM: &str = "+15550000001";
pub const WHATSAPP_FROM: &str = "+15550000002";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Sets up an in-memory SQLite database and returns it behind an Arc.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[allow(dead_code)]
pub fn senders() -> SenderIdentities {
    SenderIdentities {
        sms_from: Some(SMS_FROM.to_string()),
        whatsapp_from: Some(WHATSAPP_FROM.to_string()),
    }
}

/// Creates an active tenant with the given preferences.
#[allow(dead_code)]
pub async fn create_test_tenant(
    db: &Arc<DatabaseConnection>,
    preferences: NotificationPreferences,
) -> Result<Uuid> {
    let tenant = TenantRepository::new(db.clone())
        .create(CreateTenantRequest {
            name: "Test Salon".to_string(),
            preferences,
        })
        .await?;
    Ok(tenant.id)
}

/// Creates an active customer.
#[allow(dead_code)]
pub async fn create_test_customer(
    db: &Arc<DatabaseConnection>,
    tenant_id: Uuid,
    name: &str,
    phone: &str,
    birthday: Option<NaiveDate>,
    anniversary: Option<NaiveDate>,
) -> Result<CustomerModel> {
    let customer = CustomerRepository::new(db.clone())
        .create(
            tenant_id,
            CreateCustomerRequest {
                name: name.to_string(),
                phone: phone.to_string(),
                email: None,
                birthday,
                anniversary,
            },
        )
        .await?;
    Ok(customer)
}

/// Creates an active template for `occasion`.
#[allow(dead_code)]
pub async fn create_test_template(
    db: &Arc<DatabaseConnection>,
    tenant_id: Uuid,
    occasion: OccasionType,
    message: &str,
) -> Result<TemplateModel> {
    let template = ReminderTemplateRepository::new(db.clone())
        .create(
            tenant_id,
            CreateTemplateRequest {
                occasion_type: occasion,
                message: message.to_string(),
                is_active: true,
            },
        )
        .await?;
    Ok(template)
}

/// All ledger rows for a tenant, newest first.
#[allow(dead_code)]
pub async fn ledger_rows(db: &Arc<DatabaseConnection>, tenant_id: Uuid) -> Vec<ReminderLogModel> {
    ReminderLogRepository::new(db.clone())
        .list_by_tenant(tenant_id, 1_000)
        .await
        .unwrap()
}

#[allow(dead_code)]
pub fn build_service(
    db: &Arc<DatabaseConnection>,
    gateway: Arc<dyn MessagingGateway>,
    settings: CycleSettings,
) -> ReminderService {
    ReminderService::new(db.clone(), gateway, senders(), settings)
}

/// Gateway fake that records every message and can be scripted per
/// destination address.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeGateway {
    sent: Mutex<Vec<OutboundMessage>>,
    failures: HashMap<String, GatewayError>,
    delay: Option<Duration>,
    omit_sid: bool,
}

#[allow(dead_code)]
impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send addressed to `to` (including the channel prefix).
    pub fn failing_for(mut self, to: &str, error: GatewayError) -> Self {
        self.failures.insert(to.to_string(), error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn without_sid(mut self) -> Self {
        self.omit_sid = true;
        self
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingGateway for FakeGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, GatewayError> {
        let n = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            sent.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.get(&message.to) {
            return Err(error.clone());
        }

        Ok(SendReceipt {
            message_sid: (!self.omit_sid).then(|| format!("SM{n:032}")),
        })
    }
}

/// Ledger whose writes always fail; lookups report nothing sent.
#[allow(dead_code)]
#[derive(Default)]
pub struct FailingLedger {
    pub attempts: Mutex<usize>,
}

#[async_trait]
impl DeliveryLedger for FailingLedger {
    async fn record(&self, _entry: NewReminderLog) -> Result<(), RepositoryError> {
        *self.attempts.lock().unwrap() += 1;
        Err(RepositoryError::Database(DbErr::Custom("disk I/O error".to_string())))
    }

    async fn has_sent(
        &self,
        _tenant_id: Uuid,
        _customer_id: Uuid,
        _occasion: OccasionType,
        _occasion_date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        Ok(false)
    }
}

/// Ledger whose duplicate lookups fail.
#[allow(dead_code)]
#[derive(Default)]
pub struct UnreadableLedger;

#[async_trait]
impl DeliveryLedger for UnreadableLedger {
    async fn record(&self, _entry: NewReminderLog) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn has_sent(
        &self,
        _tenant_id: Uuid,
        _customer_id: Uuid,
        _occasion: OccasionType,
        _occasion_date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Database(DbErr::Custom("connection reset".to_string())))
    }
}

/// Template source that reads the database but fails lookups for chosen
/// tenant/occasion pairs.
#[allow(dead_code)]
pub struct BrokenTemplates {
    inner: ReminderTemplateRepository,
    failing: Vec<(Uuid, OccasionType)>,
}

#[allow(dead_code)]
impl BrokenTemplates {
    pub fn new(db: &Arc<DatabaseConnection>) -> Self {
        Self {
            inner: ReminderTemplateRepository::new(db.clone()),
            failing: Vec::new(),
        }
    }

    pub fn failing_for(mut self, tenant_id: Uuid, occasion: OccasionType) -> Self {
        self.failing.push((tenant_id, occasion));
        self
    }
}

#[async_trait]
impl TemplateCatalog for BrokenTemplates {
    async fn active_template(
        &self,
        tenant_id: Uuid,
        occasion: OccasionType,
    ) -> Result<Option<TemplateModel>, RepositoryError> {
        if self.failing.contains(&(tenant_id, occasion)) {
            return Err(RepositoryError::Database(DbErr::Custom(
                "database is locked".to_string(),
            )));
        }
        self.inner.get_active(tenant_id, occasion).await
    }
}
