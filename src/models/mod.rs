//! # Data Models
//!
//! SeaORM entities for tenants, customers, reminder templates and the
//! reminder ledger, plus the small enums shared by the reminder pipeline.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod customer;
pub mod occasion;
pub mod reminder_log;
pub mod reminder_template;
pub mod tenant;

pub use customer::Entity as Customer;
pub use occasion::{Channel, DeliveryStatus, OccasionType};
pub use reminder_log::Entity as ReminderLog;
pub use reminder_template::Entity as ReminderTemplate;
pub use tenant::Entity as Tenant;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "salon-reminders".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
