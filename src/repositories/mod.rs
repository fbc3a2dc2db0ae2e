//! # Repository Layer
//!
//! SeaORM-backed data access for tenants, customers, templates and the
//! delivery ledger. Every tenant-owned query filters on `tenant_id`.

pub mod customer;
pub mod reminder_log;
pub mod reminder_template;
pub mod tenant;

pub use customer::CustomerRepository;
pub use reminder_log::ReminderLogRepository;
pub use reminder_template::ReminderTemplateRepository;
pub use tenant::TenantRepository;
