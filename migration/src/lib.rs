//! Database migrations for the reminder service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_01_01_000001_create_tenants;
mod m2025_11_01_102700_create_customers;
mod m2025_11_01_102800_create_reminder_templates;
mod m2025_11_01_103000_create_reminder_logs;
mod m2025_11_03_000100_add_active_template_unique_guard;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_01_01_000001_create_tenants::Migration),
            Box::new(m2025_11_01_102700_create_customers::Migration),
            Box::new(m2025_11_01_102800_create_reminder_templates::Migration),
            Box::new(m2025_11_01_103000_create_reminder_logs::Migration),
            Box::new(m2025_11_03_000100_add_active_template_unique_guard::Migration),
        ]
    }
}
