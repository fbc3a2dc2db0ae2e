//! Tenant entity model
//!
//! A tenant is one salon. Tenants are deactivated rather than deleted while
//! customers, templates or ledger rows reference them.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::occasion::{Channel, OccasionType};

/// Tenant entity representing multi-tenant isolation
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name of the salon
    pub name: String,

    /// Inactive tenants are ignored by the reminder cycle
    pub is_active: bool,

    /// Send birthday reminders for this tenant
    pub birthday_reminders: bool,

    /// Send anniversary reminders for this tenant
    pub anniversary_reminders: bool,

    /// Allow the WhatsApp channel
    pub whatsapp_notifications: bool,

    /// Allow the plain SMS channel
    pub sms_notifications: bool,

    /// Timestamp when the tenant was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::customer::Entity")]
    Customer,
    #[sea_orm(has_many = "super::reminder_template::Entity")]
    ReminderTemplate,
    #[sea_orm(has_many = "super::reminder_log::Entity")]
    ReminderLog,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::reminder_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReminderTemplate.def()
    }
}

impl Related<super::reminder_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReminderLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Notification preferences as a plain value for the pipeline.
    pub fn preferences(&self) -> NotificationPreferences {
        NotificationPreferences {
            birthday_reminders: self.birthday_reminders,
            anniversary_reminders: self.anniversary_reminders,
            whatsapp_enabled: self.whatsapp_notifications,
            sms_enabled: self.sms_notifications,
        }
    }
}

/// Per-tenant switches consulted by the reminder cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPreferences {
    pub birthday_reminders: bool,
    pub anniversary_reminders: bool,
    pub whatsapp_enabled: bool,
    pub sms_enabled: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            birthday_reminders: true,
            anniversary_reminders: true,
            whatsapp_enabled: true,
            sms_enabled: true,
        }
    }
}

impl NotificationPreferences {
    pub fn occasion_enabled(&self, occasion: OccasionType) -> bool {
        match occasion {
            OccasionType::Birthday => self.birthday_reminders,
            OccasionType::Anniversary => self.anniversary_reminders,
        }
    }

    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Sms => self.sms_enabled,
            Channel::WhatsApp => self.whatsapp_enabled,
        }
    }
}
