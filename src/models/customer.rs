//! Customer entity model
//!
//! Customers belong to exactly one tenant and are soft-deleted through
//! `is_active`.

use chrono::NaiveDate;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::occasion::OccasionType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: Uuid,

    /// Display name substituted into reminder templates
    pub name: String,

    /// Contact address; a leading `+` marks international format
    pub phone: String,

    pub email: Option<String>,

    pub birthday: Option<Date>,

    pub anniversary: Option<Date>,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The stored date for the given occasion, if any.
    pub fn occasion_date(&self, occasion: OccasionType) -> Option<NaiveDate> {
        match occasion {
            OccasionType::Birthday => self.birthday,
            OccasionType::Anniversary => self.anniversary,
        }
    }
}

impl OccasionType {
    /// Customer column holding this occasion's date.
    pub fn customer_column(&self) -> Column {
        match self {
            OccasionType::Birthday => Column::Birthday,
            OccasionType::Anniversary => Column::Anniversary,
        }
    }
}
