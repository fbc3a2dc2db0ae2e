//! # Customer Repository
//!
//! Read access for the reminder cycle plus the minimal writes used when
//! provisioning customers.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::customer::{
    ActiveModel as CustomerActiveModel, Column as CustomerColumn, Entity as Customer,
    Model as CustomerModel,
};
use crate::models::OccasionType;

#[derive(Debug, Clone)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub anniversary: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    db: Arc<DatabaseConnection>,
}

impl CustomerRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        request: CreateCustomerRequest,
    ) -> Result<CustomerModel, RepositoryError> {
        let name = request.name.trim();
        let phone = request.phone.trim();
        if name.is_empty() {
            return Err(RepositoryError::validation_error("Customer name cannot be empty"));
        }
        if phone.is_empty() {
            return Err(RepositoryError::validation_error("Customer phone cannot be empty"));
        }

        let now = Utc::now();
        let customer = CustomerActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(name.to_string()),
            phone: Set(phone.to_string()),
            email: Set(request.email),
            birthday: Set(request.birthday),
            anniversary: Set(request.anniversary),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        customer
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Active customers of `tenant_id` that have a date stored for `occasion`,
    /// ordered by customer id. Window filtering happens in the caller.
    pub async fn list_with_occasion(
        &self,
        tenant_id: Uuid,
        occasion: OccasionType,
    ) -> Result<Vec<CustomerModel>, RepositoryError> {
        Customer::find()
            .filter(CustomerColumn::TenantId.eq(tenant_id))
            .filter(CustomerColumn::IsActive.eq(true))
            .filter(occasion.customer_column().is_not_null())
            .order_by_asc(CustomerColumn::Id)
            .all(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Soft-delete a customer.
    pub async fn deactivate(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
    ) -> Result<CustomerModel, RepositoryError> {
        let customer = Customer::find_by_id(customer_id)
            .filter(CustomerColumn::TenantId.eq(tenant_id))
            .one(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::NotFound("Customer not found".to_string()))?;

        let mut active = customer.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db.as_ref())
            .await
            .map_err(RepositoryError::database_error)
    }
}
