//! Migration to create the reminder_templates table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReminderTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReminderTemplates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReminderTemplates::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReminderTemplates::OccasionType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReminderTemplates::Message).text().not_null())
                    .col(
                        ColumnDef::new(ReminderTemplates::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ReminderTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ReminderTemplates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reminder_templates_tenant_id")
                            .from(ReminderTemplates::Table, ReminderTemplates::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reminder_templates_tenant_type")
                    .table(ReminderTemplates::Table)
                    .col(ReminderTemplates::TenantId)
                    .col(ReminderTemplates::OccasionType)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReminderTemplates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReminderTemplates {
    Table,
    Id,
    TenantId,
    OccasionType,
    Message,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
