//! Migration to create the reminder_logs table.
//!
//! Rows are append-only: one per dispatch attempt. The lookup index covers the
//! has-already-been-sent check performed before each dispatch.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReminderLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReminderLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ReminderLogs::TenantId).uuid().not_null())
                    .col(ColumnDef::new(ReminderLogs::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(ReminderLogs::TemplateId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReminderLogs::OccasionType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReminderLogs::OccasionDate).date().not_null())
                    .col(ColumnDef::new(ReminderLogs::Message).text().not_null())
                    .col(ColumnDef::new(ReminderLogs::Channel).string_len(20).not_null())
                    .col(ColumnDef::new(ReminderLogs::Status).string_len(20).not_null())
                    .col(ColumnDef::new(ReminderLogs::ErrorMessage).text().null())
                    .col(ColumnDef::new(ReminderLogs::MessageSid).text().null())
                    .col(
                        ColumnDef::new(ReminderLogs::SentAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reminder_logs_tenant_id")
                            .from(ReminderLogs::Table, ReminderLogs::TenantId)
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
                    .name("idx_reminder_logs_occasion_lookup")
                    .table(ReminderLogs::Table)
                    .col(ReminderLogs::TenantId)
                    .col(ReminderLogs::CustomerId)
                    .col(ReminderLogs::OccasionType)
                    .col(ReminderLogs::OccasionDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reminder_logs_tenant_sent_at")
                    .table(ReminderLogs::Table)
                    .col(ReminderLogs::TenantId)
                    .col(ReminderLogs::SentAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReminderLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReminderLogs {
    Table,
    Id,
    TenantId,
    CustomerId,
    TemplateId,
    OccasionType,
    OccasionDate,
    Message,
    Channel,
    Status,
    ErrorMessage,
    MessageSid,
    SentAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
