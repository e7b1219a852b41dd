//! Migration: Create the append-only audit_logs table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::AdminUsername).string().not_null())
                    .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                    .col(ColumnDef::new(AuditLogs::ResourceType).string().not_null())
                    .col(ColumnDef::new(AuditLogs::ResourceId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::TargetUserId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::Details).text().null())
                    .col(ColumnDef::new(AuditLogs::IpAddress).string().null())
                    .col(ColumnDef::new(AuditLogs::UserAgent).string().null())
                    .col(ColumnDef::new(AuditLogs::SessionId).string().null())
                    .col(ColumnDef::new(AuditLogs::Success).boolean().not_null())
                    .col(ColumnDef::new(AuditLogs::ErrorMessage).text().null())
                    .col(ColumnDef::new(AuditLogs::Severity).string_len(16).not_null())
                    .col(
                        ColumnDef::new(AuditLogs::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(*name)
                        .table(AuditLogs::Table)
                        .col(*column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).if_exists().to_owned())
            .await
    }
}

const INDEXES: &[(&str, AuditLogs)] = &[
    ("idx_audit_logs_admin_username", AuditLogs::AdminUsername),
    ("idx_audit_logs_timestamp", AuditLogs::Timestamp),
    ("idx_audit_logs_action", AuditLogs::Action),
    ("idx_audit_logs_severity", AuditLogs::Severity),
];

#[derive(Iden, Clone, Copy)]
enum AuditLogs {
    Table,
    Id,
    AdminUsername,
    Action,
    ResourceType,
    ResourceId,
    TargetUserId,
    Details,
    IpAddress,
    UserAgent,
    SessionId,
    Success,
    ErrorMessage,
    Severity,
    Timestamp,
}
