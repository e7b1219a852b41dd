//! Migration: Create the four account partitions.
//!
//! Username and email are unique per table only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [Account::Customers, Account::Admins, Account::Staff] {
            manager.create_table(account_table(table)).await?;
        }

        manager
            .create_table(
                account_table(Account::Artists)
                    .col(ColumnDef::new(Account::ArtistName).string().null())
                    .col(ColumnDef::new(Account::PhotoUrl).string().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Account::Artists,
            Account::Staff,
            Account::Admins,
            Account::Customers,
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

/// Columns shared by every account table.
fn account_table(table: Account) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(Account::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(Account::Username).string().not_null().unique_key())
        .col(ColumnDef::new(Account::Email).string().not_null().unique_key())
        .col(ColumnDef::new(Account::PasswordHash).string().not_null())
        .col(ColumnDef::new(Account::FirstName).string().null())
        .col(ColumnDef::new(Account::LastName).string().null())
        .col(
            ColumnDef::new(Account::Enabled)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(Account::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned()
}

#[derive(Iden, Clone, Copy)]
enum Account {
    Customers,
    Artists,
    Admins,
    Staff,
    Id,
    Username,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    ArtistName,
    PhotoUrl,
    Enabled,
    CreatedAt,
}
