//! Initial schema migration.
//!
//! Creates the complete schema for fintrack:
//!
//! - `tenants`: isolated workspaces
//! - `accounts`: where money lives (bank, cash, credit card, ...)
//! - `categories`: transaction classification, optionally nested
//! - `tags`: free labels attached to transactions
//! - `transactions`: financial movements, installment siblings point at their parent
//! - `transaction_tags`: transaction ↔ tag links
//!
//! Identifiers are UUIDs stored as blobs. Nothing is ever hard-deleted: rows
//! carry `deactivated_at`/`deactivated_by` instead.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
pub(crate) enum Tenants {
    Table,
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
    DeactivatedAt,
}

#[derive(Iden)]
pub(crate) enum Accounts {
    Table,
    Id,
    TenantId,
    Name,
    InitialBalanceMinor,
    Currency,
    Color,
    Icon,
    Kind,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeactivatedAt,
    DeactivatedBy,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    TenantId,
    ParentCategoryId,
    Name,
    Kind,
    Color,
    Icon,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeactivatedAt,
    DeactivatedBy,
}

#[derive(Iden)]
enum Tags {
    Table,
    Id,
    TenantId,
    Name,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeactivatedAt,
    DeactivatedBy,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    ParentTransactionId,
    TenantId,
    FromAccountId,
    ToAccountId,
    AmountMinor,
    Currency,
    AccrualMonth,
    Kind,
    CategoryId,
    Comments,
    DueDate,
    PaymentDate,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeactivatedAt,
    DeactivatedBy,
}

#[derive(Iden)]
enum TransactionTags {
    Table,
    TransactionId,
    TagId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ─────────────────────────────────────────────────────────────────────
        // tenants
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenants::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Tenants::Name).string().not_null())
                    .col(ColumnDef::new(Tenants::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Tenants::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Tenants::DeactivatedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // accounts
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::TenantId).blob().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::InitialBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::Currency).string().not_null())
                    .col(ColumnDef::new(Accounts::Color).string().not_null())
                    .col(ColumnDef::new(Accounts::Icon).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string().not_null())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Accounts::DeactivatedAt).timestamp())
                    .col(ColumnDef::new(Accounts::DeactivatedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-tenant_id")
                            .from(Accounts::Table, Accounts::TenantId)
                            .to(Tenants::Table, Tenants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-tenant_id")
                    .table(Accounts::Table)
                    .col(Accounts::TenantId)
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // categories
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::TenantId).blob().not_null())
                    .col(ColumnDef::new(Categories::ParentCategoryId).blob())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .col(ColumnDef::new(Categories::Color).string().not_null())
                    .col(ColumnDef::new(Categories::Icon).string().not_null())
                    .col(ColumnDef::new(Categories::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Categories::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Categories::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Categories::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Categories::DeactivatedAt).timestamp())
                    .col(ColumnDef::new(Categories::DeactivatedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-tenant_id")
                            .from(Categories::Table, Categories::TenantId)
                            .to(Tenants::Table, Tenants::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-parent_category_id")
                            .from(Categories::Table, Categories::ParentCategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-tenant_id")
                    .table(Categories::Table)
                    .col(Categories::TenantId)
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // tags
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tags::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Tags::TenantId).blob().not_null())
                    .col(ColumnDef::new(Tags::Name).string().not_null())
                    .col(ColumnDef::new(Tags::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Tags::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Tags::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Tags::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Tags::DeactivatedAt).timestamp())
                    .col(ColumnDef::new(Tags::DeactivatedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tags-tenant_id")
                            .from(Tags::Table, Tags::TenantId)
                            .to(Tenants::Table, Tenants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tags-tenant_id")
                    .table(Tags::Table)
                    .col(Tags::TenantId)
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // transactions
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::ParentTransactionId).blob())
                    .col(ColumnDef::new(Transactions::TenantId).blob().not_null())
                    .col(ColumnDef::new(Transactions::FromAccountId).blob().not_null())
                    .col(ColumnDef::new(Transactions::ToAccountId).blob())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AccrualMonth)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).blob().not_null())
                    .col(ColumnDef::new(Transactions::Comments).string())
                    .col(ColumnDef::new(Transactions::DueDate).timestamp().not_null())
                    .col(ColumnDef::new(Transactions::PaymentDate).timestamp())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Transactions::DeactivatedAt).timestamp())
                    .col(ColumnDef::new(Transactions::DeactivatedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-tenant_id")
                            .from(Transactions::Table, Transactions::TenantId)
                            .to(Tenants::Table, Tenants::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-from_account_id")
                            .from(Transactions::Table, Transactions::FromAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-to_account_id")
                            .from(Transactions::Table, Transactions::ToAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-parent_transaction_id")
                            .from(Transactions::Table, Transactions::ParentTransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-tenant_id-accrual_month")
                    .table(Transactions::Table)
                    .col(Transactions::TenantId)
                    .col(Transactions::AccrualMonth)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-parent_transaction_id")
                    .table(Transactions::Table)
                    .col(Transactions::ParentTransactionId)
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // transaction_tags
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(TransactionTags::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionTags::TransactionId)
                            .blob()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionTags::TagId).blob().not_null())
                    .primary_key(
                        Index::create()
                            .col(TransactionTags::TransactionId)
                            .col(TransactionTags::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_tags-transaction_id")
                            .from(TransactionTags::Table, TransactionTags::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_tags-tag_id")
                            .from(TransactionTags::Table, TransactionTags::TagId)
                            .to(Tags::Table, Tags::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransactionTags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await?;
        Ok(())
    }
}
