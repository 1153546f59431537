//! Tenant memberships and credit-card details.
//!
//! - `tenant_memberships`: which users may act inside a tenant
//! - `credit_card_info`: card data of `credit_card` accounts, at most one
//!   active row per account

use sea_orm_migration::prelude::*;

use crate::m20260201_000000_init::{Accounts, Tenants};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum TenantMemberships {
    Table,
    TenantId,
    UserId,
    CreatedAt,
    UpdatedAt,
    DeactivatedAt,
}

#[derive(Iden)]
enum CreditCardInfo {
    Table,
    Id,
    AccountId,
    LastFour,
    Name,
    Brand,
    ClosingDate,
    DueDate,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeactivatedAt,
    DeactivatedBy,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TenantMemberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TenantMemberships::TenantId)
                            .blob()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TenantMemberships::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TenantMemberships::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TenantMemberships::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TenantMemberships::DeactivatedAt).timestamp())
                    .primary_key(
                        Index::create()
                            .col(TenantMemberships::TenantId)
                            .col(TenantMemberships::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tenant_memberships-tenant_id")
                            .from(TenantMemberships::Table, TenantMemberships::TenantId)
                            .to(Tenants::Table, Tenants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tenant_memberships-user_id")
                    .table(TenantMemberships::Table)
                    .col(TenantMemberships::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditCardInfo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditCardInfo::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CreditCardInfo::AccountId).blob().not_null())
                    .col(
                        ColumnDef::new(CreditCardInfo::LastFour)
                            .string_len(4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditCardInfo::Name).string().not_null())
                    .col(ColumnDef::new(CreditCardInfo::Brand).string().not_null())
                    .col(
                        ColumnDef::new(CreditCardInfo::ClosingDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditCardInfo::DueDate).timestamp().not_null())
                    .col(
                        ColumnDef::new(CreditCardInfo::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditCardInfo::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(CreditCardInfo::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditCardInfo::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(CreditCardInfo::DeactivatedAt).timestamp())
                    .col(ColumnDef::new(CreditCardInfo::DeactivatedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-credit_card_info-account_id")
                            .from(CreditCardInfo::Table, CreditCardInfo::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-credit_card_info-account_id")
                    .table(CreditCardInfo::Table)
                    .col(CreditCardInfo::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditCardInfo::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TenantMemberships::Table).to_owned())
            .await?;
        Ok(())
    }
}
