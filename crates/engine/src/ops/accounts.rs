use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};

use crate::{
    Account, EngineError, NewAccount, ResultEngine, accounts, store::AccountLookup,
    util::require_user,
};

use super::Engine;

impl Engine {
    /// Opens an account for a tenant.
    pub async fn new_account(
        &self,
        tenant_id: Uuid,
        user_id: &str,
        account: &NewAccount,
    ) -> ResultEngine<Account> {
        let user_id = require_user(user_id)?;
        let valid = account.validate()?;
        self.tenant(tenant_id).await?;

        let now = Utc::now();
        let model = accounts::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            tenant_id: ActiveValue::Set(tenant_id),
            name: ActiveValue::Set(valid.name),
            initial_balance_minor: ActiveValue::Set(valid.initial_balance.cents()),
            currency: ActiveValue::Set(valid.currency.code().to_string()),
            color: ActiveValue::Set(valid.color),
            icon: ActiveValue::Set(valid.icon),
            kind: ActiveValue::Set(valid.kind.as_str().to_string()),
            created_at: ActiveValue::Set(now),
            created_by: ActiveValue::Set(user_id.to_string()),
            updated_at: ActiveValue::Set(now),
            updated_by: ActiveValue::Set(user_id.to_string()),
            deactivated_at: ActiveValue::Set(None),
            deactivated_by: ActiveValue::Set(None),
        }
        .insert(&self.database)
        .await?;
        tracing::info!("created account {} for tenant {}", model.id, tenant_id);
        Account::try_from(model)
    }

    /// Replaces the editable fields of an account. The input is validated
    /// like a new account.
    pub async fn update_account(
        &self,
        tenant_id: Uuid,
        user_id: &str,
        account_id: Uuid,
        account: &NewAccount,
    ) -> ResultEngine<Account> {
        let user_id = require_user(user_id)?;
        let valid = account.validate()?;
        let model = self.active_account_model(tenant_id, account_id).await?;

        let mut active: accounts::ActiveModel = model.into();
        active.name = ActiveValue::Set(valid.name);
        active.initial_balance_minor = ActiveValue::Set(valid.initial_balance.cents());
        active.currency = ActiveValue::Set(valid.currency.code().to_string());
        active.color = ActiveValue::Set(valid.color);
        active.icon = ActiveValue::Set(valid.icon);
        active.kind = ActiveValue::Set(valid.kind.as_str().to_string());
        active.updated_at = ActiveValue::Set(Utc::now());
        active.updated_by = ActiveValue::Set(user_id.to_string());
        let model = active.update(&self.database).await?;
        tracing::info!("updated account {} for tenant {}", account_id, tenant_id);
        Account::try_from(model)
    }

    /// Returns an active account of the tenant.
    pub async fn account(&self, tenant_id: Uuid, account_id: Uuid) -> ResultEngine<Account> {
        self.find_account(tenant_id, account_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {account_id}")))
    }

    /// Active accounts of the tenant, by name.
    pub async fn list_accounts(&self, tenant_id: Uuid) -> ResultEngine<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id))
            .filter(accounts::Column::DeactivatedAt.is_null())
            .order_by_asc(accounts::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    /// Soft-deletes an account. Its transactions are kept.
    pub async fn delete_account(
        &self,
        tenant_id: Uuid,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        let user_id = require_user(user_id)?;
        let model = self.active_account_model(tenant_id, account_id).await?;

        let now = Utc::now();
        let mut active: accounts::ActiveModel = model.into();
        active.deactivated_at = ActiveValue::Set(Some(now));
        active.deactivated_by = ActiveValue::Set(Some(user_id.to_string()));
        active.updated_at = ActiveValue::Set(now);
        active.updated_by = ActiveValue::Set(user_id.to_string());
        active.update(&self.database).await?;
        tracing::info!("deleted account {} for tenant {}", account_id, tenant_id);
        Ok(())
    }

    async fn find_account(
        &self,
        tenant_id: Uuid,
        account_id: Uuid,
    ) -> ResultEngine<Option<Account>> {
        accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::TenantId.eq(tenant_id))
            .filter(accounts::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn active_account_model(
        &self,
        tenant_id: Uuid,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::TenantId.eq(tenant_id))
            .filter(accounts::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {account_id}")))
    }
}

impl AccountLookup for Engine {
    async fn get_account(&self, tenant_id: Uuid, account_id: Uuid) -> ResultEngine<Option<Account>> {
        self.find_account(tenant_id, account_id).await
    }
}
