use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, Tenant, TenantMembership, tenant_memberships, tenants,
    util::{normalize_required_name, require_user},
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a tenant and registers `creator_id` as its first member.
    pub async fn new_tenant(&self, name: &str, creator_id: &str) -> ResultEngine<Tenant> {
        let creator_id = require_user(creator_id)?;
        let name = normalize_required_name(name, "tenant")?;
        let now = Utc::now();
        let tenant = tenants::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(name),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            deactivated_at: ActiveValue::Set(None),
        };

        let model = with_tx!(self, |db_tx| {
            let model = tenant.insert(&db_tx).await?;
            tenant_memberships::ActiveModel {
                tenant_id: ActiveValue::Set(model.id),
                user_id: ActiveValue::Set(creator_id.to_string()),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                deactivated_at: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;
            Ok::<_, EngineError>(model)
        })?;
        tracing::info!("created tenant {} for {}", model.id, creator_id);
        Ok(Tenant::from(model))
    }

    /// Returns an active tenant.
    pub async fn tenant(&self, tenant_id: Uuid) -> ResultEngine<Tenant> {
        tenants::Entity::find_by_id(tenant_id)
            .filter(tenants::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .map(Tenant::from)
            .ok_or_else(|| EngineError::KeyNotFound(format!("tenant {tenant_id}")))
    }

    /// Grants `user_id` access to a tenant. Adding an existing member is a
    /// no-op; a removed member is reactivated.
    pub async fn add_tenant_member(
        &self,
        tenant_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<TenantMembership> {
        let user_id = require_user(user_id)?;
        self.tenant(tenant_id).await?;

        let now = Utc::now();
        let model = match tenant_memberships::Entity::find_by_id((tenant_id, user_id.to_string()))
            .one(&self.database)
            .await?
        {
            Some(model) if model.deactivated_at.is_none() => model,
            Some(model) => {
                let mut active: tenant_memberships::ActiveModel = model.into();
                active.deactivated_at = ActiveValue::Set(None);
                active.updated_at = ActiveValue::Set(now);
                active.update(&self.database).await?
            }
            None => {
                tenant_memberships::ActiveModel {
                    tenant_id: ActiveValue::Set(tenant_id),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                    deactivated_at: ActiveValue::Set(None),
                }
                .insert(&self.database)
                .await?
            }
        };
        tracing::info!("added {} to tenant {}", user_id, tenant_id);
        Ok(TenantMembership::from(model))
    }

    /// Revokes a membership. The row is kept, deactivated.
    pub async fn remove_tenant_member(&self, tenant_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let user_id = require_user(user_id)?;
        let model = tenant_memberships::Entity::find_by_id((tenant_id, user_id.to_string()))
            .filter(tenant_memberships::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("membership of {user_id} in tenant {tenant_id}"))
            })?;

        let now = Utc::now();
        let mut active: tenant_memberships::ActiveModel = model.into();
        active.deactivated_at = ActiveValue::Set(Some(now));
        active.updated_at = ActiveValue::Set(now);
        active.update(&self.database).await?;
        tracing::info!("removed {} from tenant {}", user_id, tenant_id);
        Ok(())
    }

    /// Active memberships of a user, oldest first.
    pub async fn list_user_tenants(&self, user_id: &str) -> ResultEngine<Vec<TenantMembership>> {
        let user_id = require_user(user_id)?;
        Ok(tenant_memberships::Entity::find()
            .filter(tenant_memberships::Column::UserId.eq(user_id))
            .filter(tenant_memberships::Column::DeactivatedAt.is_null())
            .order_by_asc(tenant_memberships::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(TenantMembership::from)
            .collect())
    }
}
