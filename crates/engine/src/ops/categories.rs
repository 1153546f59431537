use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};

use crate::{
    Category, CategoryUpdate, EngineError, NewCategory, ResultEngine, categories,
    store::CategoryLookup, util::require_user,
};

use super::Engine;

impl Engine {
    /// Creates a category. A parent, when given, must be an active category
    /// of the same tenant.
    pub async fn new_category(
        &self,
        tenant_id: Uuid,
        user_id: &str,
        category: &NewCategory,
    ) -> ResultEngine<Category> {
        let user_id = require_user(user_id)?;
        let kind = category.validate()?;
        self.tenant(tenant_id).await?;
        if let Some(parent_id) = category.parent_category_id {
            self.require_parent_category(tenant_id, parent_id).await?;
        }

        let now = Utc::now();
        let model = categories::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            tenant_id: ActiveValue::Set(tenant_id),
            parent_category_id: ActiveValue::Set(category.parent_category_id),
            name: ActiveValue::Set(category.name.trim().to_string()),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            color: ActiveValue::Set(category.color.trim().to_string()),
            icon: ActiveValue::Set(category.icon.trim().to_string()),
            created_at: ActiveValue::Set(now),
            created_by: ActiveValue::Set(user_id.to_string()),
            updated_at: ActiveValue::Set(now),
            updated_by: ActiveValue::Set(user_id.to_string()),
            deactivated_at: ActiveValue::Set(None),
            deactivated_by: ActiveValue::Set(None),
        }
        .insert(&self.database)
        .await?;
        tracing::info!("created category {} for tenant {}", model.id, tenant_id);
        Category::try_from(model)
    }

    /// Merges `update` into a stored category. The category type cannot be
    /// changed.
    pub async fn update_category(
        &self,
        tenant_id: Uuid,
        user_id: &str,
        category_id: Uuid,
        update: &CategoryUpdate,
    ) -> ResultEngine<Category> {
        let user_id = require_user(user_id)?;
        update.validate(category_id)?;
        let model = self.active_category_model(tenant_id, category_id).await?;
        if let Some(parent_id) = update.parent_category_id {
            self.require_parent_category(tenant_id, parent_id).await?;
        }

        let mut active: categories::ActiveModel = model.into();
        active.name = ActiveValue::Set(update.name.trim().to_string());
        active.parent_category_id = ActiveValue::Set(update.parent_category_id);
        active.color = ActiveValue::Set(update.color.trim().to_string());
        active.icon = ActiveValue::Set(update.icon.trim().to_string());
        active.updated_at = ActiveValue::Set(Utc::now());
        active.updated_by = ActiveValue::Set(user_id.to_string());
        let model = active.update(&self.database).await?;
        tracing::info!("updated category {} for tenant {}", category_id, tenant_id);
        Category::try_from(model)
    }

    pub async fn category(&self, tenant_id: Uuid, category_id: Uuid) -> ResultEngine<Category> {
        self.find_category(tenant_id, category_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("category {category_id}")))
    }

    pub async fn list_categories(&self, tenant_id: Uuid) -> ResultEngine<Vec<Category>> {
        categories::Entity::find()
            .filter(categories::Column::TenantId.eq(tenant_id))
            .filter(categories::Column::DeactivatedAt.is_null())
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    /// Soft-deletes a category. Child categories and transactions are kept.
    pub async fn delete_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        let user_id = require_user(user_id)?;
        let model = self.active_category_model(tenant_id, category_id).await?;

        let now = Utc::now();
        let mut active: categories::ActiveModel = model.into();
        active.deactivated_at = ActiveValue::Set(Some(now));
        active.deactivated_by = ActiveValue::Set(Some(user_id.to_string()));
        active.updated_at = ActiveValue::Set(now);
        active.updated_by = ActiveValue::Set(user_id.to_string());
        active.update(&self.database).await?;
        Ok(())
    }

    async fn find_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<Option<Category>> {
        categories::Entity::find_by_id(category_id)
            .filter(categories::Column::TenantId.eq(tenant_id))
            .filter(categories::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .map(Category::try_from)
            .transpose()
    }

    async fn active_category_model(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        categories::Entity::find_by_id(category_id)
            .filter(categories::Column::TenantId.eq(tenant_id))
            .filter(categories::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("category {category_id}")))
    }

    async fn require_parent_category(&self, tenant_id: Uuid, parent_id: Uuid) -> ResultEngine<()> {
        if self.find_category(tenant_id, parent_id).await?.is_none() {
            return Err(EngineError::Reference(format!(
                "category {parent_id} not found"
            )));
        }
        Ok(())
    }
}

impl CategoryLookup for Engine {
    async fn get_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<Option<Category>> {
        self.find_category(tenant_id, category_id).await
    }
}
