use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, PaginatorTrait, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, ResultEngine, Tag, store::TagValidator, tags, util::require_user};

use super::Engine;

impl Engine {
    pub async fn new_tag(&self, tenant_id: Uuid, user_id: &str, name: &str) -> ResultEngine<Tag> {
        let user_id = require_user(user_id)?;
        let name = tags::validate_name(name)?;
        self.tenant(tenant_id).await?;

        let now = Utc::now();
        let model = tags::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            tenant_id: ActiveValue::Set(tenant_id),
            name: ActiveValue::Set(name),
            created_at: ActiveValue::Set(now),
            created_by: ActiveValue::Set(user_id.to_string()),
            updated_at: ActiveValue::Set(now),
            updated_by: ActiveValue::Set(user_id.to_string()),
            deactivated_at: ActiveValue::Set(None),
            deactivated_by: ActiveValue::Set(None),
        }
        .insert(&self.database)
        .await?;
        tracing::info!("created tag {} for tenant {}", model.id, tenant_id);
        Ok(Tag::from(model))
    }

    pub async fn list_tags(&self, tenant_id: Uuid) -> ResultEngine<Vec<Tag>> {
        Ok(tags::Entity::find()
            .filter(tags::Column::TenantId.eq(tenant_id))
            .filter(tags::Column::DeactivatedAt.is_null())
            .order_by_asc(tags::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Tag::from)
            .collect())
    }

    /// Renames a tag. Its links are unaffected.
    pub async fn update_tag(
        &self,
        tenant_id: Uuid,
        user_id: &str,
        tag_id: Uuid,
        name: &str,
    ) -> ResultEngine<Tag> {
        let user_id = require_user(user_id)?;
        let name = tags::validate_name(name)?;
        let model = self.active_tag_model(tenant_id, tag_id).await?;

        let mut active: tags::ActiveModel = model.into();
        active.name = ActiveValue::Set(name);
        active.updated_at = ActiveValue::Set(Utc::now());
        active.updated_by = ActiveValue::Set(user_id.to_string());
        let model = active.update(&self.database).await?;
        tracing::info!("updated tag {} for tenant {}", tag_id, tenant_id);
        Ok(Tag::from(model))
    }

    /// Soft-deletes a tag. Existing links stay, but the tag is no longer
    /// listed nor accepted on new writes.
    pub async fn delete_tag(&self, tenant_id: Uuid, tag_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let user_id = require_user(user_id)?;
        let model = self.active_tag_model(tenant_id, tag_id).await?;

        let now = Utc::now();
        let mut active: tags::ActiveModel = model.into();
        active.deactivated_at = ActiveValue::Set(Some(now));
        active.deactivated_by = ActiveValue::Set(Some(user_id.to_string()));
        active.updated_at = ActiveValue::Set(now);
        active.updated_by = ActiveValue::Set(user_id.to_string());
        active.update(&self.database).await?;
        Ok(())
    }

    async fn active_tag_model(&self, tenant_id: Uuid, tag_id: Uuid) -> ResultEngine<tags::Model> {
        tags::Entity::find_by_id(tag_id)
            .filter(tags::Column::TenantId.eq(tenant_id))
            .filter(tags::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("tag {tag_id}")))
    }
}

impl TagValidator for Engine {
    async fn validate_tags(&self, tenant_id: Uuid, tag_ids: &[Uuid]) -> ResultEngine<bool> {
        if tag_ids.is_empty() {
            return Ok(true);
        }
        let found = tags::Entity::find()
            .filter(tags::Column::Id.is_in(tag_ids.iter().copied()))
            .filter(tags::Column::TenantId.eq(tenant_id))
            .filter(tags::Column::DeactivatedAt.is_null())
            .count(&self.database)
            .await?;
        Ok(usize::try_from(found).is_ok_and(|found| found == tag_ids.len()))
    }
}
