//! Category registry per tenant.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, ValidationErrors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Income,
    Expense,
    Transfer,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for CategoryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidArgument(format!(
                "invalid category type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub parent_category_id: Option<Uuid>,
    pub name: String,
    pub kind: CategoryKind,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivated_by: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewCategory {
    pub name: String,
    pub kind: String,
    pub parent_category_id: Option<Uuid>,
    pub color: String,
    pub icon: String,
}

impl NewCategory {
    pub(crate) fn validate(&self) -> ResultEngine<CategoryKind> {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "name is required");
        }
        let kind = match self.kind.trim() {
            "" => {
                errors.add("type", "type is required");
                None
            }
            raw => CategoryKind::try_from(raw)
                .inspect_err(|_| errors.add("type", "invalid category type"))
                .ok(),
        };
        errors.into_result()?;
        kind.ok_or_else(|| EngineError::InvalidArgument("invalid category".to_string()))
    }
}

/// Editable part of a category. The type is fixed at creation.
#[derive(Clone, Debug, Default)]
pub struct CategoryUpdate {
    pub name: String,
    pub parent_category_id: Option<Uuid>,
    pub color: String,
    pub icon: String,
}

impl CategoryUpdate {
    pub(crate) fn validate(&self, category_id: Uuid) -> ResultEngine<()> {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "name is required");
        }
        if self.parent_category_id == Some(category_id) {
            errors.add(
                "parent_category_id",
                "a category cannot be its own parent",
            );
        }
        errors.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub parent_category_id: Option<Uuid>,
    pub name: String,
    pub kind: String,
    pub color: String,
    pub icon: String,
    pub created_at: DateTimeUtc,
    pub created_by: String,
    pub updated_at: DateTimeUtc,
    pub updated_by: String,
    pub deactivated_at: Option<DateTimeUtc>,
    pub deactivated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::TenantId",
        to = "super::tenants::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            tenant_id: model.tenant_id,
            parent_category_id: model.parent_category_id,
            name: model.name,
            kind: CategoryKind::try_from(model.kind.as_str())?,
            color: model.color,
            icon: model.icon,
            created_at: model.created_at,
            created_by: model.created_by,
            updated_at: model.updated_at,
            updated_by: model.updated_by,
            deactivated_at: model.deactivated_at,
            deactivated_by: model.deactivated_by,
        })
    }
}
