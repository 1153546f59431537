//! Accounts: where money is kept (bank, cash, credit card, ...).
//!
//! The account's currency is the default currency of transactions drawn from
//! it, and credit-card accounts get their payment date defaulted to the due
//! date.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine, ValidationErrors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Bank,
    Cash,
    CreditCard,
    Investment,
    Other,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::CreditCard => "credit_card",
            Self::Investment => "investment",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "bank" => Ok(Self::Bank),
            "cash" => Ok(Self::Cash),
            "credit_card" => Ok(Self::CreditCard),
            "investment" => Ok(Self::Investment),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidArgument(format!(
                "invalid account type: {other}"
            ))),
        }
    }
}

/// An account as seen by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub initial_balance: Money,
    pub currency: Currency,
    pub color: String,
    pub icon: String,
    pub kind: AccountKind,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivated_by: Option<String>,
}

impl Account {
    #[must_use]
    pub fn is_credit_card(&self) -> bool {
        self.kind == AccountKind::CreditCard
    }
}

/// Input for creating an account.
///
/// Currency and kind arrive as raw strings so that a bad value is reported
/// against its field together with every other problem.
#[derive(Clone, Debug, Default)]
pub struct NewAccount {
    pub name: String,
    pub initial_balance: f64,
    pub currency: String,
    pub color: String,
    pub icon: String,
    pub kind: String,
}

/// `NewAccount` after validation.
#[derive(Clone, Debug)]
pub(crate) struct ValidAccount {
    pub(crate) name: String,
    pub(crate) initial_balance: Money,
    pub(crate) currency: Currency,
    pub(crate) color: String,
    pub(crate) icon: String,
    pub(crate) kind: AccountKind,
}

const MAX_COLOR_LEN: usize = 128;

impl NewAccount {
    pub(crate) fn validate(&self) -> ResultEngine<ValidAccount> {
        let mut errors = ValidationErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "name is required");
        }

        let initial_balance = match Money::from_major(self.initial_balance) {
            Ok(amount) if amount.is_negative() => {
                errors.add("initial_balance", "initial_balance must be non-negative");
                Money::ZERO
            }
            Ok(amount) => amount,
            Err(err) => {
                errors.add("initial_balance", err.to_string());
                Money::ZERO
            }
        };

        let currency = if self.currency.trim().is_empty() {
            errors.add("currency", "currency is required");
            None
        } else {
            match Currency::try_from(self.currency.as_str()) {
                Ok(currency) => Some(currency),
                Err(_) => {
                    errors.add("currency", "invalid currency code");
                    None
                }
            }
        };

        let color = self.color.trim();
        if color.is_empty() {
            errors.add("color", "color is required");
        } else if color.len() > MAX_COLOR_LEN {
            errors.add("color", "color must not exceed 128 characters");
        }

        let kind = if self.kind.trim().is_empty() {
            errors.add("type", "type is required");
            None
        } else {
            match AccountKind::try_from(self.kind.trim()) {
                Ok(kind) => Some(kind),
                Err(_) => {
                    errors.add("type", "invalid account type");
                    None
                }
            }
        };

        errors.into_result()?;
        // Both are only unset alongside a recorded error.
        let (Some(currency), Some(kind)) = (currency, kind) else {
            return Err(EngineError::InvalidArgument("invalid account".to_string()));
        };

        Ok(ValidAccount {
            name: name.to_string(),
            initial_balance,
            currency,
            color: color.to_string(),
            icon: self.icon.trim().to_string(),
            kind,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub initial_balance_minor: i64,
    pub currency: String,
    pub color: String,
    pub icon: String,
    pub kind: String,
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
        on_delete = "NoAction"
    )]
    Tenant,
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            tenant_id: model.tenant_id,
            name: model.name,
            initial_balance: Money::new(model.initial_balance_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            color: model.color,
            icon: model.icon,
            kind: AccountKind::try_from(model.kind.as_str())?,
            created_at: model.created_at,
            created_by: model.created_by,
            updated_at: model.updated_at,
            updated_by: model.updated_by,
            deactivated_at: model.deactivated_at,
            deactivated_by: model.deactivated_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account() -> NewAccount {
        NewAccount {
            name: "Nubank".to_string(),
            initial_balance: 0.0,
            currency: "brl".to_string(),
            color: "#8a05be".to_string(),
            icon: "card".to_string(),
            kind: "credit_card".to_string(),
        }
    }

    #[test]
    fn valid_account_is_normalized() {
        let valid = new_account().validate().unwrap();

        assert_eq!(valid.currency.code(), "BRL");
        assert_eq!(valid.kind, AccountKind::CreditCard);
    }

    #[test]
    fn reports_every_bad_field() {
        let account = NewAccount {
            name: " ".to_string(),
            initial_balance: -5.0,
            currency: String::new(),
            color: "x".repeat(129),
            icon: String::new(),
            kind: "wallet".to_string(),
        };

        let Err(EngineError::Validation(errors)) = account.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(
            fields,
            vec!["color", "currency", "initial_balance", "name", "type"]
        );
        assert_eq!(errors.get("type"), Some("invalid account type"));
    }
}
