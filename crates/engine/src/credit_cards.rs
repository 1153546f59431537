//! Card details of `credit_card` accounts.
//!
//! An account has at most one active [`CreditCardInfo`]; writing new details
//! replaces the old ones in place.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, ValidationErrors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Jcb,
    Unionpay,
    DinersClub,
    Maestro,
    Unknown,
}

impl CardBrand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
            Self::Jcb => "jcb",
            Self::Unionpay => "unionpay",
            Self::DinersClub => "diners_club",
            Self::Maestro => "maestro",
            Self::Unknown => "unknown",
        }
    }
}

impl TryFrom<&str> for CardBrand {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "visa" => Ok(Self::Visa),
            "mastercard" => Ok(Self::Mastercard),
            "amex" => Ok(Self::Amex),
            "discover" => Ok(Self::Discover),
            "jcb" => Ok(Self::Jcb),
            "unionpay" => Ok(Self::Unionpay),
            "diners_club" => Ok(Self::DinersClub),
            "maestro" => Ok(Self::Maestro),
            "unknown" => Ok(Self::Unknown),
            other => Err(EngineError::InvalidArgument(format!(
                "invalid card brand: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreditCardInfo {
    pub id: Uuid,
    pub account_id: Uuid,
    pub last_four: String,
    pub name: String,
    pub brand: CardBrand,
    pub closing_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Card details as submitted. The brand is a raw string so that a bad value
/// is reported against its field.
#[derive(Clone, Debug, Default)]
pub struct NewCreditCardInfo {
    pub last_four: String,
    pub name: String,
    pub brand: String,
    pub closing_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub(crate) struct ValidCreditCardInfo {
    pub(crate) last_four: String,
    pub(crate) name: String,
    pub(crate) brand: CardBrand,
    pub(crate) closing_date: DateTime<Utc>,
    pub(crate) due_date: DateTime<Utc>,
}

impl NewCreditCardInfo {
    pub(crate) fn validate(&self) -> ResultEngine<ValidCreditCardInfo> {
        let mut errors = ValidationErrors::new();

        let last_four = self.last_four.trim();
        if last_four.is_empty() {
            errors.add("last_four", "last_four is required");
        } else if last_four.len() != 4 || !last_four.bytes().all(|b| b.is_ascii_digit()) {
            errors.add("last_four", "last_four must be 4 digits");
        }

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "name is required");
        }

        let brand = match self.brand.trim() {
            "" => {
                errors.add("brand", "brand is required");
                None
            }
            raw => CardBrand::try_from(raw.to_ascii_lowercase().as_str())
                .inspect_err(|_| errors.add("brand", "invalid brand"))
                .ok(),
        };

        if self.closing_date.is_none() {
            errors.add("closing_date", "closing_date is required");
        }
        if self.due_date.is_none() {
            errors.add("due_date", "due_date is required");
        }

        errors.into_result()?;
        let (Some(brand), Some(closing_date), Some(due_date)) =
            (brand, self.closing_date, self.due_date)
        else {
            return Err(EngineError::InvalidArgument(
                "invalid credit card info".to_string(),
            ));
        };

        Ok(ValidCreditCardInfo {
            last_four: last_four.to_string(),
            name: name.to_string(),
            brand,
            closing_date,
            due_date,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "credit_card_info")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub last_four: String,
    pub name: String,
    pub brand: String,
    pub closing_date: DateTimeUtc,
    pub due_date: DateTimeUtc,
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
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Account,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for CreditCardInfo {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            last_four: model.last_four,
            name: model.name,
            brand: CardBrand::try_from(model.brand.as_str())?,
            closing_date: model.closing_date,
            due_date: model.due_date,
            created_at: model.created_at,
            created_by: model.created_by,
            updated_at: model.updated_at,
            updated_by: model.updated_by,
        })
    }
}
