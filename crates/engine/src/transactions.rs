//! Transaction primitives.
//!
//! A `Transaction` is one financial movement drawn from a source account. A
//! purchase paid in installments (or a recurring charge) becomes a group: a
//! parent transaction holding installment 1 plus one sibling per further
//! installment, each sibling pointing back at the parent.
//!
//! `TransactionDraft` is the record before the store assigns an id and audit
//! timestamps. Validation runs on drafts, both at creation and on update.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AccountKind, Currency, EngineError, Installment, Money, ResultEngine, ValidationErrors,
    util::{accrual_month_of, is_accrual_month},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
    Transfer,
    Payment,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
        }
    }

    /// Whether a transaction of this kind on an account of `account` kind has
    /// its payment date follow its due date.
    ///
    /// Only credit and debit charges on credit cards qualify.
    #[must_use]
    pub fn pays_on_due_date(self, account: AccountKind) -> bool {
        account == AccountKind::CreditCard && matches!(self, Self::Credit | Self::Debit)
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "transfer" => Ok(Self::Transfer),
            "payment" => Ok(Self::Payment),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.add("transaction_type", "invalid transaction type");
                Err(EngineError::Validation(errors))
            }
        }
    }
}

/// A transaction that has not been stored yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionDraft {
    pub tenant_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    pub amount: Money,
    pub currency: Currency,
    /// `YYYYMM` bucket used for reporting.
    pub accrual_month: String,
    pub kind: TransactionKind,
    pub category_id: Uuid,
    pub comments: Option<String>,
    pub due_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_by: String,
}

impl TransactionDraft {
    /// Checks the structural rules, reporting every failing field at once.
    pub fn validate(&self) -> ResultEngine<()> {
        let mut errors = ValidationErrors::new();
        self.collect_errors(&mut errors);
        errors.into_result()
    }

    pub(crate) fn collect_errors(&self, errors: &mut ValidationErrors) {
        if self.tenant_id.is_nil() {
            errors.add("tenant_id", "tenant_id is required");
        }
        if self.from_account_id.is_nil() {
            errors.add("from_account_id", "from_account_id is required");
        }
        if !self.amount.is_positive() {
            errors.add("amount", "amount must be greater than 0");
        }
        if self.kind == TransactionKind::Transfer {
            match self.to_account_id {
                None => errors.add("to_account_id", "to_account_id is required for transfers"),
                Some(to) if to.is_nil() => {
                    errors.add("to_account_id", "to_account_id is required for transfers")
                }
                Some(to) if to == self.from_account_id => errors.add(
                    "to_account_id",
                    "to_account_id must be different from from_account_id",
                ),
                Some(_) => {}
            }
        }
        if self.category_id.is_nil() {
            errors.add("category_id", "category_id is required");
        }
        if !is_accrual_month(&self.accrual_month) {
            errors.add("accrual_month", "accrual_month must be in YYYYMM format");
        }
    }

    /// Copy of this draft carrying installment `installment` of `count`.
    ///
    /// Amount, due date and accrual month come from the installment; the
    /// comment gets an `[Installment i/N] ` prefix. `self` is left untouched,
    /// so every installment is built from the same base.
    #[must_use]
    pub(crate) fn for_installment(
        &self,
        installment: &Installment,
        count: u32,
        payment_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            amount: installment.amount,
            due_date: installment.due_date,
            accrual_month: accrual_month_of(installment.due_date),
            payment_date,
            comments: Some(installment_note(
                installment.sequence_number,
                count,
                self.comments.as_deref(),
            )),
            ..self.clone()
        }
    }
}

/// `[Installment 2/3] original comment`
pub(crate) fn installment_note(sequence: u32, count: u32, comments: Option<&str>) -> String {
    format!("[Installment {sequence}/{count}] {}", comments.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub parent_transaction_id: Option<Uuid>,
    pub tenant_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    #[serde(rename = "amount_minor")]
    pub amount: Money,
    pub currency: Currency,
    pub accrual_month: String,
    pub kind: TransactionKind,
    pub category_id: Uuid,
    pub comments: Option<String>,
    pub due_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivated_by: Option<String>,
}

impl Transaction {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deactivated_at.is_none()
    }

    /// The editable part of the record, for re-validation.
    #[must_use]
    pub fn draft(&self) -> TransactionDraft {
        TransactionDraft {
            tenant_id: self.tenant_id,
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: self.amount,
            currency: self.currency.clone(),
            accrual_month: self.accrual_month.clone(),
            kind: self.kind,
            category_id: self.category_id,
            comments: self.comments.clone(),
            due_date: self.due_date,
            payment_date: self.payment_date,
            created_by: self.created_by.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parent_transaction_id: Option<Uuid>,
    pub tenant_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    pub amount_minor: i64,
    pub currency: String,
    pub accrual_month: String,
    pub kind: String,
    pub category_id: Uuid,
    pub comments: Option<String>,
    pub due_date: DateTimeUtc,
    pub payment_date: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub created_by: String,
    pub updated_at: DateTimeUtc,
    pub updated_by: String,
    pub deactivated_at: Option<DateTimeUtc>,
    pub deactivated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_tags::Entity")]
    TransactionTags,
}

impl Related<super::transaction_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = TransactionKind::try_from(model.kind.as_str()).map_err(|_| {
            EngineError::InvalidArgument(format!("invalid stored transaction type: {}", model.kind))
        })?;
        Ok(Self {
            id: model.id,
            parent_transaction_id: model.parent_transaction_id,
            tenant_id: model.tenant_id,
            from_account_id: model.from_account_id,
            to_account_id: model.to_account_id,
            amount: Money::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            accrual_month: model.accrual_month,
            kind,
            category_id: model.category_id,
            comments: model.comments,
            due_date: model.due_date,
            payment_date: model.payment_date,
            created_at: model.created_at,
            created_by: model.created_by,
            updated_at: model.updated_at,
            updated_by: model.updated_by,
            deactivated_at: model.deactivated_at,
            deactivated_by: model.deactivated_by,
        })
    }
}
