//! Command structs for engine operations.
//!
//! These types group parameters for transaction writes and reads, keeping
//! call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::TransactionKind;

/// Who is acting, and on behalf of which tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub tenant_id: Uuid,
    pub user_id: String,
}

impl Scope {
    #[must_use]
    pub fn new(tenant_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id: user_id.into(),
        }
    }
}

/// Create a transaction, optionally expanded into installments.
///
/// `amount` is in major units (e.g. `100.0` for one hundred); it is rounded
/// to cents once. Unset `currency`, `accrual_month` and `payment_date` are
/// derived from the source account and the due date.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub from_account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    pub amount: f64,
    pub currency: Option<String>,
    pub accrual_month: Option<String>,
    pub kind: TransactionKind,
    pub category_id: Uuid,
    pub comments: Option<String>,
    pub due_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    pub tag_ids: Vec<Uuid>,
    /// `0` and `1` both mean a single transaction.
    pub installments: u32,
    pub recurring: bool,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        from_account_id: Uuid,
        category_id: Uuid,
        kind: TransactionKind,
        amount: f64,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            from_account_id,
            to_account_id: None,
            amount,
            currency: None,
            accrual_month: None,
            kind,
            category_id,
            comments: None,
            due_date,
            payment_date: None,
            tag_ids: Vec::new(),
            installments: 1,
            recurring: false,
        }
    }

    #[must_use]
    pub fn to_account_id(mut self, to_account_id: Uuid) -> Self {
        self.to_account_id = Some(to_account_id);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn accrual_month(mut self, accrual_month: impl Into<String>) -> Self {
        self.accrual_month = Some(accrual_month.into());
        self
    }

    #[must_use]
    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    #[must_use]
    pub fn payment_date(mut self, payment_date: DateTime<Utc>) -> Self {
        self.payment_date = Some(payment_date);
        self
    }

    #[must_use]
    pub fn tag_ids(mut self, tag_ids: Vec<Uuid>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    #[must_use]
    pub fn installments(mut self, count: u32) -> Self {
        self.installments = count;
        self
    }

    #[must_use]
    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }
}

/// Update a single stored transaction.
///
/// Fields left as `None` keep their stored value. For the nullable fields
/// (`to_account_id`, `comments`, `payment_date`) `Some(None)` clears them.
///
/// `tag_ids` follows replace-set semantics: `None` leaves the tags alone,
/// `Some(vec![])` removes all of them.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransactionCmd {
    pub transaction_id: Uuid,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Option<Uuid>>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub accrual_month: Option<String>,
    pub kind: Option<TransactionKind>,
    pub category_id: Option<Uuid>,
    pub comments: Option<Option<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub payment_date: Option<Option<DateTime<Utc>>>,
    pub tag_ids: Option<Vec<Uuid>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(transaction_id: Uuid) -> Self {
        Self {
            transaction_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_account_id(mut self, account_id: Uuid) -> Self {
        self.from_account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn to_account_id(mut self, account_id: Option<Uuid>) -> Self {
        self.to_account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn accrual_month(mut self, accrual_month: impl Into<String>) -> Self {
        self.accrual_month = Some(accrual_month.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn comments(mut self, comments: Option<String>) -> Self {
        self.comments = Some(comments);
        self
    }

    #[must_use]
    pub fn due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn payment_date(mut self, payment_date: Option<DateTime<Utc>>) -> Self {
        self.payment_date = Some(payment_date);
        self
    }

    #[must_use]
    pub fn tag_ids(mut self, tag_ids: Vec<Uuid>) -> Self {
        self.tag_ids = Some(tag_ids);
        self
    }
}

/// Filters for listing transactions. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub accrual_month: Option<String>,
    /// Matches the source account.
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
}
