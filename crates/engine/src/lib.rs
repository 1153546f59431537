//! Multi-tenant personal-finance core.
//!
//! - [`calculate_installments`] splits (or repeats) an amount over monthly
//!   installments.
//! - [`TransactionService`] validates transactions and fans installment
//!   purchases out into a parent plus sibling records.
//! - [`Engine`] is the sea-orm store behind the service, and also manages
//!   tenants and their members, accounts (with credit-card details),
//!   categories and tags.

pub use accounts::{Account, AccountKind, NewAccount};
pub use categories::{Category, CategoryKind, CategoryUpdate, NewCategory};
pub use commands::{CreateTransactionCmd, Scope, TransactionListFilter, UpdateTransactionCmd};
pub use credit_cards::{CardBrand, CreditCardInfo, NewCreditCardInfo};
pub use currency::Currency;
pub use error::{EngineError, ValidationErrors};
pub use installments::{Installment, add_months, calculate_installments, plan_installments};
pub use money::Money;
pub use ops::{Engine, EngineBuilder};
pub use service::TransactionService;
pub use store::{AccountLookup, CategoryLookup, TagValidator, TransactionStore};
pub use tags::Tag;
pub use tenant_memberships::TenantMembership;
pub use tenants::Tenant;
pub use transactions::{Transaction, TransactionDraft, TransactionKind};

mod accounts;
mod categories;
mod commands;
mod credit_cards;
mod currency;
mod error;
mod installments;
mod money;
mod ops;
mod service;
mod store;
mod tags;
mod tenant_memberships;
mod tenants;
mod transaction_tags;
mod transactions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
