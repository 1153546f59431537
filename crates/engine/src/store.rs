//! Collaborators the transaction service depends on.
//!
//! Every lookup is tenant-scoped: a record that exists but belongs to another
//! tenant (or is soft-deleted) is reported exactly like a missing one.
//! [`crate::Engine`] implements all of them on top of sea-orm.

use std::future::Future;

use uuid::Uuid;

use crate::{
    Account, Category, ResultEngine, Tag, Transaction, TransactionDraft, TransactionListFilter,
};

pub trait AccountLookup: Send + Sync {
    /// Active account `account_id` of `tenant_id`, or `Ok(None)`.
    fn get_account(
        &self,
        tenant_id: Uuid,
        account_id: Uuid,
    ) -> impl Future<Output = ResultEngine<Option<Account>>> + Send;
}

pub trait CategoryLookup: Send + Sync {
    /// Active category `category_id` of `tenant_id`, or `Ok(None)`.
    fn get_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> impl Future<Output = ResultEngine<Option<Category>>> + Send;
}

pub trait TagValidator: Send + Sync {
    /// `true` iff every id names an active tag of `tenant_id`.
    ///
    /// Ids are expected to be distinct.
    fn validate_tags(
        &self,
        tenant_id: Uuid,
        tag_ids: &[Uuid],
    ) -> impl Future<Output = ResultEngine<bool>> + Send;
}

pub trait TransactionStore: Send + Sync {
    /// Stores one transaction and links it to `tag_ids`.
    fn create(
        &self,
        draft: TransactionDraft,
        tag_ids: &[Uuid],
    ) -> impl Future<Output = ResultEngine<Transaction>> + Send;

    /// Stores an installment group all-or-nothing.
    ///
    /// Each sibling gets `parent_transaction_id` set to the parent's new id,
    /// and every record is linked to `tag_ids`. The returned list starts with
    /// the parent followed by the siblings in input order.
    fn create_group(
        &self,
        parent: TransactionDraft,
        siblings: Vec<TransactionDraft>,
        tag_ids: &[Uuid],
    ) -> impl Future<Output = ResultEngine<Vec<Transaction>>> + Send;

    /// Active transaction `id` of `tenant_id`, or `Ok(None)`.
    fn get(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ResultEngine<Option<Transaction>>> + Send;

    /// Active transactions ordered by due date, then creation time.
    fn list(
        &self,
        tenant_id: Uuid,
        filter: &TransactionListFilter,
    ) -> impl Future<Output = ResultEngine<Vec<Transaction>>> + Send;

    /// Overwrites the stored record with `transaction`.
    ///
    /// With `Some(ids)` the tag links are replaced within the same write.
    fn update(
        &self,
        transaction: &Transaction,
        tag_ids: Option<&[Uuid]>,
    ) -> impl Future<Output = ResultEngine<Transaction>> + Send;

    /// Replaces the tag set of a transaction. An empty slice removes all tags.
    fn replace_tags(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        tag_ids: &[Uuid],
    ) -> impl Future<Output = ResultEngine<()>> + Send;

    /// Marks one transaction as deleted. Other group members are untouched.
    fn soft_delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        user_id: &str,
    ) -> impl Future<Output = ResultEngine<()>> + Send;

    /// Active tags linked to a transaction, ordered by name.
    fn tags(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = ResultEngine<Vec<Tag>>> + Send;

    /// The parent `parent_id` and its active siblings ordered by due date.
    fn group(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> impl Future<Output = ResultEngine<Vec<Transaction>>> + Send;
}
