//! Transaction orchestration.
//!
//! [`TransactionService`] turns a create request into stored transactions:
//!
//! 1. the source account is resolved for the tenant;
//! 2. currency, accrual month and payment date are defaulted;
//! 3. the draft is validated field by field;
//! 4. destination account, category and tags are checked against the tenant;
//! 5. with more than one installment the draft is expanded into a group that
//!    the store writes all-or-nothing.
//!
//! Updates and deletes address a single record and never touch the rest of
//! its installment group.

use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    Account, CreateTransactionCmd, Currency, EngineError, Money, ResultEngine, Scope, Tag,
    Transaction, TransactionDraft, TransactionListFilter, UpdateTransactionCmd, ValidationErrors,
    installments::plan_installments,
    store::{AccountLookup, CategoryLookup, TagValidator, TransactionStore},
    util::{accrual_month_of, normalize_optional_text, require_user},
};

#[derive(Debug)]
pub struct TransactionService<S> {
    store: S,
}

impl<S> TransactionService<S>
where
    S: AccountLookup + CategoryLookup + TagValidator + TransactionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying collaborators.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a transaction, or an installment group when
    /// `cmd.installments > 1`.
    ///
    /// Returns the stored parent. For a group it carries installment 1: its
    /// amount, due date, accrual month and annotated comment.
    pub async fn create(
        &self,
        scope: &Scope,
        cmd: CreateTransactionCmd,
    ) -> ResultEngine<Transaction> {
        let user_id = require_user(&scope.user_id)?;
        let tenant_id = require_tenant(scope)?;

        let account = self
            .require_account(tenant_id, cmd.from_account_id)
            .await?;

        let mut errors = ValidationErrors::new();
        let currency = match cmd.currency.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Currency::try_from(raw).unwrap_or_else(|_| {
                errors.add("currency", "invalid currency code");
                account.currency.clone()
            }),
            _ => account.currency.clone(),
        };
        let accrual_month = normalize_optional_text(cmd.accrual_month.as_deref())
            .unwrap_or_else(|| accrual_month_of(cmd.due_date));
        let (amount, amount_error) = convert_amount(cmd.amount);
        let payment_date = cmd.payment_date.or_else(|| {
            cmd.kind
                .pays_on_due_date(account.kind)
                .then_some(cmd.due_date)
        });

        let draft = TransactionDraft {
            tenant_id,
            from_account_id: account.id,
            to_account_id: cmd.to_account_id,
            amount,
            currency,
            accrual_month,
            kind: cmd.kind,
            category_id: cmd.category_id,
            comments: normalize_optional_text(cmd.comments.as_deref()),
            due_date: cmd.due_date,
            payment_date,
            created_by: user_id.to_string(),
        };
        draft.collect_errors(&mut errors);
        if let Some(message) = amount_error {
            errors.add("amount", message);
        }
        errors.into_result()?;

        if let Some(to_account_id) = draft.to_account_id {
            self.require_account(tenant_id, to_account_id).await?;
        }
        self.require_category(tenant_id, draft.category_id).await?;
        let tag_ids = distinct(cmd.tag_ids);
        self.require_tags(tenant_id, &tag_ids).await?;

        if cmd.installments <= 1 {
            let transaction = self.store.create(draft, &tag_ids).await?;
            tracing::info!(
                "created transaction {} for tenant {}",
                transaction.id,
                tenant_id
            );
            return Ok(transaction);
        }

        let count = cmd.installments;
        let plan = plan_installments(draft.amount, count, draft.due_date, cmd.recurring)?;
        tracing::debug!(
            "expanding transaction into {} installments (recurring: {})",
            count,
            cmd.recurring
        );

        let mut drafts: Vec<TransactionDraft> = plan
            .iter()
            .map(|installment| {
                let payment_date = if installment.sequence_number == 1 {
                    draft.payment_date
                } else {
                    draft
                        .kind
                        .pays_on_due_date(account.kind)
                        .then_some(installment.due_date)
                };
                draft.for_installment(installment, count, payment_date)
            })
            .collect();
        let siblings = drafts.split_off(1);
        let parent = drafts
            .pop()
            .ok_or_else(|| EngineError::InvalidArgument("empty installment plan".to_string()))?;

        let group = self.store.create_group(parent, siblings, &tag_ids).await?;
        let parent = group
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::KeyNotFound("installment group".to_string()))?;
        tracing::info!(
            "created installment group {} ({} records) for tenant {}",
            parent.id,
            count,
            tenant_id
        );
        Ok(parent)
    }

    /// Updates one stored transaction in place.
    ///
    /// The patched record goes through the same field validation and
    /// reference checks as a new one. Installment siblings are not touched.
    pub async fn update(
        &self,
        scope: &Scope,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<Transaction> {
        let user_id = require_user(&scope.user_id)?;
        let tenant_id = require_tenant(scope)?;
        let current = self.require_transaction(tenant_id, cmd.transaction_id).await?;

        let mut errors = ValidationErrors::new();
        let mut amount_error = None;
        let mut draft = current.draft();
        if let Some(from_account_id) = cmd.from_account_id {
            draft.from_account_id = from_account_id;
        }
        if let Some(to_account_id) = cmd.to_account_id {
            draft.to_account_id = to_account_id;
        }
        if let Some(amount) = cmd.amount {
            (draft.amount, amount_error) = convert_amount(amount);
        }
        if let Some(raw) = cmd.currency.as_deref() {
            match Currency::try_from(raw) {
                Ok(currency) => draft.currency = currency,
                Err(_) => errors.add("currency", "invalid currency code"),
            }
        }
        if let Some(accrual_month) = cmd.accrual_month {
            draft.accrual_month = accrual_month.trim().to_string();
        }
        if let Some(kind) = cmd.kind {
            draft.kind = kind;
        }
        if let Some(category_id) = cmd.category_id {
            draft.category_id = category_id;
        }
        if let Some(comments) = cmd.comments {
            draft.comments = normalize_optional_text(comments.as_deref());
        }
        if let Some(due_date) = cmd.due_date {
            draft.due_date = due_date;
        }
        if let Some(payment_date) = cmd.payment_date {
            draft.payment_date = payment_date;
        }
        draft.collect_errors(&mut errors);
        if let Some(message) = amount_error {
            errors.add("amount", message);
        }
        errors.into_result()?;

        self.require_account(tenant_id, draft.from_account_id).await?;
        if let Some(to_account_id) = draft.to_account_id {
            self.require_account(tenant_id, to_account_id).await?;
        }
        self.require_category(tenant_id, draft.category_id).await?;
        let tag_ids = cmd.tag_ids.map(distinct);
        if let Some(tag_ids) = &tag_ids {
            self.require_tags(tenant_id, tag_ids).await?;
        }

        let patched = Transaction {
            from_account_id: draft.from_account_id,
            to_account_id: draft.to_account_id,
            amount: draft.amount,
            currency: draft.currency,
            accrual_month: draft.accrual_month,
            kind: draft.kind,
            category_id: draft.category_id,
            comments: draft.comments,
            due_date: draft.due_date,
            payment_date: draft.payment_date,
            updated_at: Utc::now(),
            updated_by: user_id.to_string(),
            ..current
        };
        let updated = self.store.update(&patched, tag_ids.as_deref()).await?;
        tracing::info!("updated transaction {} for tenant {}", updated.id, tenant_id);
        Ok(updated)
    }

    /// Soft-deletes one transaction. Installment siblings stay active.
    pub async fn delete(&self, scope: &Scope, id: Uuid) -> ResultEngine<()> {
        let user_id = require_user(&scope.user_id)?;
        let tenant_id = require_tenant(scope)?;
        self.store.soft_delete(tenant_id, id, user_id).await?;
        tracing::info!("deleted transaction {} for tenant {}", id, tenant_id);
        Ok(())
    }

    /// Replaces the tags of one transaction. An empty list clears them.
    pub async fn replace_tags(
        &self,
        scope: &Scope,
        id: Uuid,
        tag_ids: Vec<Uuid>,
    ) -> ResultEngine<()> {
        require_user(&scope.user_id)?;
        let tenant_id = require_tenant(scope)?;
        self.require_transaction(tenant_id, id).await?;
        let tag_ids = distinct(tag_ids);
        self.require_tags(tenant_id, &tag_ids).await?;
        self.store.replace_tags(tenant_id, id, &tag_ids).await
    }

    pub async fn get(&self, scope: &Scope, id: Uuid) -> ResultEngine<Transaction> {
        let tenant_id = require_tenant(scope)?;
        self.require_transaction(tenant_id, id).await
    }

    pub async fn list(
        &self,
        scope: &Scope,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let tenant_id = require_tenant(scope)?;
        self.store.list(tenant_id, filter).await
    }

    pub async fn tags(&self, scope: &Scope, id: Uuid) -> ResultEngine<Vec<Tag>> {
        let tenant_id = require_tenant(scope)?;
        self.require_transaction(tenant_id, id).await?;
        self.store.tags(tenant_id, id).await
    }

    /// The installment group `id` belongs to, parent first.
    ///
    /// Any member can be used to address the group. A transaction that was
    /// not expanded is returned alone.
    pub async fn installment_group(
        &self,
        scope: &Scope,
        id: Uuid,
    ) -> ResultEngine<Vec<Transaction>> {
        let tenant_id = require_tenant(scope)?;
        let transaction = self.require_transaction(tenant_id, id).await?;
        let parent_id = transaction
            .parent_transaction_id
            .unwrap_or(transaction.id);
        self.store.group(tenant_id, parent_id).await
    }

    async fn require_transaction(&self, tenant_id: Uuid, id: Uuid) -> ResultEngine<Transaction> {
        self.store
            .get(tenant_id, id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {id}")))
    }

    async fn require_account(&self, tenant_id: Uuid, account_id: Uuid) -> ResultEngine<Account> {
        match self.store.get_account(tenant_id, account_id).await? {
            Some(account) => Ok(account),
            None => {
                tracing::warn!(
                    "account {} rejected for tenant {}",
                    account_id,
                    tenant_id
                );
                Err(EngineError::Reference(format!(
                    "account {account_id} not found"
                )))
            }
        }
    }

    async fn require_category(&self, tenant_id: Uuid, category_id: Uuid) -> ResultEngine<()> {
        if self
            .store
            .get_category(tenant_id, category_id)
            .await?
            .is_none()
        {
            tracing::warn!(
                "category {} rejected for tenant {}",
                category_id,
                tenant_id
            );
            return Err(EngineError::Reference(format!(
                "category {category_id} not found"
            )));
        }
        Ok(())
    }

    async fn require_tags(&self, tenant_id: Uuid, tag_ids: &[Uuid]) -> ResultEngine<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }
        if !self.store.validate_tags(tenant_id, tag_ids).await? {
            tracing::warn!("tags rejected for tenant {}", tenant_id);
            return Err(EngineError::Reference(
                "one or more tags do not belong to this tenant".to_string(),
            ));
        }
        Ok(())
    }
}

fn require_tenant(scope: &Scope) -> ResultEngine<Uuid> {
    if scope.tenant_id.is_nil() {
        return Err(EngineError::Forbidden("tenant id is required".to_string()));
    }
    Ok(scope.tenant_id)
}

/// Converts a request amount to cents. A failed conversion yields zero plus
/// the message to report for the `amount` field.
fn convert_amount(amount: f64) -> (Money, Option<String>) {
    match Money::from_major(amount) {
        Ok(amount) => (amount, None),
        Err(EngineError::InvalidArgument(message)) => (Money::ZERO, Some(message)),
        Err(err) => (Money::ZERO, Some(err.to_string())),
    }
}

/// Sorted, without duplicates.
fn distinct(ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone};
    use sea_orm::DbErr;

    use super::*;
    use crate::{AccountKind, Category, CategoryKind, TransactionKind};

    #[derive(Default)]
    struct State {
        accounts: Vec<Account>,
        categories: Vec<Category>,
        tags: Vec<Tag>,
        transactions: Vec<Transaction>,
        links: Vec<(Uuid, Uuid)>,
    }

    #[derive(Default)]
    struct FakeStore {
        state: Mutex<State>,
        fail_group: bool,
    }

    fn stored(draft: TransactionDraft, parent_transaction_id: Option<Uuid>) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            parent_transaction_id,
            tenant_id: draft.tenant_id,
            from_account_id: draft.from_account_id,
            to_account_id: draft.to_account_id,
            amount: draft.amount,
            currency: draft.currency,
            accrual_month: draft.accrual_month,
            kind: draft.kind,
            category_id: draft.category_id,
            comments: draft.comments,
            due_date: draft.due_date,
            payment_date: draft.payment_date,
            created_at: now,
            updated_at: now,
            updated_by: draft.created_by.clone(),
            created_by: draft.created_by,
            deactivated_at: None,
            deactivated_by: None,
        }
    }

    impl FakeStore {
        fn transactions(&self) -> Vec<Transaction> {
            self.state.lock().unwrap().transactions.clone()
        }

        fn tag_links(&self, transaction_id: Uuid) -> Vec<Uuid> {
            let state = self.state.lock().unwrap();
            state
                .links
                .iter()
                .filter(|(tx, _)| *tx == transaction_id)
                .map(|(_, tag)| *tag)
                .collect()
        }
    }

    impl AccountLookup for FakeStore {
        async fn get_account(
            &self,
            tenant_id: Uuid,
            account_id: Uuid,
        ) -> ResultEngine<Option<Account>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .accounts
                .iter()
                .find(|a| a.id == account_id && a.tenant_id == tenant_id)
                .cloned())
        }
    }

    impl CategoryLookup for FakeStore {
        async fn get_category(
            &self,
            tenant_id: Uuid,
            category_id: Uuid,
        ) -> ResultEngine<Option<Category>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .categories
                .iter()
                .find(|c| c.id == category_id && c.tenant_id == tenant_id)
                .cloned())
        }
    }

    impl TagValidator for FakeStore {
        async fn validate_tags(&self, tenant_id: Uuid, tag_ids: &[Uuid]) -> ResultEngine<bool> {
            let state = self.state.lock().unwrap();
            Ok(tag_ids
                .iter()
                .all(|id| state.tags.iter().any(|t| t.id == *id && t.tenant_id == tenant_id)))
        }
    }

    impl TransactionStore for FakeStore {
        async fn create(
            &self,
            draft: TransactionDraft,
            tag_ids: &[Uuid],
        ) -> ResultEngine<Transaction> {
            let mut state = self.state.lock().unwrap();
            let transaction = stored(draft, None);
            state
                .links
                .extend(tag_ids.iter().map(|tag| (transaction.id, *tag)));
            state.transactions.push(transaction.clone());
            Ok(transaction)
        }

        async fn create_group(
            &self,
            parent: TransactionDraft,
            siblings: Vec<TransactionDraft>,
            tag_ids: &[Uuid],
        ) -> ResultEngine<Vec<Transaction>> {
            if self.fail_group {
                return Err(EngineError::Database(DbErr::Custom(
                    "disk full".to_string(),
                )));
            }
            let mut state = self.state.lock().unwrap();
            let parent = stored(parent, None);
            let mut group = vec![parent.clone()];
            group.extend(
                siblings
                    .into_iter()
                    .map(|draft| stored(draft, Some(parent.id))),
            );
            for transaction in &group {
                state
                    .links
                    .extend(tag_ids.iter().map(|tag| (transaction.id, *tag)));
                state.transactions.push(transaction.clone());
            }
            Ok(group)
        }

        async fn get(&self, tenant_id: Uuid, id: Uuid) -> ResultEngine<Option<Transaction>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .transactions
                .iter()
                .find(|t| t.id == id && t.tenant_id == tenant_id && t.is_active())
                .cloned())
        }

        async fn list(
            &self,
            tenant_id: Uuid,
            filter: &TransactionListFilter,
        ) -> ResultEngine<Vec<Transaction>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .transactions
                .iter()
                .filter(|t| t.tenant_id == tenant_id && t.is_active())
                .filter(|t| {
                    filter
                        .accrual_month
                        .as_ref()
                        .is_none_or(|m| *m == t.accrual_month)
                })
                .cloned()
                .collect())
        }

        async fn update(
            &self,
            transaction: &Transaction,
            tag_ids: Option<&[Uuid]>,
        ) -> ResultEngine<Transaction> {
            let mut state = self.state.lock().unwrap();
            let slot = state
                .transactions
                .iter_mut()
                .find(|t| t.id == transaction.id)
                .ok_or_else(|| EngineError::KeyNotFound(transaction.id.to_string()))?;
            *slot = transaction.clone();
            if let Some(tag_ids) = tag_ids {
                state.links.retain(|(tx, _)| *tx != transaction.id);
                state
                    .links
                    .extend(tag_ids.iter().map(|tag| (transaction.id, *tag)));
            }
            Ok(transaction.clone())
        }

        async fn replace_tags(
            &self,
            _tenant_id: Uuid,
            id: Uuid,
            tag_ids: &[Uuid],
        ) -> ResultEngine<()> {
            let mut state = self.state.lock().unwrap();
            state.links.retain(|(tx, _)| *tx != id);
            state.links.extend(tag_ids.iter().map(|tag| (id, *tag)));
            Ok(())
        }

        async fn soft_delete(&self, tenant_id: Uuid, id: Uuid, user_id: &str) -> ResultEngine<()> {
            let mut state = self.state.lock().unwrap();
            let transaction = state
                .transactions
                .iter_mut()
                .find(|t| t.id == id && t.tenant_id == tenant_id && t.is_active())
                .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {id}")))?;
            transaction.deactivated_at = Some(Utc::now());
            transaction.deactivated_by = Some(user_id.to_string());
            Ok(())
        }

        async fn tags(&self, _tenant_id: Uuid, id: Uuid) -> ResultEngine<Vec<Tag>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .tags
                .iter()
                .filter(|tag| state.links.contains(&(id, tag.id)))
                .cloned()
                .collect())
        }

        async fn group(&self, tenant_id: Uuid, parent_id: Uuid) -> ResultEngine<Vec<Transaction>> {
            let state = self.state.lock().unwrap();
            let mut group: Vec<_> = state
                .transactions
                .iter()
                .filter(|t| t.tenant_id == tenant_id && t.is_active())
                .filter(|t| t.id == parent_id || t.parent_transaction_id == Some(parent_id))
                .cloned()
                .collect::<Vec<_>>();
            group.sort_by_key(|t| (t.parent_transaction_id.is_some(), t.due_date));
            Ok(group)
        }
    }

    struct Fixture {
        service: TransactionService<FakeStore>,
        scope: Scope,
        bank: Uuid,
        savings: Uuid,
        card: Uuid,
        category: Uuid,
        tag: Uuid,
        other_tenant_account: Uuid,
        other_tenant_category: Uuid,
        other_tenant_tag: Uuid,
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn account(tenant_id: Uuid, kind: AccountKind, currency: &str) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            tenant_id,
            name: "account".to_string(),
            initial_balance: Money::ZERO,
            currency: Currency::try_from(currency).unwrap(),
            color: "#000000".to_string(),
            icon: String::new(),
            kind,
            created_at: now,
            created_by: "seed".to_string(),
            updated_at: now,
            updated_by: "seed".to_string(),
            deactivated_at: None,
            deactivated_by: None,
        }
    }

    fn category(tenant_id: Uuid) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::new_v4(),
            tenant_id,
            parent_category_id: None,
            name: "Shopping".to_string(),
            kind: CategoryKind::Expense,
            color: "#ffffff".to_string(),
            icon: String::new(),
            created_at: now,
            created_by: "seed".to_string(),
            updated_at: now,
            updated_by: "seed".to_string(),
            deactivated_at: None,
            deactivated_by: None,
        }
    }

    fn tag(tenant_id: Uuid, name: &str) -> Tag {
        let now = Utc::now();
        Tag {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            created_at: now,
            created_by: "seed".to_string(),
            updated_at: now,
            updated_by: "seed".to_string(),
            deactivated_at: None,
            deactivated_by: None,
        }
    }

    fn fixture_with(fail_group: bool) -> Fixture {
        let tenant = Uuid::new_v4();
        let other = Uuid::new_v4();

        let bank = account(tenant, AccountKind::Bank, "USD");
        let savings = account(tenant, AccountKind::Bank, "USD");
        let card = account(tenant, AccountKind::CreditCard, "BRL");
        let foreign_account = account(other, AccountKind::Bank, "USD");
        let own_category = category(tenant);
        let foreign_category = category(other);
        let own_tag = tag(tenant, "travel");
        let foreign_tag = tag(other, "travel");

        Fixture {
            scope: Scope::new(tenant, "user-1"),
            bank: bank.id,
            savings: savings.id,
            card: card.id,
            category: own_category.id,
            tag: own_tag.id,
            other_tenant_account: foreign_account.id,
            other_tenant_category: foreign_category.id,
            other_tenant_tag: foreign_tag.id,
            service: TransactionService::new(FakeStore {
                state: Mutex::new(State {
                    accounts: vec![bank, savings, card, foreign_account],
                    categories: vec![own_category, foreign_category],
                    tags: vec![own_tag, foreign_tag],
                    ..State::default()
                }),
                fail_group,
            }),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(false)
    }

    fn purchase(f: &Fixture, amount: f64, due_date: DateTime<Utc>) -> CreateTransactionCmd {
        CreateTransactionCmd::new(f.bank, f.category, TransactionKind::Debit, amount, due_date)
    }

    #[tokio::test]
    async fn single_transaction_gets_defaults() {
        let f = fixture();
        let cmd = purchase(&f, 42.5, date(2023, 1, 15)).comments("  groceries ");

        let tx = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(tx.amount, Money::new(4250));
        assert_eq!(tx.currency.code(), "USD");
        assert_eq!(tx.accrual_month, "202301");
        assert_eq!(tx.comments.as_deref(), Some("groceries"));
        assert_eq!(tx.payment_date, None);
        assert_eq!(tx.parent_transaction_id, None);
        assert_eq!(tx.created_by, "user-1");
        assert_eq!(f.service.store().transactions().len(), 1);
    }

    #[tokio::test]
    async fn explicit_currency_and_accrual_month_are_kept() {
        let f = fixture();
        let cmd = purchase(&f, 10.0, date(2023, 1, 31))
            .currency("eur")
            .accrual_month("202302");

        let tx = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(tx.currency.code(), "EUR");
        assert_eq!(tx.accrual_month, "202302");
    }

    #[tokio::test]
    async fn split_purchase_creates_linked_group() {
        let f = fixture();
        let cmd = purchase(&f, 100.0, date(2023, 1, 15))
            .comments("Laptop")
            .tag_ids(vec![f.tag, f.tag])
            .installments(3);

        let parent = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(parent.amount, Money::new(3334));
        assert_eq!(parent.comments.as_deref(), Some("[Installment 1/3] Laptop"));
        assert_eq!(parent.accrual_month, "202301");

        let stored = f.service.store().transactions();
        assert_eq!(stored.len(), 3);
        let siblings: Vec<_> = stored.iter().filter(|t| t.id != parent.id).collect();
        assert!(
            siblings
                .iter()
                .all(|t| t.parent_transaction_id == Some(parent.id))
        );
        assert_eq!(
            siblings.iter().map(|t| t.amount.cents()).collect::<Vec<_>>(),
            vec![3333, 3333]
        );
        assert_eq!(
            siblings.iter().map(|t| t.due_date).collect::<Vec<_>>(),
            vec![date(2023, 2, 15), date(2023, 3, 15)]
        );
        assert_eq!(
            siblings
                .iter()
                .map(|t| t.accrual_month.as_str())
                .collect::<Vec<_>>(),
            vec!["202302", "202303"]
        );
        assert_eq!(
            siblings[1].comments.as_deref(),
            Some("[Installment 3/3] Laptop")
        );
        assert!(stored.iter().all(|t| t.payment_date.is_none()));
        assert_eq!(
            stored.iter().map(|t| t.amount).sum::<Money>(),
            Money::new(10000)
        );
        for t in &stored {
            assert_eq!(f.service.store().tag_links(t.id), vec![f.tag]);
        }
    }

    #[tokio::test]
    async fn recurring_repeats_the_full_amount() {
        let f = fixture();
        let cmd = purchase(&f, 100.0, date(2023, 1, 15))
            .installments(3)
            .recurring(true);

        f.service.create(&f.scope, cmd).await.unwrap();

        let stored = f.service.store().transactions();
        assert!(stored.iter().all(|t| t.amount == Money::new(10000)));
        assert!(
            stored
                .iter()
                .all(|t| t.comments.as_deref().is_some_and(|c| c.ends_with("] ")))
        );
    }

    #[tokio::test]
    async fn credit_card_installments_pay_on_their_due_dates() {
        let f = fixture();
        let cmd = CreateTransactionCmd::new(
            f.card,
            f.category,
            TransactionKind::Debit,
            50.0,
            date(2024, 1, 31),
        )
        .installments(2);

        let parent = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(parent.currency.code(), "BRL");
        assert_eq!(parent.payment_date, Some(date(2024, 1, 31)));
        let sibling = f
            .service
            .store()
            .transactions()
            .into_iter()
            .find(|t| t.id != parent.id)
            .unwrap();
        assert_eq!(sibling.due_date, date(2024, 2, 29));
        assert_eq!(sibling.payment_date, Some(date(2024, 2, 29)));
    }

    #[tokio::test]
    async fn card_payments_get_no_default_payment_date() {
        let f = fixture();
        let cmd = CreateTransactionCmd::new(
            f.card,
            f.category,
            TransactionKind::Payment,
            50.0,
            date(2024, 1, 31),
        )
        .installments(2);

        f.service.create(&f.scope, cmd).await.unwrap();

        assert!(
            f.service
                .store()
                .transactions()
                .iter()
                .all(|t| t.payment_date.is_none())
        );
    }

    #[tokio::test]
    async fn explicit_payment_date_only_applies_to_parent() {
        let f = fixture();
        let cmd = CreateTransactionCmd::new(
            f.card,
            f.category,
            TransactionKind::Credit,
            20.0,
            date(2023, 1, 10),
        )
        .payment_date(date(2023, 1, 5))
        .installments(2);

        let parent = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(parent.payment_date, Some(date(2023, 1, 5)));
        let sibling = f
            .service
            .store()
            .transactions()
            .into_iter()
            .find(|t| t.id != parent.id)
            .unwrap();
        assert_eq!(sibling.payment_date, Some(date(2023, 2, 10)));
    }

    #[tokio::test]
    async fn missing_user_is_forbidden() {
        let f = fixture();
        let scope = Scope::new(f.scope.tenant_id, " ");

        let err = f
            .service
            .create(&scope, purchase(&f, 10.0, date(2023, 1, 1)))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::Forbidden("user id is required".to_string())
        );
        assert!(f.service.store().transactions().is_empty());
    }

    #[tokio::test]
    async fn foreign_references_are_rejected() {
        let f = fixture();

        let cmd = CreateTransactionCmd::new(
            f.other_tenant_account,
            f.category,
            TransactionKind::Debit,
            10.0,
            date(2023, 1, 1),
        );
        let err = f.service.create(&f.scope, cmd).await.unwrap_err();
        assert!(matches!(err, EngineError::Reference(_)));

        let cmd = CreateTransactionCmd::new(
            f.bank,
            f.other_tenant_category,
            TransactionKind::Debit,
            10.0,
            date(2023, 1, 1),
        );
        let err = f.service.create(&f.scope, cmd).await.unwrap_err();
        assert!(matches!(err, EngineError::Reference(_)));

        let cmd = purchase(&f, 10.0, date(2023, 1, 1))
            .tag_ids(vec![f.tag, f.other_tenant_tag])
            .installments(3);
        let err = f.service.create(&f.scope, cmd).await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Reference("one or more tags do not belong to this tenant".to_string())
        );

        let cmd = CreateTransactionCmd::new(
            f.bank,
            f.category,
            TransactionKind::Transfer,
            10.0,
            date(2023, 1, 1),
        )
        .to_account_id(f.other_tenant_account);
        let err = f.service.create(&f.scope, cmd).await.unwrap_err();
        assert!(matches!(err, EngineError::Reference(_)));

        assert!(f.service.store().transactions().is_empty());
    }

    #[tokio::test]
    async fn validation_reports_fields() {
        let f = fixture();
        let cmd = CreateTransactionCmd::new(
            f.bank,
            f.category,
            TransactionKind::Transfer,
            0.0,
            date(2023, 1, 1),
        )
        .currency("dollars")
        .accrual_month("2023-01");

        let Err(EngineError::Validation(errors)) = f.service.create(&f.scope, cmd).await else {
            panic!("expected validation error");
        };

        assert_eq!(errors.get("amount"), Some("amount must be greater than 0"));
        assert_eq!(
            errors.get("to_account_id"),
            Some("to_account_id is required for transfers")
        );
        assert_eq!(errors.get("currency"), Some("invalid currency code"));
        assert_eq!(
            errors.get("accrual_month"),
            Some("accrual_month must be in YYYYMM format")
        );
    }

    #[tokio::test]
    async fn unconvertible_amount_reports_the_real_reason() {
        let f = fixture();

        for (amount, message) in [
            (f64::NAN, "amount must be a finite number"),
            (f64::INFINITY, "amount must be a finite number"),
            (1e300, "amount too large"),
        ] {
            let cmd = purchase(&f, amount, date(2023, 1, 1));
            let Err(EngineError::Validation(errors)) = f.service.create(&f.scope, cmd).await
            else {
                panic!("expected validation error for {amount}");
            };
            assert_eq!(errors.get("amount"), Some(message));
        }

        let tx = f
            .service
            .create(&f.scope, purchase(&f, 10.0, date(2023, 1, 1)))
            .await
            .unwrap();
        let Err(EngineError::Validation(errors)) = f
            .service
            .update(&f.scope, UpdateTransactionCmd::new(tx.id).amount(f64::NAN))
            .await
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("amount"), Some("amount must be a finite number"));
        assert_eq!(f.service.store().transactions().len(), 1);
    }

    #[tokio::test]
    async fn zero_installments_store_one_plain_record() {
        let f = fixture();
        let cmd = purchase(&f, 25.0, date(2023, 4, 10))
            .comments("Books")
            .installments(0);

        let tx = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(tx.amount, Money::new(2500));
        assert_eq!(tx.comments.as_deref(), Some("Books"));
        assert_eq!(tx.parent_transaction_id, None);
        assert_eq!(f.service.store().transactions().len(), 1);
    }

    #[tokio::test]
    async fn group_parent_accrual_month_follows_first_due_date() {
        let f = fixture();
        let cmd = purchase(&f, 90.0, date(2023, 1, 20))
            .accrual_month("202305")
            .installments(3);

        let parent = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(parent.accrual_month, "202301");
        let mut months: Vec<_> = f
            .service
            .store()
            .transactions()
            .into_iter()
            .map(|t| t.accrual_month)
            .collect();
        months.sort();
        assert_eq!(months, vec!["202301", "202302", "202303"]);
    }

    #[tokio::test]
    async fn transfer_between_own_accounts() {
        let f = fixture();
        let cmd = CreateTransactionCmd::new(
            f.bank,
            f.category,
            TransactionKind::Transfer,
            75.0,
            date(2023, 5, 2),
        )
        .to_account_id(f.savings);

        let tx = f.service.create(&f.scope, cmd).await.unwrap();

        assert_eq!(tx.to_account_id, Some(f.savings));
    }

    #[tokio::test]
    async fn failed_group_write_leaves_nothing() {
        let f = fixture_with(true);
        let cmd = purchase(&f, 90.0, date(2023, 1, 1))
            .tag_ids(vec![f.tag])
            .installments(3);

        let err = f.service.create(&f.scope, cmd).await.unwrap_err();

        assert!(matches!(err, EngineError::Database(_)));
        assert!(f.service.store().transactions().is_empty());
        assert!(f.service.store().state.lock().unwrap().links.is_empty());
    }

    #[tokio::test]
    async fn calculator_errors_propagate() {
        let f = fixture();
        let cmd = purchase(&f, 10.0, DateTime::<Utc>::MAX_UTC)
            .accrual_month("202301")
            .installments(2);

        let err = f.service.create(&f.scope, cmd).await.unwrap_err();

        assert_eq!(
            err,
            EngineError::InvalidArgument("due date out of range".to_string())
        );
    }

    #[tokio::test]
    async fn update_touches_one_record_and_replaces_tags() {
        let f = fixture();
        let cmd = purchase(&f, 100.0, date(2023, 1, 15))
            .tag_ids(vec![f.tag])
            .installments(3);
        let parent = f.service.create(&f.scope, cmd).await.unwrap();

        let updated = f
            .service
            .update(
                &f.scope,
                UpdateTransactionCmd::new(parent.id)
                    .amount(50.0)
                    .comments(Some("edited".to_string()))
                    .tag_ids(Vec::new()),
            )
            .await
            .unwrap();

        assert_eq!(updated.amount, Money::new(5000));
        assert_eq!(updated.comments.as_deref(), Some("edited"));
        assert!(f.service.store().tag_links(parent.id).is_empty());
        let siblings: Vec<_> = f
            .service
            .store()
            .transactions()
            .into_iter()
            .filter(|t| t.id != parent.id)
            .collect();
        assert!(siblings.iter().all(|t| t.amount == Money::new(3333)));
        assert!(
            siblings
                .iter()
                .all(|t| f.service.store().tag_links(t.id) == vec![f.tag])
        );
    }

    #[tokio::test]
    async fn update_without_tags_keeps_them() {
        let f = fixture();
        let tx = f
            .service
            .create(
                &f.scope,
                purchase(&f, 10.0, date(2023, 1, 1)).tag_ids(vec![f.tag]),
            )
            .await
            .unwrap();

        f.service
            .update(&f.scope, UpdateTransactionCmd::new(tx.id).amount(12.0))
            .await
            .unwrap();

        assert_eq!(f.service.store().tag_links(tx.id), vec![f.tag]);
    }

    #[tokio::test]
    async fn update_revalidates_and_checks_references() {
        let f = fixture();
        let tx = f
            .service
            .create(&f.scope, purchase(&f, 10.0, date(2023, 1, 1)))
            .await
            .unwrap();

        let err = f
            .service
            .update(&f.scope, UpdateTransactionCmd::new(tx.id).amount(-3.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = f
            .service
            .update(
                &f.scope,
                UpdateTransactionCmd::new(tx.id).category_id(f.other_tenant_category),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Reference(_)));

        let err = f
            .service
            .update(
                &f.scope,
                UpdateTransactionCmd::new(tx.id).tag_ids(vec![f.other_tenant_tag]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Reference(_)));
    }

    #[tokio::test]
    async fn delete_is_single_record() {
        let f = fixture();
        let parent = f
            .service
            .create(
                &f.scope,
                purchase(&f, 30.0, date(2023, 1, 1)).installments(3),
            )
            .await
            .unwrap();

        f.service.delete(&f.scope, parent.id).await.unwrap();

        assert!(matches!(
            f.service.get(&f.scope, parent.id).await,
            Err(EngineError::KeyNotFound(_))
        ));
        let group = f
            .service
            .store()
            .transactions()
            .into_iter()
            .filter(|t| t.is_active())
            .count();
        assert_eq!(group, 2);
        let deleted = f
            .service
            .store()
            .transactions()
            .into_iter()
            .find(|t| t.id == parent.id)
            .unwrap();
        assert_eq!(deleted.deactivated_by.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn group_is_reachable_from_any_member() {
        let f = fixture();
        let parent = f
            .service
            .create(
                &f.scope,
                purchase(&f, 30.0, date(2023, 1, 1)).installments(3),
            )
            .await
            .unwrap();
        let sibling = f
            .service
            .store()
            .transactions()
            .into_iter()
            .find(|t| t.id != parent.id)
            .unwrap();

        let group = f
            .service
            .installment_group(&f.scope, sibling.id)
            .await
            .unwrap();

        assert_eq!(group.len(), 3);
        assert_eq!(group[0].id, parent.id);
    }

    #[tokio::test]
    async fn reads_are_tenant_scoped() {
        let f = fixture();
        let tx = f
            .service
            .create(&f.scope, purchase(&f, 10.0, date(2023, 1, 1)))
            .await
            .unwrap();
        let stranger = Scope::new(Uuid::new_v4(), "user-2");

        assert!(matches!(
            f.service.get(&stranger, tx.id).await,
            Err(EngineError::KeyNotFound(_))
        ));
        assert!(
            f.service
                .list(&stranger, &TransactionListFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }
}
