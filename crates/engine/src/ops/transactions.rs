use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::{
    EngineError, ResultEngine, Tag, Transaction, TransactionDraft, TransactionListFilter,
    store::TransactionStore, tags, transaction_tags, transactions,
};

use super::{Engine, with_tx};

fn new_model(
    draft: TransactionDraft,
    parent_transaction_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        parent_transaction_id: ActiveValue::Set(parent_transaction_id),
        tenant_id: ActiveValue::Set(draft.tenant_id),
        from_account_id: ActiveValue::Set(draft.from_account_id),
        to_account_id: ActiveValue::Set(draft.to_account_id),
        amount_minor: ActiveValue::Set(draft.amount.cents()),
        currency: ActiveValue::Set(draft.currency.code().to_string()),
        accrual_month: ActiveValue::Set(draft.accrual_month),
        kind: ActiveValue::Set(draft.kind.as_str().to_string()),
        category_id: ActiveValue::Set(draft.category_id),
        comments: ActiveValue::Set(draft.comments),
        due_date: ActiveValue::Set(draft.due_date),
        payment_date: ActiveValue::Set(draft.payment_date),
        created_at: ActiveValue::Set(now),
        created_by: ActiveValue::Set(draft.created_by.clone()),
        updated_at: ActiveValue::Set(now),
        updated_by: ActiveValue::Set(draft.created_by),
        deactivated_at: ActiveValue::Set(None),
        deactivated_by: ActiveValue::Set(None),
    }
}

trait ApplyListFilter: QueryFilter + Sized {
    fn apply_list_filter(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyListFilter for T
where
    T: QueryFilter + Sized,
{
    fn apply_list_filter(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(accrual_month) = &filter.accrual_month {
            self = self.filter(transactions::Column::AccrualMonth.eq(accrual_month.as_str()));
        }
        if let Some(account_id) = filter.account_id {
            self = self.filter(transactions::Column::FromAccountId.eq(account_id));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        self
    }
}

impl Engine {
    async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        model: transactions::ActiveModel,
        tag_ids: &[Uuid],
    ) -> ResultEngine<Transaction> {
        let model = model.insert(db_tx).await?;
        self.link_tags(db_tx, model.id, tag_ids).await?;
        Transaction::try_from(model)
    }

    async fn link_tags(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        tag_ids: &[Uuid],
    ) -> ResultEngine<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }
        let links = tag_ids.iter().map(|tag_id| transaction_tags::ActiveModel {
            transaction_id: ActiveValue::Set(transaction_id),
            tag_id: ActiveValue::Set(*tag_id),
        });
        transaction_tags::Entity::insert_many(links)
            .exec_without_returning(db_tx)
            .await?;
        Ok(())
    }

    async fn relink_tags(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        tag_ids: &[Uuid],
    ) -> ResultEngine<()> {
        transaction_tags::Entity::delete_many()
            .filter(transaction_tags::Column::TransactionId.eq(transaction_id))
            .exec(db_tx)
            .await?;
        self.link_tags(db_tx, transaction_id, tag_ids).await
    }

    async fn require_active_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tenant_id: Uuid,
        id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(id)
            .filter(transactions::Column::TenantId.eq(tenant_id))
            .filter(transactions::Column::DeactivatedAt.is_null())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {id}")))
    }
}

impl TransactionStore for Engine {
    async fn create(&self, draft: TransactionDraft, tag_ids: &[Uuid]) -> ResultEngine<Transaction> {
        let model = new_model(draft, None, Utc::now());
        with_tx!(self, |db_tx| {
            self.insert_transaction(&db_tx, model, tag_ids).await
        })
    }

    async fn create_group(
        &self,
        parent: TransactionDraft,
        siblings: Vec<TransactionDraft>,
        tag_ids: &[Uuid],
    ) -> ResultEngine<Vec<Transaction>> {
        let now = Utc::now();
        let parent = new_model(parent, None, now);
        with_tx!(self, |db_tx| {
            let parent = self.insert_transaction(&db_tx, parent, tag_ids).await?;
            let parent_id = parent.id;
            let mut group = Vec::with_capacity(siblings.len() + 1);
            group.push(parent);
            for sibling in siblings {
                let model = new_model(sibling, Some(parent_id), now);
                group.push(self.insert_transaction(&db_tx, model, tag_ids).await?);
            }
            Ok(group)
        })
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> ResultEngine<Option<Transaction>> {
        transactions::Entity::find_by_id(id)
            .filter(transactions::Column::TenantId.eq(tenant_id))
            .filter(transactions::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(tenant_id))
            .filter(transactions::Column::DeactivatedAt.is_null())
            .apply_list_filter(filter)
            .order_by_asc(transactions::Column::DueDate)
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn update(
        &self,
        transaction: &Transaction,
        tag_ids: Option<&[Uuid]>,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_active_transaction(&db_tx, transaction.tenant_id, transaction.id)
                .await?;

            let mut active: transactions::ActiveModel = model.into();
            active.from_account_id = ActiveValue::Set(transaction.from_account_id);
            active.to_account_id = ActiveValue::Set(transaction.to_account_id);
            active.amount_minor = ActiveValue::Set(transaction.amount.cents());
            active.currency = ActiveValue::Set(transaction.currency.code().to_string());
            active.accrual_month = ActiveValue::Set(transaction.accrual_month.clone());
            active.kind = ActiveValue::Set(transaction.kind.as_str().to_string());
            active.category_id = ActiveValue::Set(transaction.category_id);
            active.comments = ActiveValue::Set(transaction.comments.clone());
            active.due_date = ActiveValue::Set(transaction.due_date);
            active.payment_date = ActiveValue::Set(transaction.payment_date);
            active.updated_at = ActiveValue::Set(transaction.updated_at);
            active.updated_by = ActiveValue::Set(transaction.updated_by.clone());
            let model = active.update(&db_tx).await?;

            if let Some(tag_ids) = tag_ids {
                self.relink_tags(&db_tx, model.id, tag_ids).await?;
            }
            Transaction::try_from(model)
        })
    }

    async fn replace_tags(&self, tenant_id: Uuid, id: Uuid, tag_ids: &[Uuid]) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_active_transaction(&db_tx, tenant_id, id)
                .await?;
            self.relink_tags(&db_tx, id, tag_ids).await
        })
    }

    async fn soft_delete(&self, tenant_id: Uuid, id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_active_transaction(&db_tx, tenant_id, id)
                .await?;
            let now = Utc::now();
            let mut active: transactions::ActiveModel = model.into();
            active.deactivated_at = ActiveValue::Set(Some(now));
            active.deactivated_by = ActiveValue::Set(Some(user_id.to_string()));
            active.updated_at = ActiveValue::Set(now);
            active.updated_by = ActiveValue::Set(user_id.to_string());
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    async fn tags(&self, tenant_id: Uuid, id: Uuid) -> ResultEngine<Vec<Tag>> {
        Ok(tags::Entity::find()
            .inner_join(transaction_tags::Entity)
            .filter(transaction_tags::Column::TransactionId.eq(id))
            .filter(tags::Column::TenantId.eq(tenant_id))
            .filter(tags::Column::DeactivatedAt.is_null())
            .order_by_asc(tags::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Tag::from)
            .collect())
    }

    async fn group(&self, tenant_id: Uuid, parent_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        let mut group = transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(tenant_id))
            .filter(transactions::Column::DeactivatedAt.is_null())
            .filter(
                Condition::any()
                    .add(transactions::Column::Id.eq(parent_id))
                    .add(transactions::Column::ParentTransactionId.eq(parent_id)),
            )
            .order_by_asc(transactions::Column::DueDate)
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        // parent first even when its due date was moved past a sibling's
        group.sort_by_key(|transaction| transaction.parent_transaction_id.is_some());
        Ok(group)
    }
}
