use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    CreditCardInfo, EngineError, NewCreditCardInfo, ResultEngine, ValidationErrors,
    credit_cards, util::require_user,
};

use super::{Engine, with_tx};

impl Engine {
    /// Card details of a credit-card account of the tenant.
    pub async fn credit_card_info(
        &self,
        tenant_id: Uuid,
        account_id: Uuid,
    ) -> ResultEngine<CreditCardInfo> {
        self.account(tenant_id, account_id).await?;
        credit_cards::Entity::find()
            .filter(credit_cards::Column::AccountId.eq(account_id))
            .filter(credit_cards::Column::DeactivatedAt.is_null())
            .one(&self.database)
            .await?
            .map(CreditCardInfo::try_from)
            .transpose()?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("credit card info of account {account_id}"))
            })
    }

    /// Stores the card details of a credit-card account, replacing the active
    /// ones if present.
    pub async fn upsert_credit_card_info(
        &self,
        tenant_id: Uuid,
        user_id: &str,
        account_id: Uuid,
        info: &NewCreditCardInfo,
    ) -> ResultEngine<CreditCardInfo> {
        let user_id = require_user(user_id)?;
        let account = self.account(tenant_id, account_id).await?;
        let valid = match info.validate() {
            Ok(valid) if account.is_credit_card() => valid,
            Ok(_) => {
                let mut errors = ValidationErrors::new();
                errors.add("account_id", "account is not a credit card");
                return Err(EngineError::Validation(errors));
            }
            Err(EngineError::Validation(mut errors)) if !account.is_credit_card() => {
                errors.add("account_id", "account is not a credit card");
                return Err(EngineError::Validation(errors));
            }
            Err(err) => return Err(err),
        };

        let now = Utc::now();
        let model = with_tx!(self, |db_tx| {
            let current = credit_cards::Entity::find()
                .filter(credit_cards::Column::AccountId.eq(account_id))
                .filter(credit_cards::Column::DeactivatedAt.is_null())
                .one(&db_tx)
                .await?;
            let model = match current {
                Some(model) => {
                    let mut active: credit_cards::ActiveModel = model.into();
                    active.last_four = ActiveValue::Set(valid.last_four);
                    active.name = ActiveValue::Set(valid.name);
                    active.brand = ActiveValue::Set(valid.brand.as_str().to_string());
                    active.closing_date = ActiveValue::Set(valid.closing_date);
                    active.due_date = ActiveValue::Set(valid.due_date);
                    active.updated_at = ActiveValue::Set(now);
                    active.updated_by = ActiveValue::Set(user_id.to_string());
                    active.update(&db_tx).await?
                }
                None => {
                    credit_cards::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4()),
                        account_id: ActiveValue::Set(account_id),
                        last_four: ActiveValue::Set(valid.last_four),
                        name: ActiveValue::Set(valid.name),
                        brand: ActiveValue::Set(valid.brand.as_str().to_string()),
                        closing_date: ActiveValue::Set(valid.closing_date),
                        due_date: ActiveValue::Set(valid.due_date),
                        created_at: ActiveValue::Set(now),
                        created_by: ActiveValue::Set(user_id.to_string()),
                        updated_at: ActiveValue::Set(now),
                        updated_by: ActiveValue::Set(user_id.to_string()),
                        deactivated_at: ActiveValue::Set(None),
                        deactivated_by: ActiveValue::Set(None),
                    }
                    .insert(&db_tx)
                    .await?
                }
            };
            Ok::<_, EngineError>(model)
        })?;
        tracing::info!("stored credit card info for account {}", account_id);
        CreditCardInfo::try_from(model)
    }
}
