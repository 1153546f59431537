//! Installment calculator.
//!
//! Splits (or repeats) an amount over `count` monthly installments. Amounts are
//! distributed in whole cents: in split mode the first installment absorbs the
//! division remainder, so the series always sums to the rounded total. Due
//! dates advance one calendar month per installment and clamp to the last day
//! of shorter months (Jan 31 → Feb 28/29 → Mar 31), never spilling into the
//! following month.
//!
//! Everything here is pure; nothing touches the database.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;

use crate::{EngineError, Money, ResultEngine};

/// One computed installment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Installment {
    /// 1-based position in the series.
    pub sequence_number: u32,
    #[serde(rename = "amount_minor")]
    pub amount: Money,
    pub due_date: DateTime<Utc>,
}

/// Computes `count` installments from a decimal amount.
///
/// The amount is rounded to cents first (half away from zero). With
/// `is_recurring` every installment repeats the rounded amount; otherwise the
/// amount is divided and the remainder cents go to installment 1.
///
/// # Errors
///
/// [`EngineError::InvalidArgument`] when `count` is 0 or `amount` is negative
/// or not finite.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use engine::{Money, calculate_installments};
///
/// let first = Utc.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap();
/// let plan = calculate_installments(100.0, 3, first, false).unwrap();
///
/// let amounts: Vec<i64> = plan.iter().map(|i| i.amount.cents()).collect();
/// assert_eq!(amounts, vec![3334, 3333, 3333]);
/// assert_eq!(plan.iter().map(|i| i.amount).sum::<Money>(), Money::new(10000));
/// ```
pub fn calculate_installments(
    amount: f64,
    count: u32,
    first_due_date: DateTime<Utc>,
    is_recurring: bool,
) -> ResultEngine<Vec<Installment>> {
    ensure_count(count)?;
    if amount < 0.0 {
        return Err(EngineError::InvalidArgument(
            "amount must be non-negative".to_string(),
        ));
    }
    let total = Money::from_major(amount)?;
    plan_installments(total, count, first_due_date, is_recurring)
}

/// Same as [`calculate_installments`] for an amount already held in cents.
pub fn plan_installments(
    total: Money,
    count: u32,
    first_due_date: DateTime<Utc>,
    is_recurring: bool,
) -> ResultEngine<Vec<Installment>> {
    ensure_count(count)?;
    if total.is_negative() {
        return Err(EngineError::InvalidArgument(
            "amount must be non-negative".to_string(),
        ));
    }

    let (part, first) = if is_recurring {
        (total, total)
    } else {
        let count = i64::from(count);
        let part = total.cents() / count;
        let remainder = total.cents() % count;
        (Money::new(part), Money::new(part + remainder))
    };

    (0..count)
        .map(|offset| -> ResultEngine<Installment> {
            Ok(Installment {
                sequence_number: offset + 1,
                amount: if offset == 0 { first } else { part },
                due_date: add_months(first_due_date, offset)?,
            })
        })
        .collect()
}

fn ensure_count(count: u32) -> ResultEngine<()> {
    if count < 1 {
        return Err(EngineError::InvalidArgument(
            "installments count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Advances `date` by `months` calendar months.
///
/// The day of month is kept unless the target month is shorter, in which case
/// it is clamped to that month's last day. Time of day is preserved.
///
/// # Errors
///
/// [`EngineError::InvalidArgument`] if the result falls outside the supported
/// date range.
pub fn add_months(date: DateTime<Utc>, months: u32) -> ResultEngine<DateTime<Utc>> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| EngineError::InvalidArgument("due date out of range".to_string()))
}


#[cfg(test)]
mod proptests {
    use chrono::{Datelike, TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;

    fn first_due() -> impl Strategy<Value = DateTime<Utc>> {
        (1990i32..=2100, 1u32..=12, 1u32..=31).prop_map(|(y, m, d)| {
            (1..=d)
                .rev()
                .find_map(|d| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single())
                .unwrap()
        })
    }

    proptest! {
        #[test]
        fn split_preserves_total(
            total_cents in 0i64..=100_000_000,
            count in 1u32..=120,
            first in first_due(),
        ) {
            let amount = total_cents as f64 / 100.0;
            let plan = calculate_installments(amount, count, first, false).unwrap();

            prop_assert_eq!(plan.len(), count as usize);
            let sum: Money = plan.iter().map(|i| i.amount).sum();
            prop_assert_eq!(sum, Money::from_major(amount).unwrap());
        }

        #[test]
        fn split_first_absorbs_remainder(
            total_cents in 0i64..=100_000_000,
            count in 2u32..=120,
            first in first_due(),
        ) {
            let plan = plan_installments(Money::new(total_cents), count, first, false).unwrap();

            let rest = &plan[1..];
            prop_assert!(rest.iter().all(|i| i.amount == rest[0].amount));
            prop_assert!(plan[0].amount >= rest[0].amount);
            prop_assert!(plan[0].amount.cents() - rest[0].amount.cents() < i64::from(count));
        }

        #[test]
        fn recurring_repeats_every_installment(
            total_cents in 0i64..=100_000_000,
            count in 1u32..=120,
            first in first_due(),
        ) {
            let amount = total_cents as f64 / 100.0;
            let plan = calculate_installments(amount, count, first, true).unwrap();
            let expected = Money::from_major(amount).unwrap();

            prop_assert!(plan.iter().all(|i| i.amount == expected));
        }

        #[test]
        fn sequence_is_contiguous_and_due_dates_monthly(
            count in 1u32..=120,
            first in first_due(),
        ) {
            let plan = plan_installments(Money::new(1000), count, first, false).unwrap();

            for (offset, installment) in plan.iter().enumerate() {
                prop_assert_eq!(installment.sequence_number as usize, offset + 1);
                let months = (installment.due_date.year() - first.year()) * 12
                    + installment.due_date.month() as i32
                    - first.month() as i32;
                prop_assert_eq!(months as usize, offset);
                prop_assert!(installment.due_date.day() <= first.day());
            }
        }
    }
}
