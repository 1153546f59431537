use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Money amount represented as **integer cents**.
///
/// Requests carry decimal amounts; they are rounded to cents once, at the
/// boundary, and every computation after that is integer arithmetic. The type
/// is currency-agnostic: the currency lives on the record holding the amount.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::from_major(12.346).unwrap();
/// assert_eq!(amount.cents(), 1235);
/// assert_eq!(amount.to_string(), "12.35");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Rounds a decimal amount to the nearest cent.
    ///
    /// Halves round away from zero (`2.675` may land on either side because of
    /// its binary representation, `0.125` becomes `0.13`). Non-finite input
    /// and values outside the `i64` cent range are rejected.
    pub fn from_major(amount: f64) -> ResultEngine<Self> {
        if !amount.is_finite() {
            return Err(EngineError::InvalidArgument(
                "amount must be a finite number".to_string(),
            ));
        }
        let rounded = (amount * 100.0).round() / 100.0;
        let cents = (rounded * 100.0).round();
        if cents >= i64::MAX as f64 || cents <= i64::MIN as f64 {
            return Err(EngineError::InvalidArgument("amount too large".to_string()));
        }
        Ok(Self(cents as i64))
    }

    /// Decimal value, two fraction digits.
    #[must_use]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}
