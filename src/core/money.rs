//! Monetary primitives.
//!
//! All money values are a two-decimal fixed-point quantity backed by
//! [`rust_decimal::Decimal`] - never raw floating point, to avoid round-off
//! drift across repeated additions. Display formatting is decoupled from the
//! stored value, and subtraction clamps at zero because "amount still owed"
//! and "surplus" are never negative.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// A non-negative money value with exactly two decimal places.
///
/// Comparisons and equality are performed on the fixed-point representation.
/// Serialized as a decimal string so persisted snapshots never round-trip
/// through floating point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero shillings, dollars, or whatever the group's currency is.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a money value from a decimal, rounding to two decimal places
    /// (midpoint away from zero) and rejecting negative amounts.
    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::InvalidAmount { amount: value });
        }
        Ok(Self(round2(value)))
    }

    /// Creates a money value from whole major units (e.g. `5000` shillings).
    #[must_use]
    pub fn from_major(units: u32) -> Self {
        Self(Decimal::from(units))
    }

    /// Converts an `f64` read from configuration into a money value.
    ///
    /// Used only at the rules-normalization boundary; domain code never
    /// touches floats.
    pub fn try_from_f64(value: f64) -> Result<Self> {
        let decimal = Decimal::try_from(value).map_err(|e| Error::Validation {
            message: format!("amount {value} is not representable: {e}"),
        })?;
        Self::new(decimal)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this value is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtraction clamped at zero. The engine never reports negative
    /// arrears or negative surplus.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(round2(self.0 - other.0))
        }
    }

    /// Applies a percentage rate (e.g. `10` for 10%), rounding the result to
    /// two decimal places. Used for penalty and interest application.
    #[must_use]
    pub fn percent(self, rate: Decimal) -> Self {
        Self(round2(self.0 * rate / Decimal::ONE_HUNDRED))
    }

    /// Formats with a currency prefix and thousands grouping,
    /// e.g. `KES 1,234.50`. The grouping is display-only; the stored value
    /// is untouched.
    #[must_use]
    pub fn format_with(&self, currency: &str) -> String {
        let plain = format!("{:.2}", self.0);
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((i, f)) => (i.to_string(), f.to_string()),
            None => (plain, "00".to_string()),
        };
        let mut grouped = String::new();
        for (i, ch) in int_part.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let int_grouped: String = grouped.chars().rev().collect();
        format!("{currency} {int_grouped}.{frac_part}")
    }
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(round2(self.0 + rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}
