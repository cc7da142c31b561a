//! Amount type for handling signed monetary values.
//!
//! This module provides the `Amount` type which wraps `Decimal`. It parses values that may or may
//! not include a dollar sign and thousands separators, which is how a Google sheet tends to render
//! a currency-formatted cell.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Neg};
use std::str::FromStr;

/// Represents a signed amount of money. Positive amounts are income, negative amounts are expenses.
///
/// `Display` renders the amount as currency with a dollar sign and commas, which is what the ledger
/// shows for totals. `to_plain_string` renders it the way it is written to the sheet.
///
/// # Examples
///
/// ```
/// # use caroney::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-$1,250.5").unwrap();
/// assert_eq!(amount.to_string(), "-$1,250.50");
/// assert_eq!(amount.to_plain_string(), "-1250.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// The number of decimal places written to the sheet.
    pub const SCALE: u32 = 2;

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn abs(&self) -> Amount {
        Amount(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the amount is less than zero.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Rounds to whole cents, the precision the sheet stores.
    pub fn to_cents(&self) -> Amount {
        Amount::new(self.0.round_dp(Self::SCALE))
    }

    /// Renders the amount with two decimal places and no currency symbols, e.g. `-40.00`.
    pub fn to_plain_string(&self) -> String {
        format!("{:.2}", self.to_cents().0)
    }

    /// The amount as a floating point number, for spreadsheet cells.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError {
    input: String,
    source: rust_decimal::Error,
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AmountError({:?}, {:?})", self.input, self.source)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to parse '{}' as an amount: {}", self.input, self.source)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::ZERO);
        }

        // Accept -$50.00, $-50.00, $50.00 and 50.00, with or without thousands separators
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(after_minus) => (true, after_minus),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let (negative, rest) = match rest.strip_prefix('-') {
            Some(after_minus) if !negative => (true, after_minus),
            _ => (negative, rest),
        };
        let digits = rest.replace(',', "");

        let value = Decimal::from_str(digits.trim()).map_err(|source| AmountError {
            input: s.to_string(),
            source,
        })?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.0.abs().round_dp(2).to_f64().unwrap_or_default();
        write!(f, "{sign}${}", format_num::format_num!(",.2", num))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_plain_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        if self.is_zero() {
            return Amount::ZERO;
        }
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
