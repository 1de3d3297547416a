//! # Minor-Unit Amounts
//!
//! Balances and payment amounts are held as a signed count of minor units
//! (cents). Parsing goes through the decimal text of the value, so `150.1`,
//! `"150.10"` and `15010` minor units all meet at the same integer without a
//! float ever being involved.
//!
//! Negative amounts are representable because a registration can be
//! over-paid; the payment subflow treats anything `<= 0` as nothing owed.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of minor units per major unit.
const MINOR_PER_MAJOR: i64 = 100;

/// A monetary amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Build an amount from minor units.
    pub const fn from_minor_units(minor: i64) -> Self {
        Self(minor)
    }

    /// The amount in minor units.
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Whether anything is owed.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parse a decimal string such as `"150"`, `"-3.5"` or `"19.99"`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidAmount`] for anything other than an
    ///   optional sign, digits, and an optional fraction of one or two digits.
    /// - [`ValidationError::AmountOutOfRange`] if the value overflows `i64`
    ///   minor units.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let s = text.trim();
        let invalid = || ValidationError::InvalidAmount(text.to_string());

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if unsigned.contains('.') && (fraction.is_empty() || fraction.len() > 2) {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let out_of_range = || ValidationError::AmountOutOfRange(text.to_string());
        let major: i64 = whole.parse().map_err(|_| out_of_range())?;
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid())?,
        };

        let total = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(minor))
            .ok_or_else(out_of_range)?;
        Ok(Self(if negative { -total } else { total }))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

impl std::str::FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Numbers are re-read from their decimal text; `150.5` becomes "150.5".
        let raw = serde_json::Value::deserialize(deserializer)?;
        let text = match &raw {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected amount as string or number, got {other}"
                )))
            }
        };
        Amount::parse(&text).map_err(serde::de::Error::custom)
    }
}
