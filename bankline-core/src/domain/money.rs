//! Monetary value with its currency

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// An amount that always travels with an explicit ISO 4217 currency code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr")]
pub struct Money {
    amount: Decimal,
    currency: String,
}

#[derive(Deserialize)]
struct MoneyRepr {
    amount: Decimal,
    currency: String,
}

impl TryFrom<MoneyRepr> for Money {
    type Error = Error;

    fn try_from(repr: MoneyRepr) -> Result<Self> {
        Money::new(repr.amount, &repr.currency)
    }
}

impl Money {
    /// Pair an amount with its currency. A blank currency is rejected.
    pub fn new(amount: Decimal, currency: &str) -> Result<Self> {
        let currency = Self::normalize_currency(currency);
        if currency.is_empty() {
            return Err(Error::malformed(format!("amount {} has no currency", amount)));
        }
        Ok(Self { amount, currency })
    }

    /// Zero in the given currency
    pub fn zero(currency: &str) -> Result<Self> {
        Self::new(Decimal::ZERO, currency)
    }

    /// Zero in this value's currency
    pub fn zeroed(&self) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: self.currency.clone(),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount.round_dp(2), self.currency)
    }
}
