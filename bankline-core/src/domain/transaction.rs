//! Transaction domain model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// One side of a transfer (our account or the counterparty)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub name: Option<String>,
}

impl Party {
    pub fn is_empty(&self) -> bool {
        self.bank_code.is_none()
            && self.account_number.is_none()
            && self.iban.is_none()
            && self.bic.is_none()
            && self.name.is_none()
    }
}

/// A single booked (or pending) transaction belonging to an account
///
/// Both `total` and `fee` carry their own currency; there is no way to build
/// a transaction with a bare amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub account_id: String,
    /// Purpose / narrative lines joined with newlines
    pub purpose: String,
    /// Booking text (free-text memo)
    pub text: Option<String>,
    pub status: Option<String>,
    pub mandate_reference: Option<String>,
    pub customer_reference: Option<String>,
    pub local: Party,
    pub remote: Party,
    pub booking_date: NaiveDate,
    pub value_date: Option<NaiveDate>,
    pub total: Money,
    /// Zero in the currency of `total` when the engine reports no fee at all;
    /// a reported fee amount must carry its own currency
    pub fee: Money,
}

impl Transaction {
    /// Create a new transaction with required fields and no fee
    pub fn new(
        account_id: impl Into<String>,
        booking_date: NaiveDate,
        total: Money,
    ) -> Self {
        let fee = total.zeroed();
        Self {
            account_id: account_id.into(),
            purpose: String::new(),
            text: None,
            status: None,
            mandate_reference: None,
            customer_reference: None,
            local: Party::default(),
            remote: Party::default(),
            booking_date,
            value_date: None,
            total,
            fee,
        }
    }

    /// Sum of total and fee when both are in the same currency
    pub fn net(&self) -> Option<Money> {
        if self.total.currency() != self.fee.currency() {
            return None;
        }
        Money::new(self.total.amount() + self.fee.amount(), self.total.currency()).ok()
    }
}
