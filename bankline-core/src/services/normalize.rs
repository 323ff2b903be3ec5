//! Normalization of engine-native records into domain snapshots
//!
//! Pure functions: every engine record is copied into an owned domain value
//! or rejected with `MalformedRecord`. Currencies are never guessed.

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Money, Party, Transaction, User};
use crate::ports::{AccountRef, EngineAccount, EngineParty, EngineTransaction, EngineUser, EngineValue};

/// Trim a string field and drop it when blank
fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn user(raw: &EngineUser) -> User {
    let user_id = clean(&raw.user_id).unwrap_or_default();
    User {
        id: raw.unique_id,
        name: clean(&raw.user_name).unwrap_or_default(),
        // Banks hand out the login as customer id unless told otherwise
        customer_id: clean(&raw.customer_id).unwrap_or_else(|| user_id.clone()),
        user_id,
    }
}

pub fn account(raw: &EngineAccount) -> Result<Account> {
    let id = raw.unique_id.trim();
    if id.is_empty() {
        return Err(Error::malformed("account without unique id"));
    }

    Ok(Account {
        id: id.to_string(),
        name: clean(&raw.account_name).unwrap_or_default(),
        owner: clean(&raw.owner_name).unwrap_or_default(),
        currency: clean(&raw.currency).map(|c| Money::normalize_currency(&c)),
        country: clean(&raw.country).map(|c| c.to_lowercase()),
        account_number: clean(&raw.account_number).unwrap_or_default(),
        bank_code: clean(&raw.bank_code).unwrap_or_default(),
        bank_name: clean(&raw.bank_name),
        iban: clean(&raw.iban).map(|iban| Account::normalize_iban(&iban)),
        bic: clean(&raw.bic).map(|bic| bic.to_uppercase()),
    })
}

/// Engine reference for a snapshot account
pub fn account_ref(account: &Account) -> AccountRef {
    AccountRef {
        unique_id: account.id.clone(),
        bank_code: account.bank_code.clone(),
        account_number: account.account_number.clone(),
    }
}

fn party(raw: &EngineParty) -> Party {
    Party {
        bank_code: clean(&raw.bank_code),
        account_number: clean(&raw.account_number),
        iban: clean(&raw.iban).map(|iban| Account::normalize_iban(&iban)),
        bic: clean(&raw.bic).map(|bic| bic.to_uppercase()),
        name: clean(&raw.name),
    }
}

fn money(raw: &EngineValue, field: &str, account_id: &str) -> Result<Money> {
    let currency = raw.currency.as_deref().unwrap_or("");
    Money::new(raw.amount, currency).map_err(|_| {
        Error::malformed(format!(
            "transaction {} on account {} has no currency",
            field, account_id
        ))
    })
}

pub fn transaction(raw: &EngineTransaction, account_id: &str) -> Result<Transaction> {
    let booking_date = raw.date.or(raw.valuta_date).ok_or_else(|| {
        Error::malformed(format!("transaction on account {} has no date", account_id))
    })?;

    let value = raw.value.as_ref().ok_or_else(|| {
        Error::malformed(format!("transaction on account {} has no amount", account_id))
    })?;
    let total = money(value, "total", account_id)?;

    // No fee block means no fee; a fee amount without currency is a defect
    let fee = match &raw.fees {
        Some(fees) => money(fees, "fee", account_id)?,
        None => total.zeroed(),
    };

    let purpose = raw
        .purpose
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Transaction {
        account_id: account_id.to_string(),
        purpose,
        text: clean(&raw.transaction_text),
        status: clean(&raw.status),
        mandate_reference: clean(&raw.mandate_id),
        customer_reference: clean(&raw.customer_reference),
        local: party(&raw.local),
        remote: party(&raw.remote),
        booking_date,
        value_date: raw.valuta_date,
        total,
        fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn value(cents: i64, currency: Option<&str>) -> EngineValue {
        EngineValue {
            amount: Decimal::new(cents, 2),
            currency: currency.map(str::to_string),
        }
    }

    fn raw_transaction() -> EngineTransaction {
        EngineTransaction {
            purpose: vec!["  RENT MAY ".to_string(), "".to_string(), "FLAT 3".to_string()],
            transaction_text: Some("DAUERAUFTRAG".to_string()),
            date: NaiveDate::from_ymd_opt(2014, 5, 15),
            valuta_date: NaiveDate::from_ymd_opt(2014, 5, 16),
            value: Some(value(-75000, Some("eur"))),
            fees: None,
            remote: EngineParty {
                iban: Some("de02 1203 0000 0000 2020 51".to_string()),
                name: Some(" Landlord ".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_user_customer_id_defaults_to_login() {
        let raw = EngineUser {
            unique_id: 3,
            user_name: Some("Erika".to_string()),
            user_id: Some("u1".to_string()),
            customer_id: None,
        };
        let user = user(&raw);
        assert_eq!(user.id, 3);
        assert_eq!(user.customer_id, "u1");
    }

    #[test]
    fn test_account_normalization() {
        let raw = EngineAccount {
            unique_id: "17".to_string(),
            account_name: Some("Girokonto".to_string()),
            currency: Some("eur".to_string()),
            country: Some("DE".to_string()),
            iban: Some("de89 3704 0044 0532 0130 00".to_string()),
            bank_name: Some("   ".to_string()),
            ..Default::default()
        };
        let account = account(&raw).unwrap();
        assert_eq!(account.currency.as_deref(), Some("EUR"));
        assert_eq!(account.country.as_deref(), Some("de"));
        assert_eq!(account.iban.as_deref(), Some("DE89370400440532013000"));
        assert!(account.bank_name.is_none());
    }

    #[test]
    fn test_account_without_id_is_malformed() {
        let err = account(&EngineAccount::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }

    #[test]
    fn test_transaction_normalization() {
        let tx = transaction(&raw_transaction(), "17").unwrap();
        assert_eq!(tx.account_id, "17");
        assert_eq!(tx.purpose, "RENT MAY\nFLAT 3");
        assert_eq!(tx.total.currency(), "EUR");
        assert_eq!(tx.total.amount(), Decimal::new(-75000, 2));
        assert!(tx.fee.is_zero());
        assert_eq!(tx.fee.currency(), "EUR");
        assert_eq!(tx.remote.name.as_deref(), Some("Landlord"));
        assert_eq!(tx.remote.iban.as_deref(), Some("DE02120300000000202051"));
        assert_eq!(tx.value_date, NaiveDate::from_ymd_opt(2014, 5, 16));
    }

    #[test]
    fn test_missing_total_currency_is_malformed() {
        let mut raw = raw_transaction();
        raw.value = Some(value(-75000, None));
        let err = transaction(&raw, "17").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
        assert!(err.to_string().contains("total"));
    }

    #[test]
    fn test_missing_fee_currency_is_malformed() {
        let mut raw = raw_transaction();
        raw.fees = Some(value(-250, Some(" ")));
        let err = transaction(&raw, "17").unwrap_err();
        assert!(err.to_string().contains("fee"));
    }

    #[test]
    fn test_booking_date_falls_back_to_valuta() {
        let mut raw = raw_transaction();
        raw.date = None;
        let tx = transaction(&raw, "17").unwrap();
        assert_eq!(tx.booking_date, NaiveDate::from_ymd_opt(2014, 5, 16).unwrap());

        raw.valuta_date = None;
        assert!(transaction(&raw, "17").is_err());
    }
}
