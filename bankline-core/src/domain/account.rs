//! Account domain model

use serde::{Deserialize, Serialize};

/// A bank account as reported by the engine at query time
///
/// Read-only snapshot: it holds no reference into engine state. `id` is the
/// engine's unique account id and is what transaction queries are keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub owner: String,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: Option<String>,
    /// ISO 3166 country code, normalized to lowercase
    pub country: Option<String>,
    pub account_number: String,
    pub bank_code: String,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
}

impl Account {
    /// Create a new account with required fields
    pub fn new(
        id: impl Into<String>,
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            owner: String::new(),
            currency: None,
            country: None,
            account_number: account_number.into(),
            bank_code: bank_code.into(),
            bank_name: None,
            iban: None,
            bic: None,
        }
    }

    /// Name to show for the account, falling back to the account number
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.account_number
        } else {
            &self.name
        }
    }

    /// Normalize an IBAN to its electronic form (no spaces, uppercase)
    pub fn normalize_iban(iban: &str) -> String {
        iban.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        let mut account = Account::new("1", "10000000", "1234567890");
        assert_eq!(account.display_name(), "1234567890");

        account.name = "Girokonto".to_string();
        assert_eq!(account.display_name(), "Girokonto");
    }

    #[test]
    fn test_iban_normalization() {
        assert_eq!(
            Account::normalize_iban("de89 3704 0044 0532 0130 00"),
            "DE89370400440532013000"
        );
    }
}
