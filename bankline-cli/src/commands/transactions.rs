//! Transactions command - list account transactions

use anyhow::{bail, Result};
use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::Cell;

use bankline_core::services::BankingSession;
use bankline_core::{Account, DateRange, Transaction};

use super::with_session;
use crate::output;

/// Whether `selector` names this account by id, number or IBAN
fn matches_account(account: &Account, selector: &str) -> bool {
    let selector = selector.trim();
    account.id == selector
        || account.account_number == selector
        || account
            .iban
            .as_deref()
            .map_or(false, |iban| iban == Account::normalize_iban(selector))
}

fn fetch(
    session: &mut BankingSession,
    account: &Account,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> bankline_core::domain::result::Result<Vec<Transaction>> {
    match (from, to) {
        (Some(from), Some(to)) => session.transactions_in_range(account, from, to),
        (None, None) => session.transactions_all(account),
        _ => session.transactions(account, DateRange::new(from, to)?),
    }
}

fn counterparty(tx: &Transaction) -> String {
    tx.remote
        .name
        .clone()
        .or_else(|| tx.remote.iban.clone())
        .unwrap_or_default()
}

pub fn run(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    account: Option<&str>,
    json: bool,
) -> Result<()> {
    // Reject a reversed window before any PIN prompt
    DateRange::new(from, to)?;

    let listing = with_session("transactions", true, |session| {
        let accounts: Vec<Account> = session
            .list_accounts()?
            .into_iter()
            .filter(|a| account.map_or(true, |sel| matches_account(a, sel)))
            .collect();

        if let (Some(selector), true) = (account, accounts.is_empty()) {
            bail!("No account matches '{}'", selector);
        }

        let mut listing = Vec::with_capacity(accounts.len());
        for acc in accounts {
            let txs = fetch(session, &acc, from, to)?;
            listing.push((acc, txs));
        }
        Ok(listing)
    })?;

    if json {
        let all: Vec<&Transaction> = listing.iter().flat_map(|(_, txs)| txs.iter()).collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    for (acc, txs) in &listing {
        println!(
            "{} {} ({})",
            acc.display_name().bold(),
            acc.iban.as_deref().unwrap_or(&acc.account_number),
            txs.len()
        );

        if txs.is_empty() {
            println!("  No transactions in range.");
            println!();
            continue;
        }

        let mut table = output::create_table();
        table.set_header(vec!["Booked", "Valuta", "Amount", "Fee", "Counterparty", "Purpose"]);
        for tx in txs {
            table.add_row(vec![
                Cell::new(tx.booking_date.to_string()),
                Cell::new(tx.value_date.map(|d| d.to_string()).unwrap_or_default()),
                output::money_cell(&tx.total),
                output::money_cell(&tx.fee),
                Cell::new(counterparty(tx)),
                Cell::new(tx.purpose.replace('\n', " ")),
            ]);
        }
        println!("{}", table);
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_selector() {
        let mut account = Account::new("10000000-1234567801", "10000000", "1234567801");
        account.iban = Some("DE02100000001234567801".to_string());

        assert!(matches_account(&account, "10000000-1234567801"));
        assert!(matches_account(&account, "1234567801"));
        assert!(matches_account(&account, "de02 1000 0000 1234 5678 01"));
        assert!(!matches_account(&account, "999"));
    }
}
