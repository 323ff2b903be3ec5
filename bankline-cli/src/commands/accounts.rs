//! Accounts command - list reachable accounts

use anyhow::Result;
use colored::Colorize;

use super::with_session;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let accounts = with_session("accounts", true, |session| Ok(session.list_accounts()?))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Owner", "Bank", "Number", "IBAN", "Currency"]);
    for account in &accounts {
        let bank = match &account.bank_name {
            Some(name) => format!("{} ({})", name, account.bank_code),
            None => account.bank_code.clone(),
        };
        table.add_row(vec![
            account.id.clone(),
            account.display_name().to_string(),
            account.owner.clone(),
            bank,
            account.account_number.clone(),
            account.iban.clone().unwrap_or_default(),
            account.currency.clone().unwrap_or_default(),
        ]);
    }

    println!("{} ({})", "Accounts".bold(), accounts.len());
    println!("{}", table);
    Ok(())
}
