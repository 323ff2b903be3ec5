//! Users command - list online-banking users

use anyhow::Result;
use colored::Colorize;

use super::with_session;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let users = with_session("users", true, |session| Ok(session.list_users()?))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "User ID", "Customer ID"]);
    for user in &users {
        table.add_row(vec![
            user.id.to_string(),
            user.name.clone(),
            user.user_id.clone(),
            user.customer_id.clone(),
        ]);
    }

    println!("{}", "Users".bold());
    println!("{}", table);
    Ok(())
}
