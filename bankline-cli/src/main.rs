//! Bankline CLI - online-banking accounts in your terminal

use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{accounts, logs, transactions, users, version};

/// Bankline - online-banking accounts in your terminal
#[derive(Parser)]
#[command(name = "bl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the banking engine and its version
    Version {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List online-banking users for the configured credentials
    Users {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List accounts reachable with the configured credentials
    Accounts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions
    Transactions {
        /// First booking date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last booking date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Account id, account number or IBAN (all accounts if omitted)
        #[arg(long)]
        account: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version { json } => version::run(json),
        Commands::Users { json } => users::run(json),
        Commands::Accounts { json } => accounts::run(json),
        Commands::Transactions { from, to, account, json } => {
            transactions::run(from, to, account.as_deref(), json)
        }
        Commands::Logs { command } => logs::run(command),
    }
}
