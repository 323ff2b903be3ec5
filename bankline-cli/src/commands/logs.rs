//! Logs command - inspect and prune the session event log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;

use bankline_core::services::{
    EntryPoint, LogCount, LogEntry, LogField, LogFilter, LoggingService,
};

use super::get_bankline_dir;
use crate::output;

const ERROR_WIDTH: usize = 60;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Only this event name (e.g. session_opened, query_failed)
        #[arg(long)]
        event: Option<String>,
        /// Only this engine profile
        #[arg(long)]
        profile: Option<String>,
        /// Only this bank code
        #[arg(long)]
        institution: Option<String>,
        /// Only this operation (e.g. list_accounts, transactions)
        #[arg(long)]
        operation: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old log entries
    Clear {
        /// Delete entries older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Entry counts per event and operation
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let bankline_dir = get_bankline_dir()?;
    std::fs::create_dir_all(&bankline_dir)?;
    LoggingService::new(&bankline_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", cut)
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            limit,
            errors,
            event,
            profile,
            institution,
            operation,
            json,
        } => {
            let filter = LogFilter {
                event,
                profile,
                institution,
                operation,
                errors_only: errors,
            };
            let entries = open_log()?.query(&filter, limit)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No matching log entries.");
            } else {
                println!("{}", entries_table(&entries));
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let service = open_log()?;
            let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));

            if !force && !json {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete log entries from before {}?",
                        cutoff.format("%Y-%m-%d %H:%M")
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = service.delete_before(cutoff.timestamp_millis())?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "deleted": deleted,
                        "cutoff": cutoff.to_rfc3339(),
                    })
                );
            } else {
                output::success(&format!("Deleted {} log entries", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let service = open_log()?;
            let total = service.count()?;
            let span = service.time_span()?;
            let by_event = service.count_by(LogField::Event)?;
            let by_operation = service.count_by(LogField::Operation)?;
            let errors: u64 = by_event.iter().map(|c| c.errors).sum();
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "totalEntries": total,
                        "errorCount": errors,
                        "firstEntry": span.map(|(first, _)| format_timestamp(first)),
                        "lastEntry": span.map(|(_, last)| format_timestamp(last)),
                        "byEvent": by_event,
                        "byOperation": by_operation,
                        "databasePath": db_path.to_string_lossy(),
                        "databaseSizeBytes": size_bytes,
                    }))?
                );
                return Ok(());
            }

            println!("{}", "Event log".bold());
            println!("  Entries: {} ({} failed)", total, errors);
            if let Some((first, last)) = span {
                println!(
                    "  Range:   {} .. {}",
                    format_timestamp(first),
                    format_timestamp(last)
                );
            }
            println!(
                "  File:    {} ({})",
                db_path.display(),
                output::format_size(size_bytes)
            );

            if !by_event.is_empty() {
                println!();
                println!("{}", counts_table("Event", &by_event));
            }
            if by_operation.iter().any(|c| c.value.is_some()) {
                println!();
                println!("{}", counts_table("Operation", &by_operation));
            }
        }
    }

    Ok(())
}

fn entries_table(entries: &[LogEntry]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec![
        "Time",
        "Event",
        "Profile",
        "Bank",
        "Credential",
        "Operation",
        "Error",
    ]);

    for entry in entries {
        let error = entry
            .error_message
            .as_deref()
            .map(|message| truncate(message, ERROR_WIDTH).red().to_string())
            .unwrap_or_default();

        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event.clone(),
            or_dash(entry.profile.as_deref()),
            or_dash(entry.institution.as_deref()),
            or_dash(entry.credential.as_deref()),
            or_dash(entry.operation.as_deref()),
            error,
        ]);
    }

    table
}

fn counts_table(label: &str, counts: &[LogCount]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec![label, "Entries", "Failed"]);

    for count in counts {
        let failed = if count.errors > 0 {
            count.errors.to_string().red().to_string()
        } else {
            "0".to_string()
        };
        table.add_row(vec![
            or_dash(count.value.as_deref()),
            count.total.to_string(),
            failed,
        ]);
    }

    table
}
