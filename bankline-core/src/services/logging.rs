//! Logging service - structured event logging to DuckDB
//!
//! Provides a privacy-safe logging system that stores events in logs.duckdb.
//! No secrets, user ids, account data, or transaction data is ever logged.
//! Identities appear only as credential fingerprints.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    // Lower 16 bits: counter (65536 unique IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (unix_ms() << 16) | counter
}

/// Get current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    unix_ms() as i64
}

/// Detect the current platform
fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Who is driving the sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Library,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Library => "library",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    /// Create a new log event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            profile: None,
            institution: None,
            credential: None,
            operation: None,
            error_message: None,
            error_details: None,
        }
    }

    /// Set the engine profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the institution (bank code)
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    /// Set the credential fingerprint
    pub fn with_credential(mut self, fingerprint: impl Into<String>) -> Self {
        self.credential = Some(fingerprint.into());
        self
    }

    /// Set the operation (query or command name)
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set error information
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Set error details
    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub profile: Option<String>,
    pub institution: Option<String>,
    pub credential: Option<String>,
    pub operation: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Narrowing criteria for log queries; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub event: Option<String>,
    pub profile: Option<String>,
    pub institution: Option<String>,
    pub operation: Option<String>,
    pub errors_only: bool,
}

impl LogFilter {
    /// Only entries with an error message
    pub fn errors() -> Self {
        Self {
            errors_only: true,
            ..Self::default()
        }
    }

    fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        for (column, value) in [
            ("event", &self.event),
            ("profile", &self.profile),
            ("institution", &self.institution),
            ("operation", &self.operation),
        ] {
            if let Some(value) = value {
                conditions.push(format!("{} = ?", column));
                values.push(value.clone());
            }
        }
        if self.errors_only {
            conditions.push("error_message IS NOT NULL".to_string());
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), values)
        }
    }
}

/// Column a log summary is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogField {
    Event,
    Profile,
    Institution,
    Operation,
}

impl LogField {
    fn column(&self) -> &'static str {
        match self {
            LogField::Event => "event",
            LogField::Profile => "profile",
            LogField::Institution => "institution",
            LogField::Operation => "operation",
        }
    }
}

/// Entry and error counts for one value of a [`LogField`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogCount {
    pub value: Option<String>,
    pub total: u64,
    pub errors: u64,
}

const SELECT_COLUMNS: &str = "SELECT id, timestamp, entry_point, app_version, platform, \
     event, profile, institution, credential, operation, error_message, error_details \
     FROM sys_logs";

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Create a new logging service
    ///
    /// Opens or creates logs.duckdb in the data directory and runs any
    /// pending migrations.
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        };

        service.run_migrations()?;

        Ok(service)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.connection()?;

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        // Bootstrap migrations table if needed
        if !table_exists {
            if let Some((name, sql)) = LOG_MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql")
            {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in LOG_MIGRATIONS.iter() {
            if *name == "000_migrations.sql" || applied.iter().any(|a| a == name) {
                continue;
            }
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                [name],
            )?;
        }

        Ok(())
    }

    /// Log an event
    ///
    /// The entry_point, app_version, and platform are added from the
    /// service configuration.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform, event,
                profile, institution, credential, operation, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.profile,
                &event.institution,
                &event.credential,
                &event.operation,
                &event.error_message,
                &event.error_details,
            ],
        )?;

        Ok(())
    }

    /// Log a simple event with just a name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log a CLI command execution
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_operation(command))
    }

    /// Log an error
    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    /// Entries matching `filter`, newest first
    pub fn query(&self, filter: &LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.connection()?;
        let (clause, values) = filter.where_clause();
        let sql = format!(
            "{} {} ORDER BY timestamp DESC, id DESC LIMIT {}",
            SELECT_COLUMNS, clause, limit
        );
        let mut stmt = conn.prepare(&sql)?;

        let entries = stmt
            .query_map(duckdb::params_from_iter(values.iter()), |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    entry_point: row.get(2)?,
                    app_version: row.get(3)?,
                    platform: row.get(4)?,
                    event: row.get(5)?,
                    profile: row.get(6)?,
                    institution: row.get(7)?,
                    credential: row.get(8)?,
                    operation: row.get(9)?,
                    error_message: row.get(10)?,
                    error_details: row.get(11)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::default(), limit)
    }

    /// Most recent entries with an error message
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::errors(), limit)
    }

    /// Entry and error counts grouped by `field`, largest group first
    pub fn count_by(&self, field: LogField) -> Result<Vec<LogCount>> {
        let conn = self.connection()?;
        let column = field.column();
        let sql = format!(
            "SELECT {column}, COUNT(*), COUNT(error_message) FROM sys_logs \
             GROUP BY {column} ORDER BY COUNT(*) DESC, {column} NULLS LAST"
        );
        let mut stmt = conn.prepare(&sql)?;

        let counts = stmt
            .query_map([], |row| {
                let total: i64 = row.get(1)?;
                let errors: i64 = row.get(2)?;
                Ok(LogCount {
                    value: row.get(0)?,
                    total: total as u64,
                    errors: errors as u64,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(counts)
    }

    /// Timestamps (unix ms) of the oldest and newest entry
    pub fn time_span(&self) -> Result<Option<(i64, i64)>> {
        let conn = self.connection()?;
        let span: (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT MIN(timestamp), MAX(timestamp) FROM sys_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(match span {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        })
    }

    /// Get the total number of log entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete logs older than the specified timestamp (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.connection()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Get the path to the logs database
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
