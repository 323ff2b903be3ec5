//! CLI command implementations

pub mod accounts;
pub mod logs;
pub mod transactions;
pub mod users;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dialoguer::Password;

use bankline_core::config::{CredentialEntry, PinFile};
use bankline_core::services::{BankingSession, EntryPoint, LogEvent, LoggingService};
use bankline_core::BanklineContext;

use crate::output;

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the bankline directory from environment or default
pub fn get_bankline_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".bankline"))
}

/// Get or create bankline context
pub fn get_context() -> Result<BanklineContext> {
    let bankline_dir = get_bankline_dir()?;
    std::fs::create_dir_all(&bankline_dir)
        .with_context(|| format!("Failed to create bankline directory: {:?}", bankline_dir))?;
    BanklineContext::new(&bankline_dir, EntryPoint::Cli)
}

/// Secret for an entry without a stored PIN, asked for on a terminal
///
/// Error messages name the bank and the entry position only: they end up in
/// the event log, which never holds login ids.
fn prompt_secret(position: usize, entry: &CredentialEntry) -> Result<Option<String>> {
    if entry.has_pin() {
        return Ok(None);
    }
    if atty::isnt(atty::Stream::Stdin) {
        bail!(
            "No PIN for credential entry {} (bank {}) and stdin is not a terminal",
            position,
            entry.blz
        );
    }
    let pin = Password::new()
        .with_prompt(format!("PIN for {}/{}", entry.blz, entry.uid))
        .interact()?;
    Ok(Some(pin))
}

/// Register every login from the credential file with the session
fn register_credentials(ctx: &BanklineContext, session: &mut BankingSession) -> Result<usize> {
    let pins_path = ctx.config.resolved_pins_file(&ctx.data_dir);
    let entries = PinFile::load(&pins_path)?;
    if entries.is_empty() {
        output::warning(&format!("No credentials in {}", pins_path.display()));
    }

    let count = entries.len();
    for (index, entry) in entries.into_iter().enumerate() {
        let secret = prompt_secret(index + 1, &entry)?;
        let credential = entry.into_credential(secret)?;
        let institution = credential.institution_code().to_string();
        let fingerprint = credential.fingerprint();
        session.register(credential).with_context(|| {
            format!(
                "Failed to register credential {} at bank {}",
                fingerprint, institution
            )
        })?;
    }
    Ok(count)
}

/// Run `f` against an open session and release it afterwards
///
/// With `with_credentials` set, the credential file is loaded and registered
/// first.
pub fn with_session<T, F>(command: &str, with_credentials: bool, f: F) -> Result<T>
where
    F: FnOnce(&mut BankingSession) -> Result<T>,
{
    let ctx = get_context()?;
    run_with_context(&ctx, command, with_credentials, f)
}

fn run_with_context<T, F>(
    ctx: &BanklineContext,
    command: &str,
    with_credentials: bool,
    f: F,
) -> Result<T>
where
    F: FnOnce(&mut BankingSession) -> Result<T>,
{
    if let Some(logger) = &ctx.logger {
        let _ = logger.log_command(command);
    }

    let mut session = ctx.open_session()?;

    let outcome = if with_credentials {
        register_credentials(ctx, &mut session).and_then(|_| f(&mut session))
    } else {
        f(&mut session)
    };
    let released = session.release();

    if let Err(e) = &outcome {
        log_event(
            &ctx.logger,
            LogEvent::new("command_failed")
                .with_operation(command)
                .with_error(format!("{:#}", e)),
        );
    }

    let value = outcome?;
    released?;
    Ok(value)
}
