//! Banking session - engine handle lifecycle and the query façade
//!
//! A session moves `Uninitialized -> Open -> Released` and never back. It
//! exclusively owns its engine handle and credential registry; every query
//! returns detached snapshots.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::logging::{LogEvent, LoggingService};
use super::normalize;
use super::registry::CredentialRegistry;
use super::runtime::{self, RuntimeLease};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Credential, DateRange, EngineVersion, Transaction, User};
use crate::ports::{BankingEngine, EngineBackend};

/// Oldest engine line this layer knows how to drive
pub const MIN_ENGINE_VERSION: EngineVersion = EngineVersion::new(5, 0, 0);

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Open,
    Released,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Open => "open",
            SessionState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Everything that only exists while the session is open
struct OpenSession {
    engine: Box<dyn BankingEngine>,
    registry: CredentialRegistry,
    lease: RuntimeLease,
    profile: String,
    working_dir: PathBuf,
    version: EngineVersion,
}

enum Lifecycle {
    Uninitialized,
    Open(OpenSession),
    Released,
}

/// One connection to a banking engine under a set of credentials
///
/// Not meant for concurrent use: all engine calls go through `&mut self`.
/// Distinct sessions (distinct working directories) are independent.
pub struct BankingSession {
    backend: Arc<dyn EngineBackend>,
    lifecycle: Lifecycle,
    logger: Option<Arc<LoggingService>>,
}

impl BankingSession {
    /// Create an uninitialized session for a backend
    pub fn new(backend: Arc<dyn EngineBackend>) -> Self {
        Self {
            backend,
            lifecycle: Lifecycle::Uninitialized,
            logger: None,
        }
    }

    /// Create and initialize a session in one step
    pub fn open(
        backend: Arc<dyn EngineBackend>,
        profile: &str,
        working_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let mut session = Self::new(backend);
        session.initialize(profile, working_dir)?;
        Ok(session)
    }

    /// Run `f` against an open session and release it afterwards
    ///
    /// The session is released exactly once whether `f` succeeds or fails.
    /// An error from `f` takes precedence over a teardown error.
    pub fn scoped<T, F>(
        backend: Arc<dyn EngineBackend>,
        profile: &str,
        working_dir: impl AsRef<Path>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut BankingSession) -> Result<T>,
    {
        let mut session = Self::open(backend, profile, working_dir)?;
        let outcome = f(&mut session);
        let released = session.release();
        let value = outcome?;
        released?;
        Ok(value)
    }

    /// Attach an event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Construct the engine handle: `Uninitialized -> Open`
    ///
    /// On failure the session stays uninitialized and may be retried.
    pub fn initialize(&mut self, profile: &str, working_dir: impl AsRef<Path>) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Open(_) => return Err(Error::lifecycle("session is already open")),
            Lifecycle::Released => {
                return Err(Error::lifecycle("a released session cannot be reopened"))
            }
        }

        let profile = profile.trim();
        if profile.is_empty() {
            return Err(Error::EngineInit("profile name cannot be empty".to_string()));
        }

        let version = self.backend.version();
        if version < MIN_ENGINE_VERSION {
            return Err(Error::EngineInit(format!(
                "{} engine {} is older than supported {}",
                self.backend.name(),
                version,
                MIN_ENGINE_VERSION
            )));
        }

        let working_dir = working_dir.as_ref().to_path_buf();
        let lease = runtime::acquire(self.backend.as_ref())?;

        let engine = match self.backend.construct(profile, &working_dir) {
            Ok(engine) => engine,
            Err(e) => {
                // Construction failed: hand the lease back, nothing else exists yet
                if let Err(release_err) = runtime::release(lease, self.backend.as_ref()) {
                    self.log(
                        LogEvent::new("session_release_failed")
                            .with_profile(profile)
                            .with_operation("process_shutdown")
                            .with_error(release_err.to_string()),
                    );
                }
                self.log(
                    LogEvent::new("session_init_failed")
                        .with_profile(profile)
                        .with_error(e.to_string()),
                );
                return Err(Error::EngineInit(format!(
                    "cannot construct {} engine at {}: {}",
                    self.backend.name(),
                    working_dir.display(),
                    e
                )));
            }
        };

        self.lifecycle = Lifecycle::Open(OpenSession {
            engine,
            registry: CredentialRegistry::new(),
            lease,
            profile: profile.to_string(),
            working_dir,
            version,
        });
        self.log(LogEvent::new("session_opened").with_profile(profile));
        Ok(())
    }

    /// Destroy the engine handle and wipe credentials: `Open -> Released`
    ///
    /// Releasing a session that is not open is a lifecycle error. A teardown
    /// failure is reported, but the session counts as released either way.
    pub fn release(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Open(_) => {}
            Lifecycle::Uninitialized => {
                return Err(Error::lifecycle("cannot release a session that was never opened"))
            }
            Lifecycle::Released => return Err(Error::lifecycle("session already released")),
        }

        let result = self.teardown();
        match &result {
            Ok(()) => self.log(LogEvent::new("session_released")),
            Err(e) => self.log(LogEvent::new("session_release_failed").with_error(e.to_string())),
        }
        result
    }

    fn teardown(&mut self) -> Result<()> {
        let open = match std::mem::replace(&mut self.lifecycle, Lifecycle::Released) {
            Lifecycle::Open(open) => open,
            other => {
                self.lifecycle = other;
                return Ok(());
            }
        };

        let OpenSession {
            engine,
            mut registry,
            lease,
            ..
        } = open;

        registry.clear();
        let destroyed = engine.destroy().map_err(Error::Teardown);
        let released = runtime::release(lease, self.backend.as_ref());
        destroyed.and(released)
    }

    pub fn state(&self) -> SessionState {
        match self.lifecycle {
            Lifecycle::Uninitialized => SessionState::Uninitialized,
            Lifecycle::Open(_) => SessionState::Open,
            Lifecycle::Released => SessionState::Released,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Engine version, populated once the session is open
    pub fn version(&self) -> Option<EngineVersion> {
        self.open_ref().ok().map(|open| open.version)
    }

    pub fn profile(&self) -> Option<&str> {
        self.open_ref().ok().map(|open| open.profile.as_str())
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.open_ref().ok().map(|open| open.working_dir.as_path())
    }

    pub fn registry(&self) -> Result<&CredentialRegistry> {
        Ok(&self.open_ref()?.registry)
    }

    fn open_ref(&self) -> Result<&OpenSession> {
        match &self.lifecycle {
            Lifecycle::Open(open) => Ok(open),
            _ => Err(Error::SessionNotOpen),
        }
    }

    fn open_mut(&mut self) -> Result<&mut OpenSession> {
        match &mut self.lifecycle {
            Lifecycle::Open(open) => Ok(open),
            _ => Err(Error::SessionNotOpen),
        }
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let event = match self.profile() {
                Some(profile) if event.profile.is_none() => event.with_profile(profile),
                _ => event,
            };
            // Logging must never break a banking operation
            let _ = logger.log(event);
        }
    }

    fn log_failure(&self, operation: &str, error: &Error) {
        self.log(
            LogEvent::new("query_failed")
                .with_operation(operation)
                .with_error(error.to_string()),
        );
    }

    // === Credentials ===

    /// Register a credential with the engine and mirror it locally
    ///
    /// Must not overlap with an in-flight query; `&mut self` enforces that.
    pub fn register(&mut self, credential: Credential) -> Result<()> {
        let institution = credential.institution_code().to_string();
        let fingerprint = credential.fingerprint();

        let open = self.open_mut()?;
        let result = open.registry.register(open.engine.as_mut(), credential);

        let event = match &result {
            Ok(()) => LogEvent::new("credential_registered"),
            Err(e) => LogEvent::new("credential_register_failed").with_error(e.to_string()),
        };
        self.log(event.with_institution(institution).with_credential(fingerprint));
        result
    }

    /// Look up a registered credential
    pub fn lookup(&self, institution_code: &str, user_id: &str) -> Result<&Credential> {
        self.open_ref()?.registry.lookup(institution_code, user_id)
    }

    // === Queries ===

    /// Users known to the engine for the registered credentials
    ///
    /// The engine-side collection is freed before this returns.
    pub fn list_users(&mut self) -> Result<Vec<User>> {
        let open = self.open_mut()?;

        let result = open
            .engine
            .list_users()
            .map_err(|e| Error::query_failed("list_users", e))
            .and_then(|list| {
                let users: Vec<User> = list.users.iter().map(normalize::user).collect();
                open.engine
                    .free_user_list(list.handle)
                    .map_err(|e| Error::query_failed("free_user_list", e))?;
                Ok(users)
            });

        if let Err(e) = &result {
            self.log_failure("list_users", e);
        }
        result
    }

    /// Accounts reachable under the registered credentials, in engine order
    ///
    /// An account reported twice (e.g. shared by two logins) appears once.
    pub fn list_accounts(&mut self) -> Result<Vec<Account>> {
        let open = self.open_mut()?;

        let result = open
            .engine
            .list_accounts()
            .map_err(|e| Error::query_failed("list_accounts", e))
            .and_then(|raw| {
                let mut seen = HashSet::new();
                let mut accounts = Vec::with_capacity(raw.len());
                for record in &raw {
                    let account = normalize::account(record)?;
                    if seen.insert(account.id.clone()) {
                        accounts.push(account);
                    }
                }
                Ok(accounts)
            });

        if let Err(e) = &result {
            self.log_failure("list_accounts", e);
        }
        result
    }

    /// Transactions of `account` booked within `[from, to]`
    pub fn transactions_in_range(
        &mut self,
        account: &Account,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        self.open_ref()?;
        let range = DateRange::bounded(from, to)?;
        self.transactions(account, range)
    }

    /// The engine's full retrievable history for `account`
    pub fn transactions_all(&mut self, account: &Account) -> Result<Vec<Transaction>> {
        self.transactions(account, DateRange::unbounded())
    }

    /// Transactions of `account` within `range` (open bounds allowed)
    ///
    /// Records the engine returns outside the window are dropped.
    pub fn transactions(&mut self, account: &Account, range: DateRange) -> Result<Vec<Transaction>> {
        let open = self.open_mut()?;
        let account_ref = normalize::account_ref(account);

        let result = open
            .engine
            .list_transactions(&account_ref, range.from(), range.to())
            .map_err(|e| Error::query_failed("list_transactions", e))
            .and_then(|raw| {
                let mut transactions = Vec::with_capacity(raw.len());
                for record in &raw {
                    let tx = normalize::transaction(record, &account_ref.unique_id)?;
                    if range.contains(tx.booking_date) {
                        transactions.push(tx);
                    }
                }
                Ok(transactions)
            });

        if let Err(e) = &result {
            self.log_failure("list_transactions", e);
        }
        result
    }
}

impl Drop for BankingSession {
    fn drop(&mut self) {
        // Leaked open sessions still give their handle and lease back
        if self.is_open() {
            let _ = self.teardown();
        }
    }
}

impl fmt::Debug for BankingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankingSession")
            .field("backend", &self.backend.name())
            .field("state", &self.state())
            .field("profile", &self.profile())
            .field("working_dir", &self.working_dir())
            .finish()
    }
}
