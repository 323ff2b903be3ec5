//! Bankline Core - session and query layer over online-banking engines
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Snapshot entities (User, Account, Transaction, Credential, ...)
//! - **ports**: Trait definitions for the banking engine
//! - **services**: Session lifecycle, credential registry, normalization, logging
//! - **adapters**: Concrete engines (demo)

pub mod adapters;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use config::Config;
use ports::EngineBackend;
use services::{BankingSession, EntryPoint, LoggingService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    Account, Credential, CredentialKey, DateRange, EngineVersion, Money, Party, Transaction, User,
};
pub use services::SessionState;

/// Main context for Bankline operations
///
/// Holds the configuration, the selected engine backend and the event log
/// for one data directory. Sessions are created from it on demand.
pub struct BanklineContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub backend: Arc<dyn EngineBackend>,
    pub logger: Option<Arc<LoggingService>>,
}

impl BanklineContext {
    /// Create a context for a data directory
    ///
    /// The event log is optional: if it cannot be opened the context still
    /// works, just without logging.
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;
        let backend = adapters::backend_for(&config.engine)?;
        let logger = LoggingService::new(data_dir, entry_point, env!("CARGO_PKG_VERSION"))
            .ok()
            .map(Arc::new);

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            backend,
            logger,
        })
    }

    /// Engine working directory for this context
    pub fn working_dir(&self) -> PathBuf {
        self.config.resolved_working_dir(&self.data_dir)
    }

    /// Open a session with the configured profile and working directory
    pub fn open_session(&self) -> domain::result::Result<BankingSession> {
        let mut session = BankingSession::new(Arc::clone(&self.backend));
        if let Some(logger) = &self.logger {
            session = session.with_logger(Arc::clone(logger));
        }
        session.initialize(&self.config.profile, self.working_dir())?;
        Ok(session)
    }
}
