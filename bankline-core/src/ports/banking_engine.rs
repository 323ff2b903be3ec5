//! Banking engine port
//!
//! Defines the interface to the protocol engine that talks to the bank
//! (HBCI/FinTS dialogs, signing, transport). The session layer drives an
//! engine only through these traits and never sees protocol structures
//! beyond the plain records below.

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::EngineVersion;

/// Failure reported by an engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no credentials registered")]
    NoCredentials,

    #[error("credential rejected: {0}")]
    Rejected(String),

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("engine state error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

/// Engine result type
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine-native user record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineUser {
    pub unique_id: u32,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
}

/// Opaque token for an engine-side user collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserListHandle(pub u64);

/// A user collection still backed by engine memory
///
/// Must be handed back through [`BankingEngine::free_user_list`] once the
/// records have been copied out.
#[derive(Debug)]
pub struct EngineUserList {
    pub handle: UserListHandle,
    pub users: Vec<EngineUser>,
}

/// Reference the engine uses to address one of its accounts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountRef {
    pub unique_id: String,
    pub bank_code: String,
    pub account_number: String,
}

/// Engine-native account record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineAccount {
    pub unique_id: String,
    pub account_name: Option<String>,
    pub owner_name: Option<String>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub account_number: Option<String>,
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
}

/// Engine-native monetary value; the currency may be missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineValue {
    pub amount: Decimal,
    pub currency: Option<String>,
}

/// Engine-native party fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineParty {
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub name: Option<String>,
}

/// Engine-native transaction record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineTransaction {
    /// Purpose lines as delivered (SWIFT field 86 style)
    pub purpose: Vec<String>,
    pub transaction_text: Option<String>,
    pub status: Option<String>,
    pub mandate_id: Option<String>,
    pub customer_reference: Option<String>,
    pub local: EngineParty,
    pub remote: EngineParty,
    pub date: Option<NaiveDate>,
    pub valuta_date: Option<NaiveDate>,
    pub value: Option<EngineValue>,
    pub fees: Option<EngineValue>,
}

/// A live engine handle
///
/// Calls are not safe to interleave: the session serializes them through
/// `&mut self`.
pub trait BankingEngine: Send {
    /// Add (or replace) a PIN for a bank + user pair in the engine's auth store
    fn register_credential(
        &mut self,
        institution_code: &str,
        user_id: &str,
        secret: &str,
    ) -> EngineResult<()>;

    /// List users known for the registered credentials
    fn list_users(&mut self) -> EngineResult<EngineUserList>;

    /// Release an engine-side user collection
    fn free_user_list(&mut self, handle: UserListHandle) -> EngineResult<()>;

    /// List accounts reachable under the registered credentials
    fn list_accounts(&mut self) -> EngineResult<Vec<EngineAccount>>;

    /// List transactions of one account; `None` bounds are open
    fn list_transactions(
        &mut self,
        account: &AccountRef,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EngineResult<Vec<EngineTransaction>>;

    /// Tear the handle down and release every engine-side resource
    fn destroy(self: Box<Self>) -> EngineResult<()>;
}

/// Factory for engine handles of one engine implementation
///
/// `process_init` / `process_shutdown` cover engines that need process-wide
/// setup; the session runtime calls them around the first and last live
/// session of this backend.
pub trait EngineBackend: Send + Sync {
    /// Backend name (e.g., "demo")
    fn name(&self) -> &str;

    /// Version of the underlying engine
    fn version(&self) -> EngineVersion;

    /// Process-wide setup before the first handle is constructed
    fn process_init(&self) -> EngineResult<()> {
        Ok(())
    }

    /// Process-wide teardown after the last handle was destroyed
    fn process_shutdown(&self) -> EngineResult<()> {
        Ok(())
    }

    /// Construct a handle with the given profile, loading or creating
    /// working state under `working_dir`
    fn construct(&self, profile: &str, working_dir: &Path) -> EngineResult<Box<dyn BankingEngine>>;
}
