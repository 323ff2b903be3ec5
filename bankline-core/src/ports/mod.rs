//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Sessions depend
//! only on these traits, not on a concrete engine.

mod banking_engine;

pub use banking_engine::{
    AccountRef, BankingEngine, EngineAccount, EngineBackend, EngineError, EngineParty,
    EngineResult, EngineTransaction, EngineUser, EngineUserList, EngineValue, UserListHandle,
};
