//! Core domain entities
//!
//! All snapshot types handed to callers are defined here. These are pure data
//! structures with validation logic - no I/O and no engine handles.

mod account;
mod credential;
mod money;
mod range;
pub mod result;
mod transaction;
mod user;
mod version;

pub use account::Account;
pub use credential::{Credential, CredentialKey};
pub use money::Money;
pub use range::DateRange;
pub use transaction::{Party, Transaction};
pub use user::User;
pub use version::EngineVersion;
