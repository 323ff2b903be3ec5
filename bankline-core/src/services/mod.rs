//! Service layer - session lifecycle and the query façade
//!
//! Services coordinate domain logic and port interactions. Sessions are the
//! entry point; the other modules are their building blocks.

pub mod logging;
mod normalize;
mod registry;
pub mod runtime;
mod session;

pub use logging::{
    EntryPoint, LogCount, LogEntry, LogEvent, LogField, LogFilter, LoggingService,
};
pub use registry::CredentialRegistry;
pub use runtime::live_sessions;
pub use session::{BankingSession, SessionState, MIN_ENGINE_VERSION};
