//! Process-wide engine runtime
//!
//! Some engines need global setup before the first handle exists and
//! teardown after the last one is gone. Sessions take a lease here when they
//! open and give it back when they are released; the backend's
//! `process_init` / `process_shutdown` run on the 0 -> 1 and 1 -> 0 edges.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::result::{Error, Result};
use crate::ports::EngineBackend;

/// Live session count per backend name
static LIVE_SESSIONS: Mutex<BTreeMap<String, usize>> = Mutex::new(BTreeMap::new());

fn live() -> MutexGuard<'static, BTreeMap<String, usize>> {
    // Counters are updated atomically under the lock, so a poisoned guard
    // still holds consistent data
    LIVE_SESSIONS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Proof that a session counts towards its backend's live sessions
#[derive(Debug)]
pub(crate) struct RuntimeLease {
    backend: String,
}

/// Register a live session, running process setup if it is the first one
pub(crate) fn acquire(backend: &dyn EngineBackend) -> Result<RuntimeLease> {
    let mut live = live();
    let count = live.entry(backend.name().to_string()).or_insert(0);

    if *count == 0 {
        backend.process_init().map_err(|e| {
            Error::EngineInit(format!("{} process setup failed: {}", backend.name(), e))
        })?;
    }
    *count += 1;

    Ok(RuntimeLease {
        backend: backend.name().to_string(),
    })
}

/// Give a lease back, running process teardown after the last session
pub(crate) fn release(lease: RuntimeLease, backend: &dyn EngineBackend) -> Result<()> {
    let mut live = live();
    let remaining = match live.get_mut(&lease.backend) {
        Some(count) if *count > 0 => {
            *count -= 1;
            *count
        }
        _ => return Err(Error::lifecycle(format!(
            "no live sessions recorded for backend {}",
            lease.backend
        ))),
    };

    if remaining == 0 {
        live.remove(&lease.backend);
        backend.process_shutdown().map_err(Error::Teardown)?;
    }
    Ok(())
}

/// Number of open sessions for a backend
pub fn live_sessions(backend_name: &str) -> usize {
    live().get(backend_name).copied().unwrap_or(0)
}
