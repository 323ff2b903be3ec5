//! Adapter implementations
//!
//! Adapters implement the engine port traits with concrete technologies:
//! - Demo engine with deterministic data for testing and local use

pub mod demo;

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::ports::EngineBackend;

/// Names accepted by [`backend_for`]
pub const BACKENDS: &[&str] = &["demo"];

/// Look up an engine backend by name
pub fn backend_for(name: &str) -> Result<Arc<dyn EngineBackend>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "demo" => Ok(Arc::new(demo::DemoBackend::new())),
        other => Err(Error::Config(format!(
            "unknown engine '{}' (available: {})",
            other,
            BACKENDS.join(", ")
        ))),
    }
}
