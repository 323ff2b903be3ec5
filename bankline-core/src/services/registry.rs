//! Credential registry - the session's mirror of engine-side registrations

use std::collections::BTreeMap;

use crate::domain::result::{Error, Result};
use crate::domain::{Credential, CredentialKey};
use crate::ports::BankingEngine;

/// Credentials registered with one engine handle, keyed by bank + user
///
/// An entry is only added after the engine accepted it, so the mirror never
/// holds something the engine does not know about.
#[derive(Debug, Default)]
pub struct CredentialRegistry {
    entries: BTreeMap<CredentialKey, Credential>,
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, forward to the engine, then insert or overwrite the entry
    pub fn register(&mut self, engine: &mut dyn BankingEngine, credential: Credential) -> Result<()> {
        credential.validate()?;

        engine
            .register_credential(
                credential.institution_code(),
                credential.user_id(),
                credential.secret(),
            )
            .map_err(Error::CredentialRejected)?;

        // Replacing drops (and wipes) the previous secret
        self.entries.insert(credential.key(), credential);
        Ok(())
    }

    pub fn lookup(&self, institution_code: &str, user_id: &str) -> Result<&Credential> {
        let key = CredentialKey::new(institution_code, user_id);
        self.entries
            .get(&key)
            .ok_or_else(|| Error::not_found(format!("credential {}", key)))
    }

    pub fn contains(&self, key: &CredentialKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CredentialKey> {
        self.entries.keys()
    }

    /// Distinct institution codes with at least one credential
    pub fn institutions(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self
            .entries
            .keys()
            .map(|k| k.institution_code.as_str())
            .collect();
        codes.dedup();
        codes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every credential; secrets are zeroed as they are dropped
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
