//! Credential domain model

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::result::{Error, Result};

/// Identity of a credential within a registry: one entry per bank + user pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialKey {
    pub institution_code: String,
    pub user_id: String,
}

impl CredentialKey {
    pub fn new(institution_code: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            institution_code: institution_code.into().trim().to_string(),
            user_id: user_id.into().trim().to_string(),
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.institution_code, self.user_id)
    }
}

/// Access material for one user at one institution
///
/// The secret is wiped from memory when the credential is dropped and is
/// never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    institution_code: String,
    user_id: String,
    secret: String,
}

impl Credential {
    /// Create a credential. Identifiers are trimmed; the secret is kept verbatim.
    pub fn new(
        institution_code: impl Into<String>,
        user_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            institution_code: institution_code.into().trim().to_string(),
            user_id: user_id.into().trim().to_string(),
            secret: secret.into(),
        }
    }

    pub fn institution_code(&self) -> &str {
        &self.institution_code
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn key(&self) -> CredentialKey {
        CredentialKey {
            institution_code: self.institution_code.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Validate credential data before it goes anywhere near an engine
    pub fn validate(&self) -> Result<()> {
        if self.institution_code.is_empty() {
            return Err(Error::invalid_credential("institution code cannot be empty"));
        }
        if self.user_id.is_empty() {
            return Err(Error::invalid_credential(format!(
                "user id cannot be empty (institution {})",
                self.institution_code
            )));
        }
        Ok(())
    }

    /// Short, stable digest of the bank + user pair for log correlation
    ///
    /// Lets the event log tell identities apart without storing the user id.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.institution_code.as_bytes());
        hasher.update(b"|");
        hasher.update(self.user_id.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("institution_code", &self.institution_code)
            .field("user_id", &self.user_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
