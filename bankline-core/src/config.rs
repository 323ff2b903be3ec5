//! Configuration management
//!
//! `settings.json` in the data directory:
//! ```json
//! {
//!   "profile": "custom",
//!   "workingDir": "./tmp",
//!   "engine": "demo",
//!   "pinsFile": "pins.json"
//! }
//! ```
//! Unknown keys are preserved on save. Relative paths are resolved against the
//! data directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Credential;

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    working_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pins_file: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Bankline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Engine profile (application) name
    pub profile: String,
    /// Engine working directory
    pub working_dir: PathBuf,
    /// Engine backend name
    pub engine: String,
    /// Credential file
    pub pins_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: "custom".to_string(),
            working_dir: PathBuf::from("./tmp"),
            engine: "demo".to_string(),
            pins_file: PathBuf::from("pins.json"),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Values can be overridden with `BANKLINE_PROFILE`,
    /// `BANKLINE_WORKING_DIR`, `BANKLINE_ENGINE` and `BANKLINE_PINS`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(data_dir)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from settings.json only, ignoring the environment
    pub fn load_file(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let defaults = Self::default();

        Ok(Self {
            profile: raw.profile.unwrap_or(defaults.profile),
            working_dir: raw
                .working_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.working_dir),
            engine: raw.engine.unwrap_or(defaults.engine),
            pins_file: raw.pins_file.map(PathBuf::from).unwrap_or(defaults.pins_file),
        })
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(profile) = get("BANKLINE_PROFILE") {
            self.profile = profile;
        }
        if let Some(dir) = get("BANKLINE_WORKING_DIR") {
            self.working_dir = PathBuf::from(dir);
        }
        if let Some(engine) = get("BANKLINE_ENGINE") {
            self.engine = engine;
        }
        if let Some(pins) = get("BANKLINE_PINS") {
            self.pins_file = PathBuf::from(pins);
        }
    }

    /// Save config to the data directory, keeping keys it doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let mut settings = read_settings(data_dir)?;

        settings.profile = Some(self.profile.clone());
        settings.working_dir = Some(self.working_dir.to_string_lossy().into_owned());
        settings.engine = Some(self.engine.clone());
        settings.pins_file = Some(self.pins_file.to_string_lossy().into_owned());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Working directory, resolved against the data directory
    pub fn resolved_working_dir(&self, data_dir: &Path) -> PathBuf {
        resolve(data_dir, &self.working_dir)
    }

    /// Credential file, resolved against the data directory
    pub fn resolved_pins_file(&self, data_dir: &Path) -> PathBuf {
        resolve(data_dir, &self.pins_file)
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let path = data_dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// One login from the credential file
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialEntry {
    /// Bank code (BLZ)
    pub blz: String,
    /// Login id at the bank
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl CredentialEntry {
    pub fn has_pin(&self) -> bool {
        self.pin.as_deref().map_or(false, |p| !p.is_empty())
    }

    /// Build a credential, preferring `secret_override` over the stored pin
    pub fn into_credential(self, secret_override: Option<String>) -> Result<Credential> {
        let secret = match secret_override.or(self.pin) {
            Some(secret) => secret,
            None => bail!("No PIN available for a login at bank {}", self.blz),
        };
        Ok(Credential::new(self.blz, self.uid, secret))
    }
}

impl std::fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("blz", &self.blz)
            .field("uid", &self.uid)
            .field("pin", &self.pin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Credential file: a JSON array of `{ "blz", "uid", "pin" }` objects
pub struct PinFile;

impl PinFile {
    pub fn load(path: &Path) -> Result<Vec<CredentialEntry>> {
        if !path.exists() {
            bail!("Credential file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let entries: Vec<CredentialEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid credential file {}", path.display()))?;
        Ok(entries)
    }
}
