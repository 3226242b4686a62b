//! Configuration management for sshya.
//!
//! Loads optional user preferences from `<config dir>/sshya/config.toml`.
//! Every key is optional; a missing file means defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::expand_home;

/// Environment variable overriding `store_path`
pub const STORE_ENV: &str = "SSHYA_STORE";

/// Default store location, relative to the home directory
pub const DEFAULT_STORE_PATH: &str = "~/.sshya/sshm.json";

const MIN_TEST_TIMEOUT: u64 = 1;
const MAX_TEST_TIMEOUT: u64 = 60;

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote-login client binary
    pub ssh_program: String,

    /// Location of the connection store; `~` is expanded
    pub store_path: String,

    /// `ConnectTimeout` used by `test`, in seconds (1-60)
    pub test_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            store_path: DEFAULT_STORE_PATH.to_string(),
            test_timeout_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration from disk, or return default if not found
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file and clamp its values.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate();

        Ok(config)
    }

    /// Clamp the probe timeout to 1-60 seconds
    pub fn validate(&mut self) {
        self.test_timeout_secs = self.test_timeout_secs.clamp(MIN_TEST_TIMEOUT, MAX_TEST_TIMEOUT);
    }

    /// Store path with `SSHYA_STORE` applied and `~` expanded.
    pub fn store_path(&self, home: &Path) -> PathBuf {
        let env_override = env::var(STORE_ENV).ok();
        self.resolve_store_path(home, env_override.as_deref())
    }

    fn resolve_store_path(&self, home: &Path, env_override: Option<&str>) -> PathBuf {
        let raw = env_override
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.store_path);
        PathBuf::from(expand_home(raw, home))
    }

    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sshya").join("config.toml"))
    }

    /// Directory for the log file
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("sshya"))
    }
}

/// Home directory of the invoking user.
///
/// Falls back to the password database when `$HOME` is unset.
pub fn home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }

    let user = nix::unistd::User::from_uid(nix::unistd::getuid())
        .context("Failed to look up current user")?
        .context("Could not find home directory")?;
    Ok(user.dir)
}
