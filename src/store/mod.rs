//! Persistent connection profiles.
//!
//! A connection profile describes how to reach a remote host. Profiles are
//! stored as a single JSON array and every record is kept in normalized form:
//! strings trimmed, home-relative key paths expanded, blank optionals absent.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SshyaError};

/// A persisted connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique id, assigned as max existing id + 1
    pub id: u64,
    /// Unique, trimmed alias
    pub alias: String,
    pub user: String,
    pub host: String,
    /// Private key path, home-expanded
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub key_path: Option<String>,
    /// Port, kept as a string even though it is numeric
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub port: Option<String>,
    /// Remote working directory entered before the login shell starts
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub remote_path: Option<String>,
    /// Milliseconds since epoch of the last successful session launch
    #[serde(rename = "lastUsed", default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
}

impl Connection {
    /// `user@host` destination as passed to the remote-login client.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Return this record in normalized form.
    pub fn normalized(&self, home: &Path) -> Self {
        Self {
            id: self.id,
            alias: self.alias.trim().to_string(),
            user: self.user.trim().to_string(),
            host: self.host.trim().to_string(),
            key_path: normalize_optional(self.key_path.as_deref()).map(|k| expand_home(&k, home)),
            port: normalize_optional(self.port.as_deref()),
            remote_path: normalize_optional(self.remote_path.as_deref()),
            last_used: self.last_used,
        }
    }
}

/// Field values supplied by add, update and import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionDraft {
    pub alias: String,
    pub user: String,
    pub host: String,
    pub key_path: Option<String>,
    pub port: Option<String>,
    pub remote_path: Option<String>,
}

impl ConnectionDraft {
    pub fn new(alias: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            user: user.into(),
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn key_path(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn remote_path(mut self, remote_path: impl Into<String>) -> Self {
        self.remote_path = Some(remote_path.into());
        self
    }

    /// Reject drafts whose alias, user or host is blank.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("alias", &self.alias),
            ("user", &self.user),
            ("host", &self.host),
        ] {
            if value.trim().is_empty() {
                return Err(SshyaError::Validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Build a normalized record with the given id.
    pub(crate) fn into_connection(self, id: u64, home: &Path) -> Connection {
        Connection {
            id,
            alias: self.alias,
            user: self.user,
            host: self.host,
            key_path: self.key_path,
            port: self.port,
            remote_path: self.remote_path,
            last_used: None,
        }
        .normalized(home)
    }
}

/// Trim an optional value, collapsing blank strings to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Expand a leading `~` or `~/` against `home`. Other paths are returned as-is.
pub fn expand_home(path: &str, home: &Path) -> String {
    if path == "~" {
        return home.to_string_lossy().into_owned();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest).to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

/// Legacy files may store ports (and occasionally other fields) as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(StringOrNumber::into_string))
}

pub mod manager;

pub use manager::ConnectionStore;
