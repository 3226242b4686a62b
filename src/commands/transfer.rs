//! `import` and `export` of the connection list as a JSON array.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::store::{lenient_string, ConnectionDraft, ConnectionStore};

pub const DEFAULT_EXPORT_FILE: &str = "sshm-export.json";

/// Counts reported after an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub found: usize,
    pub added: usize,
    pub overwritten: usize,
    pub skipped: usize,
    /// Elements that failed validation, re-serialized for display
    pub invalid: Vec<String>,
}

/// Shape accepted for each imported element. Unknown fields (ids,
/// timestamps) are ignored.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    alias: String,
    user: String,
    host: String,
    #[serde(default, deserialize_with = "lenient_string")]
    key_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    port: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    remote_path: Option<String>,
}

impl From<ImportRecord> for ConnectionDraft {
    fn from(record: ImportRecord) -> Self {
        ConnectionDraft {
            alias: record.alias,
            user: record.user,
            host: record.host,
            key_path: record.key_path,
            port: record.port,
            remote_path: record.remote_path,
        }
    }
}

/// Write every connection to `path`. Returns the number written; an empty
/// store writes nothing and returns 0.
pub fn export_connections(store: &ConnectionStore, path: &Path) -> Result<usize> {
    let connections = store.load()?;
    if connections.is_empty() {
        return Ok(0);
    }

    let content = serde_json::to_string_pretty(&connections).context("Failed to serialize connections")?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(connections.len())
}

/// Import connections from a JSON file.
pub fn import_file(store: &ConnectionStore, path: &Path, overwrite: bool) -> Result<ImportSummary> {
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()).into());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Error reading or parsing file: {}", path.display()))?;
    import_connections(store, &content, overwrite)
}

/// Import from JSON text. Existing aliases are skipped unless `overwrite`.
pub fn import_connections(store: &ConnectionStore, json: &str, overwrite: bool) -> Result<ImportSummary> {
    let value: Value = serde_json::from_str(json).context("Error reading or parsing file")?;
    let Value::Array(elements) = value else {
        return Err(anyhow!("Invalid file format. Expected a JSON array of connections.").into());
    };

    let mut summary = ImportSummary {
        found: elements.len(),
        ..Default::default()
    };

    for element in elements {
        let draft = match ImportRecord::deserialize(&element) {
            Ok(record) => ConnectionDraft::from(record),
            Err(e) => {
                debug!(error = %e, "skipping malformed import element");
                summary.invalid.push(element.to_string());
                summary.skipped += 1;
                continue;
            }
        };
        if draft.validate().is_err() {
            summary.invalid.push(element.to_string());
            summary.skipped += 1;
            continue;
        }

        if store.find_by_alias(draft.alias.trim())?.is_some() {
            if overwrite {
                store.update(draft)?;
                summary.overwritten += 1;
            } else {
                summary.skipped += 1;
            }
        } else {
            store.add(draft)?;
            summary.added += 1;
        }
    }

    Ok(summary)
}
