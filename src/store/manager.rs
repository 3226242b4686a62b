//! Connection store backed by a single JSON file.
//!
//! There is no in-memory cache: every operation reads the whole file,
//! mutates, and writes the whole file back. Concurrent writers race and the
//! last one wins.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Connection, ConnectionDraft};
use crate::error::{Result, SshyaError};

/// Read-modify-write access to the persisted connection list
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    /// Path to the JSON array file
    path: PathBuf,
    /// Home directory used for `~` expansion
    home: PathBuf,
}

impl ConnectionStore {
    pub fn new(path: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            home: home.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Normalize any existing on-disk data once.
    ///
    /// A missing file is an empty store and is left for the first write to
    /// create.
    pub fn init(&self) -> Result<()> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "connection store absent, starting empty");
            return Ok(());
        }

        let raw = self.read_raw()?;
        let normalized = self.normalize_all(&raw);
        if normalized != raw {
            info!(count = normalized.len(), "normalized stored connections");
        }
        self.save(&normalized)
    }

    /// Load all connections, normalizing each record.
    pub fn load(&self) -> Result<Vec<Connection>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = self.read_raw()?;
        Ok(self.normalize_all(&raw))
    }

    /// Overwrite the store with `connections`.
    pub fn save(&self, connections: &[Connection]) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SshyaError::storage(parent, e))?;
        }

        let content = serde_json::to_string_pretty(connections).map_err(|e| {
            SshyaError::CorruptStore {
                path: self.path.clone(),
                source: e,
            }
        })?;

        fs::write(&self.path, content).map_err(|e| SshyaError::storage(&self.path, e))
    }

    /// Append a new connection, rejecting duplicate aliases.
    pub fn add(&self, draft: ConnectionDraft) -> Result<Connection> {
        draft.validate()?;

        let mut connections = self.load()?;
        let alias = draft.alias.trim();
        if connections.iter().any(|c| c.alias == alias) {
            return Err(SshyaError::DuplicateAlias(alias.to_string()));
        }

        let id = connections.iter().map(|c| c.id).max().map_or(1, |max| max + 1);
        let connection = draft.into_connection(id, &self.home);
        connections.push(connection.clone());
        self.save(&connections)?;

        debug!(alias = %connection.alias, id, "added connection");
        Ok(connection)
    }

    /// Overwrite user, host, key, port and remote path of an existing alias.
    ///
    /// Returns `false` without writing when the alias does not exist. The id
    /// and last-used time are preserved.
    pub fn update(&self, draft: ConnectionDraft) -> Result<bool> {
        draft.validate()?;

        let mut connections = self.load()?;
        let Some(index) = connections.iter().position(|c| c.alias == draft.alias.trim()) else {
            return Ok(false);
        };

        let existing = &connections[index];
        let mut replacement = draft.into_connection(existing.id, &self.home);
        replacement.alias = existing.alias.clone();
        replacement.last_used = existing.last_used;
        connections[index] = replacement;

        self.save(&connections)?;
        Ok(true)
    }

    /// Remove a connection by alias. Unknown aliases are a no-op.
    pub fn remove(&self, alias: &str) -> Result<bool> {
        let connections = self.load()?;
        let before = connections.len();
        let remaining: Vec<Connection> = connections.into_iter().filter(|c| c.alias != alias).collect();
        let removed = remaining.len() != before;

        self.save(&remaining)?;
        Ok(removed)
    }

    /// Find a connection by exact alias.
    pub fn find_by_alias(&self, alias: &str) -> Result<Option<Connection>> {
        Ok(self.load()?.into_iter().find(|c| c.alias == alias))
    }

    /// Stamp the current time as the alias' last use.
    pub fn record_usage(&self, alias: &str) -> Result<bool> {
        let mut connections = self.load()?;
        let Some(connection) = connections.iter_mut().find(|c| c.alias == alias) else {
            return Ok(false);
        };
        connection.last_used = Some(chrono::Utc::now().timestamp_millis());

        self.save(&connections)?;
        Ok(true)
    }

    /// All connections, most recently used first. Never-used ones keep their
    /// stored order at the end.
    pub fn by_recent_use(&self) -> Result<Vec<Connection>> {
        let mut connections = self.load()?;
        connections.sort_by(|a, b| b.last_used.unwrap_or(0).cmp(&a.last_used.unwrap_or(0)));
        Ok(connections)
    }

    fn read_raw(&self) -> Result<Vec<Connection>> {
        let content = fs::read_to_string(&self.path).map_err(|e| SshyaError::storage(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| SshyaError::CorruptStore {
            path: self.path.clone(),
            source: e,
        })
    }

    fn normalize_all(&self, connections: &[Connection]) -> Vec<Connection> {
        connections.iter().map(|c| c.normalized(&self.home)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConnectionStore {
        ConnectionStore::new(dir.path().join(".sshya").join("sshm.json"), "/home/u")
    }

    #[test]
    fn load_on_missing_file_returns_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn add_then_load_returns_normalized_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .add(
                ConnectionDraft::new(" web ", " deploy ", " example.com ")
                    .key_path("~/.ssh/id_ed25519")
                    .port("  ")
                    .remote_path(" /srv/app "),
            )
            .unwrap();

        let connections = store.load().unwrap();
        assert_eq!(connections.len(), 1);
        let conn = &connections[0];
        assert_eq!(conn.id, 1);
        assert_eq!(conn.alias, "web");
        assert_eq!(conn.user, "deploy");
        assert_eq!(conn.host, "example.com");
        assert_eq!(conn.key_path.as_deref(), Some("/home/u/.ssh/id_ed25519"));
        assert_eq!(conn.port, None);
        assert_eq!(conn.remote_path.as_deref(), Some("/srv/app"));
        assert_eq!(conn.last_used, None);
    }

    #[test]
    fn add_creates_directory_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.add(ConnectionDraft::new("a", "u", "h")).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn duplicate_alias_is_rejected_and_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(ConnectionDraft::new("prod", "root", "10.0.0.1")).unwrap();
        let err = store
            .add(ConnectionDraft::new("  prod  ", "admin", "10.0.0.2"))
            .unwrap_err();

        assert!(matches!(err, SshyaError::DuplicateAlias(ref a) if a == "prod"));
        let connections = store.load().unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].user, "root");
    }

    #[test]
    fn invalid_draft_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let err = store.add(ConnectionDraft::new("a", "  ", "h")).unwrap_err();
        assert!(matches!(err, SshyaError::Validation(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn ids_are_max_plus_one_and_gaps_are_not_refilled() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(ConnectionDraft::new("a", "u", "h")).unwrap();
        store.add(ConnectionDraft::new("b", "u", "h")).unwrap();
        store.add(ConnectionDraft::new("c", "u", "h")).unwrap();
        store.remove("b").unwrap();
        let d = store.add(ConnectionDraft::new("d", "u", "h")).unwrap();
        assert_eq!(d.id, 4);

        let ids: Vec<u64> = store.load().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn remove_then_find_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(ConnectionDraft::new("a", "u", "h")).unwrap();
        assert!(store.remove("a").unwrap());
        assert!(store.find_by_alias("a").unwrap().is_none());
    }

    #[test]
    fn removing_unknown_alias_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(ConnectionDraft::new("a", "u", "h")).unwrap();
        let before = store.load().unwrap();
        assert!(!store.remove("missing").unwrap());
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn update_preserves_id_and_last_used() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(ConnectionDraft::new("a", "u", "h").port("22")).unwrap();
        store.add(ConnectionDraft::new("b", "u", "h")).unwrap();
        assert!(store.record_usage("b").unwrap());
        let used = store.find_by_alias("b").unwrap().unwrap().last_used;

        let updated = store
            .update(ConnectionDraft::new("b", " admin ", "new.host").key_path("~"))
            .unwrap();
        assert!(updated);

        let b = store.find_by_alias("b").unwrap().unwrap();
        assert_eq!(b.id, 2);
        assert_eq!(b.user, "admin");
        assert_eq!(b.host, "new.host");
        assert_eq!(b.key_path.as_deref(), Some("/home/u"));
        assert_eq!(b.last_used, used);
    }

    #[test]
    fn update_of_unknown_alias_is_a_silent_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(ConnectionDraft::new("a", "u", "h")).unwrap();
        let before = store.load().unwrap();
        assert!(!store.update(ConnectionDraft::new("zzz", "x", "y")).unwrap());
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn record_usage_sets_timestamp_only_for_known_alias() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(ConnectionDraft::new("a", "u", "h")).unwrap();
        assert!(!store.record_usage("nope").unwrap());
        assert!(store.record_usage("a").unwrap());

        let last_used = store.find_by_alias("a").unwrap().unwrap().last_used.unwrap();
        assert!(last_used > 1_600_000_000_000);
    }

    #[test]
    fn by_recent_use_orders_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut connections = vec![
            ConnectionDraft::new("never", "u", "h").into_connection(1, store.home()),
            ConnectionDraft::new("old", "u", "h").into_connection(2, store.home()),
            ConnectionDraft::new("new", "u", "h").into_connection(3, store.home()),
        ];
        connections[1].last_used = Some(100);
        connections[2].last_used = Some(200);
        store.save(&connections).unwrap();

        let aliases: Vec<String> = store
            .by_recent_use()
            .unwrap()
            .into_iter()
            .map(|c| c.alias)
            .collect();
        assert_eq!(aliases, vec!["new", "old", "never"]);
    }

    #[test]
    fn init_normalizes_existing_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            r#"[{"id":7,"alias":" a ","user":" u","host":"h ","key_path":"~/k","port":"","remote_path":"  "}]"#,
        )
        .unwrap();

        store.init().unwrap();

        let on_disk: Vec<Connection> =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].alias, "a");
        assert_eq!(on_disk[0].key_path.as_deref(), Some("/home/u/k"));
        assert_eq!(on_disk[0].port, None);
        assert_eq!(on_disk[0].remote_path, None);

        // Second pass is a fixed point
        let first = fs::read_to_string(store.path()).unwrap();
        store.init().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), first);
    }

    #[test]
    fn corrupt_file_surfaces_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, SshyaError::CorruptStore { .. }));
    }
}
