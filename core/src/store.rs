//! Key-value persistence seam standing in for browser local storage.
//!
//! Every persisted field lives under the `@ConvertMyRecipe:` namespace. The
//! [`SessionStore`](crate::session::SessionStore) is the only writer; views
//! and flows never touch keys directly.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub mod keys {
    pub const RECIPE: &str = "@ConvertMyRecipe:recipe";
    pub const PARSED_RECIPE: &str = "@ConvertMyRecipe:parsedRecipe";
    pub const UNIT_GROUP: &str = "@ConvertMyRecipe:unitGroup";
    pub const DATE: &str = "@ConvertMyRecipe:date";
    pub const FINAL_RECIPE: &str = "@ConvertMyRecipe:finalRecipe";
    pub const FINAL_DATE: &str = "@ConvertMyRecipe:finalDate";

    /// Fields making up a working session
    pub const SESSION: [&str; 4] = [RECIPE, PARSED_RECIPE, UNIT_GROUP, DATE];
    pub const FINAL: [&str; 2] = [FINAL_RECIPE, FINAL_DATE];
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Set(String, String),
    Remove(String),
}

impl Change {
    pub fn set(key: &str, value: impl Into<String>) -> Self {
        Change::Set(key.to_string(), value.into())
    }

    pub fn remove(key: &str) -> Self {
        Change::Remove(key.to_string())
    }
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Apply a batch of changes. Implementations persist the whole batch or
    /// none of it.
    fn apply(&mut self, changes: Vec<Change>) -> Result<(), StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(vec![Change::set(key, value)])
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.apply(vec![Change::remove(key)])
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn apply(&mut self, changes: Vec<Change>) -> Result<(), StoreError> {
        apply_to_map(&mut self.entries, changes);
        Ok(())
    }
}

/// JSON object file holding every key, rewritten whole on each batch.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the state file. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "Ignoring malformed state file");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Could not read state file");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let data = serde_json::to_string_pretty(entries)?;

        // Write a sibling file then rename so readers never see half a batch
        let tmp = self.path.with_extension("json.tmp");
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)
            .map_err(io_err)?;
        file.write_all(data.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn apply(&mut self, changes: Vec<Change>) -> Result<(), StoreError> {
        let mut next = self.entries.clone();
        apply_to_map(&mut next, changes);
        self.persist(&next)?;
        self.entries = next;
        Ok(())
    }
}

fn apply_to_map(entries: &mut BTreeMap<String, String>, changes: Vec<Change>) {
    for change in changes {
        match change {
            Change::Set(key, value) => {
                entries.insert(key, value);
            }
            Change::Remove(key) => {
                entries.remove(&key);
            }
        }
    }
}

// Unix-specific imports for file permissions
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

// No-op on non-unix
#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
