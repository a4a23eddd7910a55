//! Key-value persistence behind the [`Workspace`](crate::io::workspace::Workspace).
//!
//! Stores are best-effort: reads answer `None` on any failure and writes
//! answer `false`. Neither panics nor surfaces an error type.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};

/// Key under which the whole app state is persisted
pub const APP_DATA_KEY: &str = "arbor_app_data";

pub trait KeyValueStore {
    /// The parsed value stored under `key`, or `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<Value>;
    /// Persist `value` under `key`. Returns whether the write succeeded.
    fn set(&mut self, key: &str, value: &Value) -> bool;
    /// Whether anything is stored under `key`, readable or not.
    fn contains(&self, key: &str) -> bool;
    /// Keep a copy of whatever is stored under `key` somewhere a later
    /// `set` will not overwrite it.
    fn preserve(&mut self, key: &str, reason: &str);
}

/// One pretty-printed JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(
                    "event=store_read_failed path={} error={}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> bool {
        let text = match serde_json::to_string_pretty(value) {
            Ok(t) => t,
            Err(e) => {
                log::error!("event=store_encode_failed key={} error={}", key, e);
                return false;
            }
        };
        let path = self.path_for(key);
        let result = fs::create_dir_all(&self.dir)
            .and_then(|_| recovery::atomic_write(&path, text.as_bytes()));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!(
                    "event=store_write_failed path={} error={}",
                    path.display(),
                    e
                );
                recovery::log_recovery(
                    &self.dir,
                    RecoveryEntry::new(
                        RecoveryCategory::Write,
                        format!("could not write {}: {}", path.display(), e),
                        text,
                    ),
                );
                false
            }
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn preserve(&mut self, key: &str, reason: &str) {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!(
                    "event=preserve_failed path={} error={}",
                    path.display(),
                    e
                );
                return;
            }
        };
        recovery::log_recovery(
            &self.dir,
            RecoveryEntry::new(
                RecoveryCategory::Load,
                format!("could not load {}: {}", path.display(), reason),
                text,
            ),
        );
    }
}

/// In-process store for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
    refuse_writes: bool,
    writes: usize,
    preserved: Vec<(String, Value)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `set` fails
    pub fn read_only() -> Self {
        MemoryStore {
            refuse_writes: true,
            ..Default::default()
        }
    }

    pub fn with_entry(mut self, key: &str, value: Value) -> Self {
        self.entries.insert(key.to_string(), value);
        self
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Values set aside by [`KeyValueStore::preserve`], oldest first
    pub fn preserved(&self) -> &[(String, Value)] {
        &self.preserved
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &Value) -> bool {
        if self.refuse_writes {
            return false;
        }
        self.entries.insert(key.to_string(), value.clone());
        self.writes += 1;
        true
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn preserve(&mut self, key: &str, _reason: &str) {
        if let Some(value) = self.entries.get(key) {
            self.preserved.push((key.to_string(), value.clone()));
        }
    }
}
