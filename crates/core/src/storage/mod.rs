//! String key/value persistence.
//!
//! The helper keeps two scopes: a `local` store that survives across test
//! sessions (auto-run and overlay flags) and a `session` store that lives for
//! one test session (last question, attempt counter, override table).

use crate::error::HelperError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const ACTIVE_KEY: &str = "surveyfill.active";
pub const HIDDEN_KEY: &str = "surveyfill.hidden";
pub const QCODE_KEY: &str = "surveyfill.qcode";
pub const PREV_QCODE_KEY: &str = "surveyfill.prev_qcode";
pub const ATTEMPTS_KEY: &str = "surveyfill.attempts";
pub const COMMANDS_KEY: &str = "surveyfill.commands";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), HelperError>;
    fn remove(&mut self, key: &str) -> Result<(), HelperError>;

    fn get_flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v == "1")
    }

    fn set_flag(&mut self, key: &str, value: bool) -> Result<(), HelperError> {
        self.set(key, if value { "1" } else { "0" })
    }
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), HelperError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), HelperError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the file, starting empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HelperError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), HelperError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), HelperError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), HelperError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// The two persistence scopes handed to a session.
pub struct Stores {
    pub local: Box<dyn KeyValueStore>,
    pub session: Box<dyn KeyValueStore>,
}

impl Stores {
    pub fn new(local: impl KeyValueStore + 'static, session: impl KeyValueStore + 'static) -> Self {
        Self {
            local: Box::new(local),
            session: Box::new(session),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), MemoryStore::new())
    }
}
