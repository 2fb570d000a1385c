//! Keyed record store, toy account registry and active project persistence.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StudioError, StudioResult};
use crate::types::Proposal;

/// Key under which the account table is stored.
pub const USERS_KEY: &str = "codeset_db_users";

/// Key under which the active proposal is stored.
pub const ACTIVE_PROJECT_KEY: &str = "codeset_active_project";

/// String-keyed, string-valued persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StudioResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> StudioResult<()>;
    fn remove(&self, key: &str) -> StudioResult<()>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StudioResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StudioResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StudioResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Every operation re-reads the file, so several processes see each other's
/// writes between invocations.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StudioResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> StudioResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        debug!("Saved {} store entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StudioResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> StudioResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> StudioResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// One toy account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub password: String,
}

/// Sign-up and log-in over a [`KeyValueStore`]. Not an authentication system.
pub struct AccountRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn users(&self) -> StudioResult<Vec<UserRecord>> {
        match self.store.get(USERS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Register a new account; fails if the email is taken.
    pub fn sign_up(&self, email: &str, password: &str) -> StudioResult<()> {
        let mut users = self.users()?;
        if users.iter().any(|u| u.email == email) {
            return Err(StudioError::AccountExists(email.to_string()));
        }
        users.push(UserRecord {
            email: email.to_string(),
            password: password.to_string(),
        });
        self.store.put(USERS_KEY, &serde_json::to_string(&users)?)
    }

    /// Check an exact email and password match.
    pub fn log_in(&self, email: &str, password: &str) -> StudioResult<()> {
        let found = self
            .users()?
            .iter()
            .any(|u| u.email == email && u.password == password);
        if found {
            Ok(())
        } else {
            Err(StudioError::InvalidCredentials)
        }
    }
}

/// Persists the proposal the builder should work on.
pub struct ProjectStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProjectStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, proposal: &Proposal) -> StudioResult<()> {
        self.store.put(ACTIVE_PROJECT_KEY, &serde_json::to_string(proposal)?)
    }

    pub fn load(&self) -> StudioResult<Option<Proposal>> {
        match self.store.get(ACTIVE_PROJECT_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn clear(&self) -> StudioResult<()> {
        self.store.remove(ACTIVE_PROJECT_KEY)
    }
}
