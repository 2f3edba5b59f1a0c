//! Origin-scoped key/value persistence for tokens and the violation log.
//!
//! `SledStore` is the durable store (survives reloads and process restarts);
//! `MemoryStore` backs tests and hosts without a disk.

use dashmap::DashMap;
use std::path::Path;

use crate::error::{StoreError, StoreResult};

/// Voter session token.
pub const AUTH_TOKEN_KEY: &str = "auth-token";
/// Admin profile (JSON).
pub const ADMIN_USER_KEY: &str = "admin-user";
/// Admin session token.
pub const ADMIN_TOKEN_KEY: &str = "admin-token";
/// Recent violations (JSON array).
pub const SECURITY_VIOLATIONS_KEY: &str = "security-violations";
/// Reserved for the development notice banner; shares the same storage.
pub const DEV_NOTICE_LAST_SHOWN_KEY: &str = "dev-notice-last-shown";

const DEFAULT_STORE_PATH: &str = "./data/ballot_store";

/// String key/value storage with localStorage semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Sled-backed store.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open at the given path, or `./data/ballot_store` when none is given.
    pub fn open(path: Option<impl AsRef<Path>>) -> StoreResult<Self> {
        let p = path
            .map(|x| x.as_ref().to_path_buf())
            .unwrap_or_else(|| Path::new(DEFAULT_STORE_PATH).to_path_buf());
        let db = sled::open(p)?;
        Ok(Self { db })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(v) => String::from_utf8(v.to_vec())
                .map(Some)
                .map_err(|_| StoreError::Encoding(key.to_string())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
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
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
