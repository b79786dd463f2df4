use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{ConsoleError, ConsoleResult};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Largest credential lifetime accepted by configuration (one year).
pub const MAX_TTL_HOURS: u64 = 24 * 365;

/// Logical names of everything the console remembers between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Token,
    AdminToken,
    IsAdmin,
    CurrentInstance,
}

impl StoreKey {
    pub const ALL: [StoreKey; 4] = [
        StoreKey::Token,
        StoreKey::AdminToken,
        StoreKey::IsAdmin,
        StoreKey::CurrentInstance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Token => "token",
            StoreKey::AdminToken => "admintoken",
            StoreKey::IsAdmin => "isAdmin",
            StoreKey::CurrentInstance => "currentInstance",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw row as persisted: JSON-encoded value plus absolute expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub value: String,
    pub expiry: i64,
}

/// Key/value cache whose entries lapse after a per-entry TTL.
///
/// Expiry is lazy: an expired entry stays on disk until the next `get`
/// for its key removes it.
pub struct ExpiringStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl ExpiringStore {
    pub fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> ConsoleResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConsoleError::StorageError(format!("Failed to create store directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            clock,
        };
        store.initialize_schema()?;

        info!("💾 Credential store opened at {}", path.display());
        Ok(store)
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> ConsoleResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            clock,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> ConsoleResult<()> {
        self.lock()?.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                expiry INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> ConsoleResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ConsoleError::StorageError("store lock poisoned".to_string()))
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T, ttl_hours: u64) -> ConsoleResult<()> {
        let encoded = serde_json::to_string(value)?;
        let expiry = expiry_after(self.clock.now_millis(), ttl_hours)?;

        self.lock()?.execute(
            "INSERT OR REPLACE INTO entries (key, value, expiry) VALUES (?1, ?2, ?3)",
            params![key.as_str(), encoded, expiry],
        )?;

        debug!("Stored {} (expires at {})", key, expiry);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: StoreKey) -> ConsoleResult<Option<T>> {
        let Some(entry) = self.peek_entry(key)? else {
            return Ok(None);
        };

        if self.clock.now_millis() > entry.expiry {
            debug!("Entry {} expired, removing", key);
            self.remove(key)?;
            return Ok(None);
        }

        match serde_json::from_str(&entry.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding unreadable entry {}: {}", key, e);
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    pub fn get_string(&self, key: StoreKey) -> ConsoleResult<Option<String>> {
        self.get::<String>(key)
    }

    /// Presence check with the same expiry semantics as `get`.
    pub fn contains(&self, key: StoreKey) -> ConsoleResult<bool> {
        Ok(self.get::<serde_json::Value>(key)?.is_some())
    }

    /// Reads the raw row without applying expiry.
    pub fn peek_entry(&self, key: StoreKey) -> ConsoleResult<Option<StoredEntry>> {
        let entry = self
            .lock()?
            .query_row(
                "SELECT value, expiry FROM entries WHERE key = ?1",
                params![key.as_str()],
                |row| {
                    Ok(StoredEntry {
                        value: row.get(0)?,
                        expiry: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub fn remove(&self, key: StoreKey) -> ConsoleResult<()> {
        self.lock()?
            .execute("DELETE FROM entries WHERE key = ?1", params![key.as_str()])?;
        Ok(())
    }

    pub fn remove_all(&self, keys: &[StoreKey]) -> ConsoleResult<()> {
        for key in keys {
            self.remove(*key)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> ConsoleResult<()> {
        self.lock()?.execute("DELETE FROM entries", [])?;
        info!("🧹 Credential store cleared");
        Ok(())
    }
}

fn expiry_after(now_millis: i64, ttl_hours: u64) -> ConsoleResult<i64> {
    i64::try_from(ttl_hours)
        .ok()
        .and_then(|hours| hours.checked_mul(MILLIS_PER_HOUR))
        .and_then(|ttl| now_millis.checked_add(ttl))
        .ok_or_else(|| ConsoleError::ValidationError(format!("TTL of {} hours is out of range", ttl_hours)))
}
