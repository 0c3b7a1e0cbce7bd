//! Key-value persistence seam for audit history and weight data.
//!
//! Writers treat storage as best effort: a failed `set` is reported to the
//! caller as an error value, which the history and weight trackers log and
//! swallow.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Backing store cannot be reached or rejected the operation.
    Unavailable(String),
    /// Write would exceed the store's capacity.
    QuotaExceeded { needed: usize, limit: usize },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            Self::QuotaExceeded { needed, limit } => {
                write!(f, "storage quota exceeded: {needed} bytes needed, limit {limit}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

pub trait Storage {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process store with an optional total byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, Vec<u8>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(limit),
        }
    }

    fn used_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if let Some(limit) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

// ---------------------------------------------------------------------------
// Capped JSON lists
// ---------------------------------------------------------------------------

/// Read a JSON array stored under `key`. Missing or corrupt data reads as
/// an empty list.
pub(crate) fn load_list<T: DeserializeOwned>(store: &impl Storage, key: &str) -> Vec<T> {
    let Some(bytes) = store.get(key) else {
        return Vec::new();
    };
    match serde_json::from_slice(&bytes) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("discarding unreadable {key}: {e}");
            Vec::new()
        }
    }
}

/// Append `items` to the list under `key`, evicting the oldest entries past
/// `cap`. Failures are logged and dropped.
pub(crate) fn append_capped<T: Serialize + DeserializeOwned>(
    store: &mut impl Storage,
    key: &str,
    items: impl IntoIterator<Item = T>,
    cap: usize,
) {
    let mut list: Vec<T> = load_list(store, key);
    list.extend(items);
    if list.len() > cap {
        let excess = list.len() - cap;
        list.drain(..excess);
    }
    let bytes = match serde_json::to_vec(&list) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("could not serialize {key}: {e}");
            return;
        }
    };
    if let Err(e) = store.set(key, &bytes) {
        log::warn!("skipped writing {key}: {e}");
    }
}

pub(crate) fn clear_list(store: &mut impl Storage, key: &str) {
    if let Err(e) = store.remove(key) {
        log::warn!("could not clear {key}: {e}");
    }
}
