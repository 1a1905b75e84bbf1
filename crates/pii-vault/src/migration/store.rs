//! [`RecordStore`]: the persistence seam the sweep reads and rewrites through.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

/// Errors surfaced by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record disappeared between listing and reading.
    #[error("record {0} not found")]
    NotFound(String),

    /// Any backend failure (connection, constraint, serialisation).
    #[error("record store failure: {0}")]
    Backend(String),
}

/// Access to persisted records whose attributes are encrypted at rest.
///
/// Implemented by the host application's persistence layer. `write` must
/// store `value` verbatim; the sweep hands it an already-sealed string.
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore: Send + Sync {
    /// Identifiers of every record to visit.
    fn record_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Stored value of `attribute` on record `id`; `None` if unset.
    fn read(&self, id: &str, attribute: &str) -> Result<Option<String>, StoreError>;

    /// Replace the stored value of `attribute` on record `id`.
    fn write(&self, id: &str, attribute: &str, value: String) -> Result<(), StoreError>;
}

/// Thread-safe in-memory [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, HashMap<String, String>>>,
    writes: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write.
    pub fn insert(&self, id: &str, attribute: &str, value: impl Into<String>) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_owned())
            .or_default()
            .insert(attribute.to_owned(), value.into());
    }

    /// Current value of an attribute.
    pub fn get(&self, id: &str, attribute: &str) -> Option<String> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .and_then(|attrs| attrs.get(attribute).cloned())
    }

    /// Number of [`RecordStore::write`] calls served.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl RecordStore for MemoryRecordStore {
    fn record_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }

    fn read(&self, id: &str, attribute: &str) -> Result<Option<String>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let attrs = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        Ok(attrs.get(attribute).cloned())
    }

    fn write(&self, id: &str, attribute: &str, value: String) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let attrs = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        attrs.insert(attribute.to_owned(), value);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
