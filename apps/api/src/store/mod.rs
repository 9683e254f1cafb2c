//! Record Store: load/save of whole named collections.
//!
//! Backends are byte-transparent (`RecordStore`); `Store` layers JSON
//! (de)serialisation and per-collection write serialisation on top, so the
//! services never see which backend is in use.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// The three persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Customers,
    Jobs,
    Rounds,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Customers, Collection::Jobs, Collection::Rounds];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Customers => "customers",
            Collection::Jobs => "jobs",
            Collection::Rounds => "rounds",
        }
    }

    fn index(self) -> usize {
        match self {
            Collection::Customers => 0,
            Collection::Jobs => 1,
            Collection::Rounds => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed collection data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Record {record} in {collection} is malformed: {source}")]
    Record {
        collection: &'static str,
        /// The record's `id`, or `#<index>` when it has none.
        record: String,
        source: serde_json::Error,
    },

    #[error("Failed to persist collection file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Background storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A byte-level persistence backend.
///
/// `read` returns `None` when nothing has been written for the collection yet.
/// `write` replaces the whole collection; a later `read` sees either the old
/// or the new bytes, never a mix.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read(&self, collection: Collection) -> Result<Option<Bytes>, StoreError>;
    async fn write(&self, collection: Collection, data: Bytes) -> Result<(), StoreError>;
}

/// Typed façade over a `RecordStore`, shared by every service.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn RecordStore>,
    locks: Arc<[Arc<Mutex<()>>; 3]>,
}

impl Store {
    pub fn new(backend: Arc<dyn RecordStore>) -> Self {
        Self {
            backend,
            locks: Arc::new([
                Arc::new(Mutex::new(())),
                Arc::new(Mutex::new(())),
                Arc::new(Mutex::new(())),
            ]),
        }
    }

    /// A store backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Acquires the write guard for one collection.
    /// Hold it across a whole load-modify-save cycle.
    pub async fn lock(&self, collection: Collection) -> OwnedMutexGuard<()> {
        self.locks[collection.index()].clone().lock_owned().await
    }

    /// Loads every record in the collection, in stored order.
    pub async fn load<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        match self.backend.read(collection).await? {
            Some(data) if !data.iter().all(u8::is_ascii_whitespace) => decode(collection, &data),
            _ => Ok(Vec::new()),
        }
    }

    /// Replaces the whole collection with `records`.
    pub async fn save<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(records)?;
        self.backend.write(collection, Bytes::from(data)).await
    }
}

/// Decodes a whole collection. When a single record is at fault the error
/// names it, so the file can be repaired by hand.
fn decode<T: DeserializeOwned>(collection: Collection, data: &[u8]) -> Result<Vec<T>, StoreError> {
    let err = match serde_json::from_slice(data) {
        Ok(records) => return Ok(records),
        Err(e) => e,
    };
    let Ok(raw) = serde_json::from_slice::<Vec<Value>>(data) else {
        return Err(err.into());
    };

    for (index, value) in raw.into_iter().enumerate() {
        let record = value
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| format!("#{index}"), str::to_owned);
        if let Err(source) = serde_json::from_value::<T>(value) {
            tracing::error!("Malformed record {record} in {}: {source}", collection.name());
            return Err(StoreError::Record {
                collection: collection.name(),
                record,
                source,
            });
        }
    }
    Err(err.into())
}
