use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{Collection, RecordStore, StoreError};

/// Keeps serialised collections in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Bytes>>,
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, collection: Collection) -> Result<Option<Bytes>, StoreError> {
        Ok(self.collections.read().await.get(&collection).cloned())
    }

    async fn write(&self, collection: Collection, data: Bytes) -> Result<(), StoreError> {
        self.collections.write().await.insert(collection, data);
        Ok(())
    }
}
