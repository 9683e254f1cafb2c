use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{Collection, RecordStore, StoreError};

/// Persists each collection as `<data_dir>/<collection>.json`.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers never observe a half-written collection.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Using JSON file store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read(&self, collection: Collection) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.path_for(collection)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, collection: Collection, data: Bytes) -> Result<(), StoreError> {
        let dir = self.dir.clone();
        let target = self.path_for(collection);
        let len = data.len();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target)?;
            Ok(())
        })
        .await??;

        debug!("Wrote {len} bytes to {}", collection.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.read(Collection::Customers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        JsonFileStore::open(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_write_lands_in_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let store = Store::new(backend);

        let records = vec![json!({"id": "1", "name": "Ada"})];
        store.save(Collection::Customers, &records).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("customers.json")).unwrap();
        assert!(raw.contains("\n  {"), "expected pretty-printed output: {raw}");

        let loaded: Vec<Value> = store.load(Collection::Customers).await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_whole_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(Arc::new(JsonFileStore::open(dir.path()).unwrap()));

        store
            .save(Collection::Jobs, &[json!({"id": "1"}), json!({"id": "2"})])
            .await
            .unwrap();
        store.save(Collection::Jobs, &[json!({"id": "3"})]).await.unwrap();

        let loaded: Vec<Value> = store.load(Collection::Jobs).await.unwrap();
        assert_eq!(loaded, vec![json!({"id": "3"})]);

        // No temp files left behind.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_file_loads_as_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rounds.json"), "").unwrap();
        let store = Store::new(Arc::new(JsonFileStore::open(dir.path()).unwrap()));
        let loaded: Vec<Value> = store.load(Collection::Rounds).await.unwrap();
        assert!(loaded.is_empty());
    }
}
