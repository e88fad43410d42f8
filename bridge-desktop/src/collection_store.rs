//! File-backed per-collection slot storage
//!
//! Persists the per-collection slots as one JSON document keyed by
//! collection id, then slot kind. Writes go through a temp file followed
//! by a rename so a crash never leaves a truncated store behind.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{CollectionStore, SlotKind},
};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

type SlotMap = HashMap<String, HashMap<String, String>>;

pub struct JsonCollectionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles against the backing file.
    write_lock: Mutex<()>,
}

impl JsonCollectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<SlotMap> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => serde_json::from_slice(&data)
                .map_err(|e| BridgeError::OperationFailed(format!("Corrupt slot store: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SlotMap::new()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn persist(&self, map: &SlotMap) -> Result<()> {
        let data = serde_json::to_vec_pretty(map)
            .map_err(|e| BridgeError::OperationFailed(format!("Slot store encode: {e}")))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CollectionStore for JsonCollectionStore {
    async fn read_slot(&self, collection_id: &str, slot: SlotKind) -> Result<Option<String>> {
        let map = self.load().await?;
        Ok(map
            .get(collection_id)
            .and_then(|slots| slots.get(&slot.to_string()))
            .cloned())
    }

    async fn write_slot(&self, collection_id: &str, slot: SlotKind, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.entry(collection_id.to_string())
            .or_default()
            .insert(slot.to_string(), value.to_string());
        self.persist(&map).await?;
        debug!(collection_id, slot = %slot, "Slot written");
        Ok(())
    }
}
