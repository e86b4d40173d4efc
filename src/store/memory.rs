use std::collections::BTreeMap;

use anyhow::Result;

use crate::store::BlobStore;

/// In-process blob store, nothing touches disk.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    blobs: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get_blob(&self, key: &str) -> Option<String> {
        self.blobs.get(key).cloned()
    }

    fn put_blob(&mut self, key: &str, content: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), content.to_string());
        Ok(())
    }

    fn remove_blob(&mut self, key: &str) -> Result<()> {
        self.blobs.remove(key);
        Ok(())
    }

    fn blob_keys(&self) -> Vec<String> {
        self.blobs.keys().cloned().collect()
    }
}
