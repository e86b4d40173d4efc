pub mod content_store;
pub mod json_store;
pub mod memory;
pub mod schema;

use anyhow::Result;

/// Opaque key/value persistence for text blobs.
pub trait BlobStore {
    fn get_blob(&self, key: &str) -> Option<String>;
    fn put_blob(&mut self, key: &str, content: &str) -> Result<()>;
    fn remove_blob(&mut self, key: &str) -> Result<()>;
    fn blob_keys(&self) -> Vec<String>;
}
