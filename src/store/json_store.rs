use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::store::BlobStore;
use crate::store::schema::HistoryData;

const HISTORY_FILE: &str = "history";

/// Directory of JSON files, one per key.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// Lenient typed read: a missing or unparsable file yields the default.
    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(content) = self.get_blob(key) else {
            return T::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(key, error = %e, "unreadable store file, using defaults");
            T::default()
        })
    }

    fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        self.write_atomic(key, &json)
    }

    fn write_atomic(&self, key: &str, content: &str) -> Result<()> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load_history(&self) -> HistoryData {
        let data: HistoryData = self.load(HISTORY_FILE);
        if data.needs_reset() {
            warn!(
                schema_version = data.schema_version,
                "history schema mismatch, starting fresh"
            );
            return HistoryData::default();
        }
        data
    }

    pub fn save_history(&self, data: &HistoryData) -> Result<()> {
        self.save(HISTORY_FILE, data)
    }
}

impl BlobStore for JsonStore {
    fn get_blob(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.file_path(key)).ok()
    }

    fn put_blob(&mut self, key: &str, content: &str) -> Result<()> {
        self.write_atomic(key, content)
    }

    fn remove_blob(&mut self, key: &str) -> Result<()> {
        let path = self.file_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn blob_keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect()
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
