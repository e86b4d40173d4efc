use serde::{Deserialize, Serialize};

use crate::content::PracticeSet;
use crate::session::result::SessionResult;

const SCHEMA_VERSION: u32 = 1;

/// Persisted shape of one content-store key. Early caches stored a single
/// set object instead of an array.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum StoredSets {
    List(Vec<PracticeSet>),
    Single(PracticeSet),
}

impl StoredSets {
    pub fn into_vec(self) -> Vec<PracticeSet> {
        match self {
            StoredSets::List(list) => list,
            StoredSets::Single(set) => vec![set],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryData {
    pub schema_version: u32,
    pub sessions: Vec<SessionResult>,
}

impl Default for HistoryData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sessions: Vec::new(),
        }
    }
}

impl HistoryData {
    pub fn new(sessions: Vec<SessionResult>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sessions,
        }
    }

    /// Check if loaded data has a stale schema version and needs reset.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}
