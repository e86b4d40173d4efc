use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, warn};

use crate::content::{ALL_DIFFICULTIES, Difficulty, PracticeSet, Scheme};
use crate::store::BlobStore;
use crate::store::schema::StoredSets;

pub const CACHE_KEY_PREFIX: &str = "practice_cache_v1_";
pub const DEFAULT_CAPACITY: usize = 50;

/// Bounded, deduplicated practice sets per (scheme, difficulty).
///
/// Each key holds an arrival-ordered list. Reads are lenient: whatever
/// cannot be parsed is an empty list. Writes never surface errors either;
/// they are logged and reported as "not saved".
pub struct ContentStore<S: BlobStore> {
    backend: S,
    capacity: usize,
    rng: SmallRng,
}

impl<S: BlobStore> ContentStore<S> {
    pub fn new(backend: S, capacity: usize) -> Self {
        Self::with_rng(backend, capacity, SmallRng::from_entropy())
    }

    pub fn with_rng(backend: S, capacity: usize, rng: SmallRng) -> Self {
        Self {
            backend,
            capacity: capacity.max(1),
            rng,
        }
    }

    pub fn key(scheme: Scheme, difficulty: Difficulty) -> String {
        format!("{CACHE_KEY_PREFIX}{scheme}_{difficulty}")
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn load_list(&self, scheme: Scheme, difficulty: Difficulty) -> Vec<PracticeSet> {
        let key = Self::key(scheme, difficulty);
        let Some(raw) = self.backend.get_blob(&key) else {
            return Vec::new();
        };
        match serde_json::from_str::<StoredSets>(&raw) {
            Ok(stored) => stored.into_vec(),
            Err(e) => {
                warn!(%key, error = %e, "malformed practice cache, treating as empty");
                Vec::new()
            }
        }
    }

    /// Append `set` unless a set with the same glyph text is already stored.
    /// Returns whether the list changed.
    pub fn save(&mut self, scheme: Scheme, difficulty: Difficulty, set: PracticeSet) -> bool {
        let key = Self::key(scheme, difficulty);
        let mut list = self.load_list(scheme, difficulty);

        if list.iter().any(|existing| existing.same_content(&set)) {
            debug!(%key, text = %set.text, "duplicate practice set, skipping save");
            return false;
        }

        list.push(set);
        if list.len() > self.capacity {
            let excess = list.len() - self.capacity;
            list.drain(..excess);
        }

        let json = match serde_json::to_string(&list) {
            Ok(json) => json,
            Err(e) => {
                warn!(%key, error = %e, "failed to encode practice cache");
                return false;
            }
        };
        match self.backend.put_blob(&key, &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(%key, error = %e, "failed to write practice cache");
                false
            }
        }
    }

    /// Uniformly random stored set; each call is an independent draw.
    pub fn get(&mut self, scheme: Scheme, difficulty: Difficulty) -> Option<PracticeSet> {
        let mut list = self.load_list(scheme, difficulty);
        if list.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..list.len());
        Some(list.swap_remove(idx))
    }

    pub fn has(&self, scheme: Scheme, difficulty: Difficulty) -> bool {
        self.count(scheme, difficulty) > 0
    }

    pub fn count(&self, scheme: Scheme, difficulty: Difficulty) -> usize {
        self.load_list(scheme, difficulty).len()
    }

    /// Stored set count for every difficulty of `scheme`.
    pub fn counts(&self, scheme: Scheme) -> [(Difficulty, usize); 3] {
        ALL_DIFFICULTIES.map(|d| (d, self.count(scheme, d)))
    }

    /// Drop the stored sets of every key. Unrelated blobs are left alone.
    pub fn clear(&mut self) {
        for key in self.backend.blob_keys() {
            if !key.starts_with(CACHE_KEY_PREFIX) {
                continue;
            }
            if let Err(e) = self.backend.remove_blob(&key) {
                warn!(%key, error = %e, "failed to remove practice cache");
            }
        }
    }
}
