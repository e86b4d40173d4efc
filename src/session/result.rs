use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{Difficulty, PracticeSet, Scheme};
use crate::session::progress::ProgressState;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionResult {
    pub wpm: f64,
    pub cpm: f64,
    pub accuracy: f64,
    pub attempted: usize,
    pub correct: usize,
    pub errors: usize,
    pub elapsed_secs: f64,
    pub timestamp: DateTime<Utc>,
    pub scheme: Scheme,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub set_id: String,
}

impl SessionResult {
    pub fn from_progress(
        progress: &ProgressState,
        set: &PracticeSet,
        scheme: Scheme,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            wpm: progress.wpm(),
            cpm: progress.cpm(),
            accuracy: progress.accuracy(),
            attempted: progress.attempted(),
            correct: progress.correct_count(),
            errors: progress.error_count(),
            elapsed_secs: progress.elapsed_secs(),
            timestamp: Utc::now(),
            scheme,
            difficulty,
            set_id: set.id.clone(),
        }
    }
}

/// Append `result`, dropping the oldest entries beyond `limit`.
pub fn push_capped(history: &mut Vec<SessionResult>, result: SessionResult, limit: usize) {
    history.push(result);
    if history.len() > limit {
        let excess = history.len() - limit;
        history.drain(..excess);
    }
}
