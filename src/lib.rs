//! Hanzi typing drills: a progress-matching engine that advances through
//! practice characters as the learner types pinyin or wubi codes, backed
//! by a bounded store of practice sets.

pub mod config;
pub mod content;
pub mod session;
pub mod store;
pub mod telemetry;

pub use content::{Difficulty, PracticeSet, Scheme, TargetUnit};
pub use session::controller::SessionController;
pub use session::progress::{Phase, ProgressState};
