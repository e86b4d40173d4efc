use std::collections::HashSet;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Active,
    Finished,
}

/// Cursor and error record over the units of the active practice set.
#[derive(Clone, Debug)]
pub struct ProgressState {
    pub current_index: usize,
    /// Typed text not yet attributed to any completed unit.
    pub residual_input: String,
    pub error_positions: HashSet<usize>,
    pub phase: Phase,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ProgressState {
    pub fn idle() -> Self {
        Self {
            current_index: 0,
            residual_input: String::new(),
            error_positions: HashSet::new(),
            phase: Phase::Idle,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            phase: Phase::Loading,
            ..Self::idle()
        }
    }

    /// Fresh progress for a set of `unit_count` units, clock started now.
    pub fn active(unit_count: usize) -> Self {
        let now = Instant::now();
        let mut state = Self {
            phase: Phase::Active,
            started_at: Some(now),
            ..Self::idle()
        };
        if unit_count == 0 {
            state.phase = Phase::Finished;
            state.finished_at = Some(now);
        }
        state
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn elapsed_secs(&self) -> f64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start).as_secs_f64(),
            (Some(start), None) => start.elapsed().as_secs_f64(),
            _ => 0.0,
        }
    }

    /// Units attempted so far, whether matched or skipped.
    pub fn attempted(&self) -> usize {
        self.current_index
    }

    pub fn error_count(&self) -> usize {
        self.error_positions.len()
    }

    pub fn correct_count(&self) -> usize {
        self.attempted().saturating_sub(self.error_count())
    }

    pub fn accuracy(&self) -> f64 {
        if self.current_index == 0 {
            return 100.0;
        }
        let errors_before_cursor = self
            .error_positions
            .iter()
            .filter(|&&pos| pos < self.current_index)
            .count();
        ((self.current_index - errors_before_cursor) as f64 / self.current_index as f64 * 100.0)
            .clamp(0.0, 100.0)
    }

    /// Characters per minute over attempted units.
    pub fn cpm(&self) -> f64 {
        let elapsed = self.elapsed_secs();
        if elapsed < 0.1 {
            return 0.0;
        }
        self.attempted() as f64 / (elapsed / 60.0)
    }

    pub fn wpm(&self) -> f64 {
        self.cpm() / 5.0
    }

    pub fn progress(&self, unit_count: usize) -> f64 {
        if unit_count == 0 {
            return 0.0;
        }
        (self.current_index as f64 / unit_count as f64).min(1.0)
    }
}
