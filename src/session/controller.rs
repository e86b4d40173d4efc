use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content::fallback::builtin_set;
use crate::content::source::ContentSource;
use crate::content::{Difficulty, PracticeSet, Scheme};
use crate::session::guard::{RequestGuard, RequestToken};
use crate::session::input::process_input;
use crate::session::progress::{Phase, ProgressState};
use crate::session::refresh::{RefreshHandler, RefreshOutcome};
use crate::session::result::{SessionResult, push_capped};
use crate::store::BlobStore;
use crate::store::content_store::ContentStore;

/// Handle for a set load that has been started but not yet resolved.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub token: RequestToken,
    pub scheme: Scheme,
    pub difficulty: Difficulty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// Nothing stored for the key; the built-in set is already active.
    Started,
    /// A stored set is being loaded.
    Pending(LoadTicket),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshStatus {
    Saved { added: usize },
    Failed { consecutive_failures: u32 },
    /// Outcome belonged to a superseded refresh or scheme.
    Discarded,
}

/// Session lifecycle over the content store, request guard and matcher.
pub struct SessionController<S: BlobStore> {
    store: ContentStore<S>,
    guard: RequestGuard,
    refresh_guard: RequestGuard,
    refresh: RefreshHandler,
    refresh_in_flight: bool,
    consecutive_failures: u32,
    scheme: Scheme,
    difficulty: Difficulty,
    continuous: bool,
    model_hint: String,
    active_set: Option<PracticeSet>,
    progress: ProgressState,
    history: Vec<SessionResult>,
    history_limit: usize,
    last_result: Option<SessionResult>,
}

impl<S: BlobStore> SessionController<S> {
    pub fn new(store: ContentStore<S>, config: &Config) -> Self {
        Self {
            store,
            guard: RequestGuard::new(),
            refresh_guard: RequestGuard::new(),
            refresh: RefreshHandler::new(),
            refresh_in_flight: false,
            consecutive_failures: 0,
            scheme: config.scheme,
            difficulty: config.difficulty,
            continuous: config.continuous_mode,
            model_hint: config.model.clone(),
            active_set: None,
            progress: ProgressState::idle(),
            history: Vec::new(),
            history_limit: config.history_limit.max(1),
            last_result: None,
        }
    }

    pub fn with_history(mut self, history: Vec<SessionResult>) -> Self {
        self.history = history;
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn continuous(&self) -> bool {
        self.continuous
    }

    pub fn phase(&self) -> Phase {
        self.progress.phase
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn active_set(&self) -> Option<&PracticeSet> {
        self.active_set.as_ref()
    }

    pub fn history(&self) -> &[SessionResult] {
        &self.history
    }

    pub fn last_result(&self) -> Option<&SessionResult> {
        self.last_result.as_ref()
    }

    pub fn store(&self) -> &ContentStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ContentStore<S> {
        &mut self.store
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.refresh_in_flight
    }

    /// Switching the code alphabet abandons the session and anything in
    /// flight, including refreshes.
    pub fn set_scheme(&mut self, scheme: Scheme) {
        if self.scheme == scheme {
            return;
        }
        self.guard.begin();
        self.refresh_guard.begin();
        self.refresh_in_flight = false;
        self.consecutive_failures = 0;
        self.scheme = scheme;
        self.reset_to_idle();
        debug!(%scheme, "scheme switched");
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.difficulty == difficulty {
            return;
        }
        self.guard.begin();
        self.difficulty = difficulty;
        self.reset_to_idle();
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    /// Start a session and resolve the load immediately.
    pub fn start(&mut self) -> &ProgressState {
        if let StartOutcome::Pending(ticket) = self.begin_start() {
            self.finish_load(ticket);
        }
        &self.progress
    }

    /// First half of a start. With nothing stored, the built-in set goes
    /// live right away; otherwise the controller enters Loading.
    pub fn begin_start(&mut self) -> StartOutcome {
        if !self.store.has(self.scheme, self.difficulty) {
            self.guard.begin();
            self.activate(builtin_set(self.difficulty));
            info!(scheme = %self.scheme, difficulty = %self.difficulty, "no stored content, using built-in set");
            return StartOutcome::Started;
        }

        let token = self.guard.begin();
        self.active_set = None;
        self.progress = ProgressState::loading();
        StartOutcome::Pending(LoadTicket {
            token,
            scheme: self.scheme,
            difficulty: self.difficulty,
        })
    }

    /// Read a random stored set for `ticket` and apply it.
    pub fn finish_load(&mut self, ticket: LoadTicket) -> bool {
        if !self.guard.is_current(ticket.token) {
            debug!(token = ticket.token.value(), "stale load dropped before read");
            return false;
        }
        let set = self.store.get(ticket.scheme, ticket.difficulty);
        self.resolve_load(ticket, set)
    }

    /// Apply the result of a load. A superseded ticket is dropped silently;
    /// an empty result falls back to the built-in set.
    pub fn resolve_load(&mut self, ticket: LoadTicket, set: Option<PracticeSet>) -> bool {
        if !self.guard.is_current(ticket.token) {
            debug!(token = ticket.token.value(), "stale load dropped");
            return false;
        }
        let set = set.unwrap_or_else(|| {
            warn!(
                scheme = %ticket.scheme,
                difficulty = %ticket.difficulty,
                "stored content could not be read, using built-in set"
            );
            builtin_set(ticket.difficulty)
        });
        info!(id = %set.id, units = set.len(), "session started");
        self.activate(set);
        true
    }

    /// Replay the current set with fresh progress.
    pub fn restart(&mut self) -> bool {
        if !matches!(self.progress.phase, Phase::Active | Phase::Finished) {
            return false;
        }
        let Some(unit_count) = self.active_set.as_ref().map(PracticeSet::len) else {
            return false;
        };
        self.guard.begin();
        self.progress = ProgressState::active(unit_count);
        self.last_result = None;
        true
    }

    /// Back to the menu; pending loads are invalidated.
    pub fn abandon(&mut self) {
        self.guard.begin();
        self.reset_to_idle();
    }

    /// Feed the full content of the input field.
    pub fn on_input_change(&mut self, raw: &str, composing: bool) -> &ProgressState {
        let Some(set) = self.active_set.as_ref() else {
            return &self.progress;
        };
        if !self.progress.is_active() {
            return &self.progress;
        }

        let next = process_input(
            &self.progress,
            raw,
            composing,
            &set.units,
            self.scheme,
            self.continuous,
        );
        if next.current_index != self.progress.current_index {
            debug!(
                from = self.progress.current_index,
                to = next.current_index,
                errors = next.error_count(),
                "progress advanced"
            );
        }
        self.progress = next;

        if self.progress.is_finished() {
            self.record_result();
        }
        &self.progress
    }

    /// Fetch new content for every difficulty of the active scheme on a
    /// worker thread. A newer refresh or a scheme switch supersedes it.
    pub fn request_refresh(&mut self, source: Arc<dyn ContentSource>) -> RequestToken {
        let token = self.refresh_guard.begin();
        self.refresh
            .spawn(source, self.scheme, self.model_hint.clone(), token);
        self.refresh_in_flight = true;
        info!(scheme = %self.scheme, model = %self.model_hint, "content refresh started");
        token
    }

    /// Apply every refresh outcome that has arrived, in arrival order.
    /// Returns the last status; a stale outcome never hides the status of
    /// the current one.
    pub fn poll_refresh(&mut self) -> Option<RefreshStatus> {
        let mut last = None;
        while let Some(outcome) = self.refresh.try_next() {
            let status = self.apply_refresh(outcome);
            if status != RefreshStatus::Discarded || last.is_none() {
                last = Some(status);
            }
        }
        last
    }

    /// Block up to `timeout` for one refresh outcome.
    pub fn wait_refresh(&mut self, timeout: Duration) -> Option<RefreshStatus> {
        let outcome = self.refresh.next_timeout(timeout)?;
        Some(self.apply_refresh(outcome))
    }

    fn apply_refresh(&mut self, outcome: RefreshOutcome) -> RefreshStatus {
        if !self.refresh_guard.is_current(outcome.token) {
            debug!(token = outcome.token.value(), "stale refresh dropped");
            return RefreshStatus::Discarded;
        }
        self.refresh_in_flight = false;

        match outcome.result {
            Ok(sets) => {
                let mut added = 0;
                for (difficulty, set) in sets {
                    if self.store.save(outcome.scheme, difficulty, set) {
                        added += 1;
                    }
                }
                self.consecutive_failures = 0;
                info!(scheme = %outcome.scheme, added, "content refresh finished");
                RefreshStatus::Saved { added }
            }
            Err(e) => {
                self.consecutive_failures += 1;
                warn!(
                    error = %e,
                    consecutive_failures = self.consecutive_failures,
                    "content refresh failed"
                );
                RefreshStatus::Failed {
                    consecutive_failures: self.consecutive_failures,
                }
            }
        }
    }

    fn activate(&mut self, set: PracticeSet) {
        self.progress = ProgressState::active(set.len());
        self.active_set = Some(set);
        self.last_result = None;
    }

    fn reset_to_idle(&mut self) {
        self.progress = ProgressState::idle();
        self.active_set = None;
    }

    fn record_result(&mut self) {
        let Some(set) = self.active_set.as_ref() else {
            return;
        };
        let result = SessionResult::from_progress(&self.progress, set, self.scheme, self.difficulty);
        info!(
            id = %set.id,
            accuracy = result.accuracy,
            cpm = result.cpm,
            "session finished"
        );
        push_capped(&mut self.history, result.clone(), self.history_limit);
        self.last_result = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::content::{ALL_DIFFICULTIES, TargetUnit};
    use crate::content::source::ContentError;
    use crate::store::memory::MemoryStore;

    fn make_controller() -> SessionController<MemoryStore> {
        let store = ContentStore::with_rng(MemoryStore::new(), 50, SmallRng::seed_from_u64(3));
        SessionController::new(store, &Config::default())
    }

    fn stored_set(id: &str) -> PracticeSet {
        PracticeSet::with_id(
            id,
            vec![TargetUnit::new('中', "zhōng", "k"), TargetUnit::new('国', "guó", "l")],
            None,
        )
    }

    struct FixedSource {
        fail: bool,
        calls: AtomicUsize,
    }

    impl ContentSource for FixedSource {
        fn fetch(
            &self,
            _scheme: Scheme,
            difficulty: Difficulty,
            _model_hint: &str,
        ) -> Result<PracticeSet, ContentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ContentError::Request("offline".to_string()));
            }
            let glyph = match difficulty {
                Difficulty::Beginner => '一',
                Difficulty::Intermediate => '二',
                Difficulty::Advanced => '三',
            };
            Ok(PracticeSet::new(vec![TargetUnit::new(glyph, "x", "x")], None))
        }
    }

    #[test]
    fn empty_store_starts_builtin_set() {
        let mut controller = make_controller();
        assert_eq!(controller.begin_start(), StartOutcome::Started);
        assert_eq!(controller.phase(), Phase::Active);
        assert!(controller.active_set().unwrap().is_builtin());
        assert_eq!(controller.progress().current_index, 0);
        assert!(controller.progress().started_at.is_some());
    }

    #[test]
    fn stored_content_goes_through_loading() {
        let mut controller = make_controller();
        controller
            .store_mut()
            .save(Scheme::Phonetic, Difficulty::Beginner, stored_set("s1"));

        let StartOutcome::Pending(ticket) = controller.begin_start() else {
            panic!("expected a pending load");
        };
        assert_eq!(controller.phase(), Phase::Loading);
        assert!(controller.active_set().is_none());

        assert!(controller.finish_load(ticket));
        assert_eq!(controller.phase(), Phase::Active);
        assert_eq!(controller.active_set().unwrap().id, "s1");
    }

    #[test]
    fn later_load_wins_over_earlier_completion() {
        let mut controller = make_controller();
        controller
            .store_mut()
            .save(Scheme::Phonetic, Difficulty::Beginner, stored_set("s1"));

        let StartOutcome::Pending(a) = controller.begin_start() else {
            panic!("expected a pending load");
        };
        let StartOutcome::Pending(b) = controller.begin_start() else {
            panic!("expected a pending load");
        };

        assert!(controller.resolve_load(b, Some(stored_set("from-b"))));
        assert!(!controller.resolve_load(a, Some(stored_set("from-a"))));
        assert_eq!(controller.active_set().unwrap().id, "from-b");
    }

    #[test]
    fn abandon_discards_pending_load() {
        let mut controller = make_controller();
        controller
            .store_mut()
            .save(Scheme::Phonetic, Difficulty::Beginner, stored_set("s1"));

        let StartOutcome::Pending(ticket) = controller.begin_start() else {
            panic!("expected a pending load");
        };
        controller.abandon();
        assert!(!controller.finish_load(ticket));
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.active_set().is_none());
    }

    #[test]
    fn empty_read_falls_back_to_builtin() {
        let mut controller = make_controller();
        controller
            .store_mut()
            .save(Scheme::Phonetic, Difficulty::Beginner, stored_set("s1"));

        let StartOutcome::Pending(ticket) = controller.begin_start() else {
            panic!("expected a pending load");
        };
        assert!(controller.resolve_load(ticket, None));
        assert!(controller.active_set().unwrap().is_builtin());
        assert_eq!(controller.phase(), Phase::Active);
    }

    #[test]
    fn typing_through_a_set_finishes_and_records() {
        let mut controller = make_controller();
        controller
            .store_mut()
            .save(Scheme::Phonetic, Difficulty::Beginner, stored_set("s1"));
        controller.start();

        controller.on_input_change("zhon", true);
        assert_eq!(controller.progress().residual_input, "zhon");
        assert_eq!(controller.progress().current_index, 0);

        controller.on_input_change("zhong", false);
        assert_eq!(controller.progress().current_index, 1);

        controller.on_input_change("国", false);
        assert_eq!(controller.phase(), Phase::Finished);
        assert_eq!(controller.history().len(), 1);
        let result = controller.last_result().unwrap();
        assert_eq!(result.set_id, "s1");
        assert_eq!(result.errors, 0);

        // Input after the finish is ignored.
        controller.on_input_change("zhong", false);
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn restart_replays_same_set() {
        let mut controller = make_controller();
        controller
            .store_mut()
            .save(Scheme::Phonetic, Difficulty::Beginner, stored_set("s1"));
        controller.start();
        controller.on_input_change("x zhong", false);
        assert!(!controller.progress().error_positions.is_empty());

        assert!(controller.restart());
        assert_eq!(controller.phase(), Phase::Active);
        assert_eq!(controller.progress().current_index, 0);
        assert!(controller.progress().error_positions.is_empty());
        assert_eq!(controller.active_set().unwrap().id, "s1");
    }

    #[test]
    fn restart_without_session_is_rejected() {
        let mut controller = make_controller();
        assert!(!controller.restart());
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn stepped_mode_from_config() {
        let mut controller = make_controller();
        controller.set_continuous(false);
        controller
            .store_mut()
            .save(Scheme::Phonetic, Difficulty::Beginner, stored_set("s1"));
        controller.start();
        controller.on_input_change("zhongguo", false);
        assert_eq!(controller.progress().current_index, 1);
        assert_eq!(controller.progress().residual_input, "guo");
    }

    #[test]
    fn scheme_switch_resets_to_idle() {
        let mut controller = make_controller();
        controller.start();
        assert_eq!(controller.phase(), Phase::Active);

        controller.set_scheme(Scheme::Structural);
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.active_set().is_none());
        assert_eq!(controller.scheme(), Scheme::Structural);
    }

    #[test]
    fn refresh_saves_every_difficulty() {
        let mut controller = make_controller();
        let source = Arc::new(FixedSource {
            fail: false,
            calls: AtomicUsize::new(0),
        });
        controller.request_refresh(source.clone());
        assert!(controller.refresh_in_flight());

        let status = controller.wait_refresh(Duration::from_secs(5));
        assert_eq!(status, Some(RefreshStatus::Saved { added: 3 }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert!(!controller.refresh_in_flight());
        for (_, count) in controller.store().counts(Scheme::Phonetic) {
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn refresh_failures_accumulate_and_reset() {
        let mut controller = make_controller();
        let failing = Arc::new(FixedSource {
            fail: true,
            calls: AtomicUsize::new(0),
        });

        controller.request_refresh(failing.clone());
        assert_eq!(
            controller.wait_refresh(Duration::from_secs(5)),
            Some(RefreshStatus::Failed { consecutive_failures: 1 })
        );
        controller.request_refresh(failing);
        assert_eq!(
            controller.wait_refresh(Duration::from_secs(5)),
            Some(RefreshStatus::Failed { consecutive_failures: 2 })
        );
        assert!(!controller.store().has(Scheme::Phonetic, Difficulty::Beginner));

        controller.request_refresh(Arc::new(FixedSource {
            fail: false,
            calls: AtomicUsize::new(0),
        }));
        assert_eq!(
            controller.wait_refresh(Duration::from_secs(5)),
            Some(RefreshStatus::Saved { added: 3 })
        );
        assert_eq!(controller.consecutive_failures(), 0);
    }

    fn outcome(token: RequestToken, glyph: char) -> RefreshOutcome {
        let sets = ALL_DIFFICULTIES
            .iter()
            .map(|&d| (d, PracticeSet::new(vec![TargetUnit::new(glyph, "x", "x")], None)))
            .collect();
        RefreshOutcome {
            token,
            scheme: Scheme::Phonetic,
            result: Ok(sets),
        }
    }

    #[test]
    fn poll_refresh_applies_queued_outcomes_and_keeps_current_status() {
        let mut controller = make_controller();
        assert_eq!(controller.poll_refresh(), None);

        let first = controller.refresh_guard.begin();
        let second = controller.refresh_guard.begin();
        let tx = controller.refresh.sender();
        tx.send(outcome(second, '新')).unwrap();
        tx.send(outcome(first, '旧')).unwrap();

        assert_eq!(
            controller.poll_refresh(),
            Some(RefreshStatus::Saved { added: 3 })
        );
        for (_, count) in controller.store().counts(Scheme::Phonetic) {
            assert_eq!(count, 1);
        }
        let set = controller
            .store_mut()
            .get(Scheme::Phonetic, Difficulty::Beginner)
            .unwrap();
        assert_eq!(set.text, "新");
        assert_eq!(controller.poll_refresh(), None);
    }

    #[test]
    fn poll_refresh_reports_discard_when_only_stale_outcomes_arrive() {
        let mut controller = make_controller();
        let stale = controller.refresh_guard.begin();
        controller.refresh_guard.begin();
        controller.refresh.sender().send(outcome(stale, '旧')).unwrap();

        assert_eq!(controller.poll_refresh(), Some(RefreshStatus::Discarded));
        assert!(!controller.store().has(Scheme::Phonetic, Difficulty::Beginner));
    }

    #[test]
    fn refresh_outcome_after_scheme_switch_is_dropped() {
        let mut controller = make_controller();
        controller.request_refresh(Arc::new(FixedSource {
            fail: false,
            calls: AtomicUsize::new(0),
        }));
        controller.set_scheme(Scheme::Structural);

        assert_eq!(
            controller.wait_refresh(Duration::from_secs(5)),
            Some(RefreshStatus::Discarded)
        );
        assert!(!controller.store().has(Scheme::Phonetic, Difficulty::Beginner));
        assert!(!controller.store().has(Scheme::Structural, Difficulty::Beginner));
    }
}
