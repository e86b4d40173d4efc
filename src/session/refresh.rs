use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use crate::content::source::{ContentError, ContentSource};
use crate::content::{ALL_DIFFICULTIES, Difficulty, PracticeSet, Scheme};
use crate::session::guard::RequestToken;

/// Result of one batch refresh, tagged with the token it was started under.
pub struct RefreshOutcome {
    pub token: RequestToken,
    pub scheme: Scheme,
    pub result: Result<Vec<(Difficulty, PracticeSet)>, ContentError>,
}

/// Runs content fetches on worker threads and hands outcomes back through
/// a channel, so the input path never blocks on the network.
pub struct RefreshHandler {
    rx: mpsc::Receiver<RefreshOutcome>,
    tx: mpsc::Sender<RefreshOutcome>,
}

impl Default for RefreshHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { rx, tx }
    }

    /// Fetch every difficulty of `scheme`. The batch fails as a whole on the
    /// first error.
    pub fn spawn(
        &self,
        source: Arc<dyn ContentSource>,
        scheme: Scheme,
        model_hint: String,
        token: RequestToken,
    ) {
        let tx = self.sender();
        thread::spawn(move || {
            let result = ALL_DIFFICULTIES
                .iter()
                .map(|&difficulty| {
                    source
                        .fetch(scheme, difficulty, &model_hint)
                        .map(|set| (difficulty, set))
                })
                .collect::<Result<Vec<_>, _>>();
            // Receiver gone means the controller was dropped; nothing to do.
            let _ = tx.send(RefreshOutcome {
                token,
                scheme,
                result,
            });
        });
    }

    pub fn sender(&self) -> mpsc::Sender<RefreshOutcome> {
        self.tx.clone()
    }

    pub fn try_next(&self) -> Option<RefreshOutcome> {
        self.rx.try_recv().ok()
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<RefreshOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}
