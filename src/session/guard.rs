use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Token captured when an asynchronous operation starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic counter deciding which in-flight completion may still apply.
///
/// Every session-affecting action calls [`RequestGuard::begin`]; a
/// completion holding an older token is dropped. Clones share the counter,
/// so a worker thread can check staleness itself.
#[derive(Clone, Debug, Default)]
pub struct RequestGuard {
    counter: Arc<AtomicU64>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate everything in flight and hand out the new current token.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> RequestToken {
        RequestToken(self.counter.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current() == token
    }
}
