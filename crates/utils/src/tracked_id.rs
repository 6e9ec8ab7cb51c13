use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Millisecond timestamps used as SSE event ids.
///
/// Two events in the same millisecond still get distinct, increasing ids:
/// each id is `max(now_ms, previous + 1)`.
#[derive(Debug, Default)]
pub struct TrackedIdGenerator {
    last: AtomicU64,
}

impl TrackedIdGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
