//! Rate-limited log emission.
//!
//! Saturated admission loops re-check every few hundred milliseconds and
//! would otherwise repeat the same warning on every pass. Each message
//! signature is let through at most once per window; repeats inside the
//! window are dropped, not queued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-signature suppression window over any log macro.
#[derive(Clone)]
pub struct RateLimitedLog {
    last_emit: Arc<DashMap<String, Instant>>,
    window: Duration,
}

impl RateLimitedLog {
    pub fn new(window: Duration) -> Self {
        Self {
            last_emit: Arc::new(DashMap::new()),
            window,
        }
    }

    /// Whether `key` is currently allowed to emit. Claims the window slot
    /// when it is.
    pub fn should_emit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut allowed = false;
        self.last_emit
            .entry(key.to_string())
            .and_modify(|last| {
                if now.duration_since(*last) >= self.window {
                    *last = now;
                    allowed = true;
                }
            })
            .or_insert_with(|| {
                allowed = true;
                now
            });
        allowed
    }

    /// Run `emit` unless `key` fired within the window.
    pub fn warn(&self, key: &str, emit: impl FnOnce()) {
        if self.should_emit(key) {
            emit();
        }
    }
}
