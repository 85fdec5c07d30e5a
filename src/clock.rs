//! Time sources for the hit counters.
//!
//! Counters only ever look at whole Unix seconds, so a clock just has to hand
//! out a UTC instant. [`SystemClock`] reads the wall clock; [`ManualClock`] is
//! moved by hand and is what the tests (and any host that wants deterministic
//! windows) plug in.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of "now" for a counter.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and advance the
/// clock underneath a counter that owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    secs: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
        Self {
            secs: Arc::new(AtomicI64::new(at.timestamp())),
        }
    }

    #[inline]
    pub fn set<Tz: TimeZone>(&self, at: DateTime<Tz>) {
        self.secs.store(at.timestamp(), Ordering::SeqCst);
    }

    /// Moves the clock by `by`, truncated to whole seconds. Negative durations move it back.
    #[inline]
    pub fn advance(&self, by: Duration) {
        let by = by.num_seconds();
        let _ = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |secs| {
                Some(secs.saturating_add(by))
            });
    }
}

impl Clock for ManualClock {
    /// Instants past chrono's representable range pin to `MIN_UTC` / `MAX_UTC`.
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        let secs = self.secs.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }
}
