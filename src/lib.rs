//! hit-counter - an in-memory hit counter with windowed range queries.
//!
//! Hits are bucketed by whole Unix second. [`HitCounter`] is the single-owner
//! counter; [`SharedHitCounter`] is the same thing over a sharded concurrent
//! map for hosts that record from several threads at once. Both sweep
//! out-of-window seconds while answering a range query unless the config
//! says otherwise.

use chrono::Duration;
use log::{debug, warn};

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::error::{Error, Result};
pub use crate::hit_counter::HitCounter;
pub use crate::shared::SharedHitCounter;

mod clock;
mod error;
mod hit_counter;
mod shared;

/// Lookback, in seconds, used by range queries that omit their lower bound.
pub const DEFAULT_WINDOW_SECS: i64 = 5 * 60;

/// What a range query does with tracked seconds outside its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eviction {
    /// Delete them during the query.
    #[default]
    OnQuery,
    /// Keep them forever.
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub eviction: Eviction,
    //Lower bound offset when a query gives no `from`
    pub default_window: Duration,
}

impl Config {
    #[inline]
    pub fn with_eviction(mut self, eviction: Eviction) -> Self {
        self.eviction = eviction;
        self
    }

    /// Sets the default lookback. Negative durations are clamped to zero.
    #[inline]
    pub fn with_default_window(mut self, default_window: Duration) -> Self {
        self.default_window = default_window.max(Duration::zero());
        self
    }

    /// Default lookback in whole seconds, never negative.
    #[inline]
    pub(crate) fn window_secs(&self) -> i64 {
        self.default_window.num_seconds().max(0)
    }

    /// Resolves optional query bounds to an inclusive `(from, to)` pair of Unix seconds.
    pub(crate) fn resolve_window(
        &self,
        now: impl FnOnce() -> i64,
        to: Option<i64>,
        from: Option<i64>,
    ) -> Result<(i64, i64)> {
        let to = to.unwrap_or_else(now);
        let from = from.unwrap_or_else(|| to.saturating_sub(self.window_secs()));
        if to < from {
            warn!("rejected range query, to {} precedes from {}", to, from);
            return Err(Error::InvalidRange { from, to });
        }
        Ok((from, to))
    }
}

#[inline]
pub(crate) fn log_evicted(evicted: usize, from: i64, to: i64) {
    if evicted > 0 {
        debug!("evicted {} timestamps outside [{}, {}]", evicted, from, to);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eviction: Eviction::OnQuery,
            default_window: Duration::seconds(DEFAULT_WINDOW_SECS),
        }
    }
}
