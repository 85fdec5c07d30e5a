//! A timestamp-indexed hit counter with windowed queries.
//!
//! `HitCounter` keeps one entry per whole second in which at least one hit was
//! recorded. A range query sums the entries that fall inside an inclusive
//! `[from, to]` window and, unless eviction has been disabled, drops every entry
//! outside that window while it walks the index. Cleanup therefore rides on the
//! read path: a counter that is queried regularly never holds much more than
//! the last window's worth of seconds.
//!
//! ## Example
//! ```rust
//! use hit_counter::HitCounter;
//!
//! let mut counter = HitCounter::new();
//! counter.record().record();
//! assert_eq!(counter.count_recent().unwrap(), 2);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone};
use log::info;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::{log_evicted, Config, Eviction};

#[derive(Debug, Clone)]
pub struct HitCounter<C = SystemClock> {
    counts: BTreeMap<i64, u64>,
    config: Config,
    clock: C,
}

impl HitCounter<SystemClock> {
    /// Creates an empty counter on the wall clock with the default config.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_config_and_clock(config, SystemClock)
    }
}

impl Default for HitCounter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> HitCounter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_config_and_clock(Config::default(), clock)
    }

    pub fn with_config_and_clock(config: Config, clock: C) -> Self {
        HitCounter {
            counts: BTreeMap::new(),
            config,
            clock,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn eviction(&self) -> Eviction {
        self.config.eviction
    }

    /// Stops range queries from deleting out-of-window timestamps.
    pub fn disable_eviction(&mut self) -> &mut Self {
        if self.config.eviction == Eviction::OnQuery {
            info!("eviction disabled, {} timestamps retained", self.counts.len());
        }
        self.config.eviction = Eviction::Disabled;
        self
    }

    /// Records one hit at the clock's current second.
    #[inline]
    pub fn record(&mut self) -> &mut Self {
        let now = self.clock.now();
        self.record_at(now)
    }

    /// Records one hit at the second containing `at`.
    #[inline]
    pub fn record_at<Tz: TimeZone>(&mut self, at: DateTime<Tz>) -> &mut Self {
        self.record_many_at(at, 1)
    }

    /// Records `hits` hits at the second containing `at`. Zero hits leaves the index untouched.
    pub fn record_many_at<Tz: TimeZone>(&mut self, at: DateTime<Tz>, hits: u64) -> &mut Self {
        if hits > 0 {
            let count = self.counts.entry(at.timestamp()).or_insert(0);
            *count = count.saturating_add(hits);
        }
        self
    }

    #[inline]
    pub fn has_timestamp<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        self.counts.contains_key(&at.timestamp())
    }

    /// Tracked seconds, oldest first.
    #[inline]
    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.counts.keys().copied()
    }

    #[inline]
    pub fn timestamp_count(&self) -> usize {
        self.counts.len()
    }

    /// Returns the hits recorded at exactly `second`.
    ///
    /// A second that is not tracked is an error rather than zero; check with
    /// [`has_timestamp`](Self::has_timestamp) first if absence is expected.
    #[inline]
    pub fn count_at(&self, second: i64) -> Result<u64> {
        self.counts
            .get(&second)
            .copied()
            .ok_or(Error::TimestampNotFound(second))
    }

    #[inline]
    pub fn counts(&self) -> &BTreeMap<i64, u64> {
        &self.counts
    }

    #[inline]
    pub fn log_size(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn total_hits(&self) -> u64 {
        self.counts.values().fold(0u64, |acc, hits| acc.saturating_add(*hits))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Counts hits in the inclusive window `[from, to]`.
    ///
    /// `to` defaults to now and `from` to `to` minus the configured default
    /// window. With eviction enabled, every tracked second outside the window
    /// is removed as part of this call.
    pub fn count_in_range<Tz: TimeZone>(
        &mut self,
        to: Option<DateTime<Tz>>,
        from: Option<DateTime<Tz>>,
    ) -> Result<u64> {
        let (from, to) = self.window(
            to.map(|t| t.timestamp()),
            from.map(|f| f.timestamp()),
        )?;
        Ok(self.count_window(from, to))
    }

    /// Hits in the default window ending now.
    #[inline]
    pub fn count_recent(&mut self) -> Result<u64> {
        let (from, to) = self.window(None, None)?;
        Ok(self.count_window(from, to))
    }

    /// Hits in the default window ending at `to`.
    #[inline]
    pub fn count_until<Tz: TimeZone>(&mut self, to: DateTime<Tz>) -> Result<u64> {
        self.count_in_range(Some(to), None)
    }

    #[inline]
    pub fn count_between<Tz: TimeZone>(
        &mut self,
        from: DateTime<Tz>,
        to: DateTime<Tz>,
    ) -> Result<u64> {
        self.count_in_range(Some(to), Some(from))
    }

    /// Average hits per second over the default window ending now.
    pub fn rate_per_second(&mut self) -> Result<f64> {
        let (from, to) = self.window(None, None)?;
        let hits = self.count_window(from, to) as f64;
        let window_secs = self.config.window_secs() as f64;
        if window_secs == 0.0 {
            return Ok(0.0);
        }
        Ok(hits / window_secs)
    }

    /// Removes every tracked second outside `[from, to]`, whatever the eviction
    /// policy. Returns how many seconds were dropped.
    pub fn evict_outside<Tz: TimeZone>(
        &mut self,
        from: DateTime<Tz>,
        to: DateTime<Tz>,
    ) -> Result<usize> {
        let (from, to) = self.window(Some(to.timestamp()), Some(from.timestamp()))?;
        let before = self.counts.len();
        self.counts.retain(|ts, _| (from..=to).contains(ts));
        let evicted = before - self.counts.len();
        log_evicted(evicted, from, to);
        Ok(evicted)
    }

    fn window(&self, to: Option<i64>, from: Option<i64>) -> Result<(i64, i64)> {
        self.config.resolve_window(|| self.clock.now().timestamp(), to, from)
    }

    fn count_window(&mut self, from: i64, to: i64) -> u64 {
        match self.config.eviction {
            Eviction::Disabled => self
                .counts
                .range(from..=to)
                .fold(0u64, |acc, (_, hits)| acc.saturating_add(*hits)),
            Eviction::OnQuery => {
                let mut total: u64 = 0;
                let mut evicted = 0;
                self.counts.retain(|ts, hits| {
                    if (from..=to).contains(ts) {
                        total = total.saturating_add(*hits);
                        true
                    } else {
                        evicted += 1;
                        false
                    }
                });
                log_evicted(evicted, from, to);
                total
            }
        }
    }
}
