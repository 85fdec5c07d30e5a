use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::{log_evicted, Config, Eviction};

type DashMap<K, V> = dashmap::DashMap<K, V, ahash::RandomState>;

/// A hit counter that can be recorded into from many threads at once.
///
/// Behaves like [`HitCounter`](crate::HitCounter), but every operation takes
/// `&self` and the per-second counts live in a sharded map. Clones share the
/// same counts. The eviction policy is fixed when the counter is built.
#[derive(Clone)]
pub struct SharedHitCounter<C = SystemClock> {
    counts: Arc<DashMap<i64, u64>>,
    config: Config,
    clock: C,
}

impl SharedHitCounter<SystemClock> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_config_and_clock(config, SystemClock)
    }
}

impl Default for SharedHitCounter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SharedHitCounter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_config_and_clock(Config::default(), clock)
    }

    pub fn with_config_and_clock(config: Config, clock: C) -> Self {
        SharedHitCounter {
            counts: Arc::new(DashMap::default()),
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

    #[inline]
    pub fn record(&self) -> &Self {
        self.record_at(self.clock.now())
    }

    #[inline]
    pub fn record_at<Tz: TimeZone>(&self, at: DateTime<Tz>) -> &Self {
        self.record_many_at(at, 1)
    }

    pub fn record_many_at<Tz: TimeZone>(&self, at: DateTime<Tz>, hits: u64) -> &Self {
        if hits > 0 {
            let mut count = self.counts.entry(at.timestamp()).or_insert(0);
            *count = count.saturating_add(hits);
        }
        self
    }

    #[inline]
    pub fn has_timestamp<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        self.counts.contains_key(&at.timestamp())
    }

    /// Snapshot of the tracked seconds, oldest first.
    pub fn timestamps(&self) -> Vec<i64> {
        let mut timestamps = self.counts.iter().map(|e| *e.key()).collect::<Vec<_>>();
        timestamps.sort_unstable();
        timestamps
    }

    #[inline]
    pub fn timestamp_count(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn count_at(&self, second: i64) -> Result<u64> {
        self.counts
            .get(&second)
            .map(|hits| *hits)
            .ok_or(Error::TimestampNotFound(second))
    }

    /// Snapshot of every tracked second and its count.
    pub fn counts(&self) -> BTreeMap<i64, u64> {
        self.counts
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect()
    }

    #[inline]
    pub fn log_size(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn total_hits(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(*e.value()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&self) {
        self.counts.clear();
    }

    pub fn count_in_range<Tz: TimeZone>(
        &self,
        to: Option<DateTime<Tz>>,
        from: Option<DateTime<Tz>>,
    ) -> Result<u64> {
        let (from, to) = self.window(
            to.map(|t| t.timestamp()),
            from.map(|f| f.timestamp()),
        )?;
        Ok(self.count_window(from, to))
    }

    #[inline]
    pub fn count_recent(&self) -> Result<u64> {
        let (from, to) = self.window(None, None)?;
        Ok(self.count_window(from, to))
    }

    #[inline]
    pub fn count_until<Tz: TimeZone>(&self, to: DateTime<Tz>) -> Result<u64> {
        self.count_in_range(Some(to), None)
    }

    #[inline]
    pub fn count_between<Tz: TimeZone>(
        &self,
        from: DateTime<Tz>,
        to: DateTime<Tz>,
    ) -> Result<u64> {
        self.count_in_range(Some(to), Some(from))
    }

    pub fn evict_outside<Tz: TimeZone>(
        &self,
        from: DateTime<Tz>,
        to: DateTime<Tz>,
    ) -> Result<usize> {
        let (from, to) = self.window(Some(to.timestamp()), Some(from.timestamp()))?;
        let mut evicted = 0;
        self.counts.retain(|ts, _| {
            let keep = (from..=to).contains(ts);
            if !keep {
                evicted += 1;
            }
            keep
        });
        log_evicted(evicted, from, to);
        Ok(evicted)
    }

    fn window(&self, to: Option<i64>, from: Option<i64>) -> Result<(i64, i64)> {
        self.config.resolve_window(|| self.clock.now().timestamp(), to, from)
    }

    fn count_window(&self, from: i64, to: i64) -> u64 {
        if self.config.eviction == Eviction::Disabled {
            return self
                .counts
                .iter()
                .filter(|e| (from..=to).contains(e.key()))
                .fold(0u64, |acc, e| acc.saturating_add(*e.value()));
        }
        let mut total: u64 = 0;
        let mut evicted = 0;
        // Sum and sweep in one pass per shard.
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
