//! Cache Configuration
//!
//! [`CacheConfig`] holds the four knobs of an [`ExpiringCache`]:
//!
//! | Field            | Default | Meaning                                         |
//! |------------------|---------|-------------------------------------------------|
//! | `ttl`            | 60s     | Lifetime of a key, measured from its insertion  |
//! | `capacity_hint`  | 0       | Pre-allocation hint; never enforced             |
//! | `sweep_interval` | 1s      | Cadence of the background reaper                |
//! | `shard_count`    | 16      | Number of independently locked store partitions |
//!
//! [`CacheBuilder`] wraps the same fields with chained setters.
//!
//! [`ExpiringCache`]: crate::cache::ExpiringCache

use crate::cache::ExpiringCache;
use crate::clock::Clock;
use crate::error::{CacheError, Result};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Default time-to-live for cached keys.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default interval between reaper sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of store shards.
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Configuration for an [`ExpiringCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Nominal lifetime of a key after `put`. Must be a whole number of
    /// seconds; see [`ExpiringCache`] for the exact retirement window.
    pub ttl: Duration,

    /// Expected number of live keys. Only used to pre-size shard maps.
    pub capacity_hint: usize,

    /// How often the reaper wakes up to retire expired buckets.
    pub sweep_interval: Duration,

    /// Number of store shards. Fixed for the lifetime of the cache.
    pub shard_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            capacity_hint: 0,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

impl CacheConfig {
    /// Builds a configuration from whole-second values.
    pub fn new(
        ttl_secs: u64,
        capacity_hint: usize,
        sweep_interval_secs: u64,
        shard_count: usize,
    ) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            capacity_hint,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            shard_count,
        }
    }

    /// TTL in whole seconds, as used by the expiry queue.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Checks that the configuration can produce a working cache.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.as_secs() == 0 {
            return Err(CacheError::InvalidConfig(
                "ttl must be at least one second".to_string(),
            ));
        }
        if self.ttl.subsec_nanos() != 0 {
            return Err(CacheError::InvalidConfig(format!(
                "ttl must be a whole number of seconds, got {:?}",
                self.ttl
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be non-zero".to_string(),
            ));
        }
        if self.shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard count must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for an [`ExpiringCache`].
///
/// # Example
///
/// ```
/// use flashcache::CacheBuilder;
/// use std::time::Duration;
///
/// let cache = CacheBuilder::new()
///     .ttl(Duration::from_secs(30))
///     .shard_count(8)
///     .build::<u64, String>()
///     .unwrap();
///
/// assert!(cache.put(1, "one".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time-to-live of every key.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Sets the advisory capacity hint.
    pub fn capacity_hint(mut self, capacity_hint: usize) -> Self {
        self.config.capacity_hint = capacity_hint;
        self
    }

    /// Sets how often the reaper sweeps.
    pub fn sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.config.sweep_interval = sweep_interval;
        self
    }

    /// Sets the number of store shards.
    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.config.shard_count = shard_count;
        self
    }

    /// Returns the configuration built so far.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Builds the cache and starts its reaper.
    pub fn build<K, V>(self) -> Result<ExpiringCache<K, V>>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        ExpiringCache::new(self.config)
    }

    /// Builds the cache against a custom time source.
    pub fn build_with_clock<K, V>(self, clock: Arc<dyn Clock>) -> Result<ExpiringCache<K, V>>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        ExpiringCache::with_clock(self.config, clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ttl_secs(), 60);
        assert_eq!(config.shard_count, DEFAULT_SHARD_COUNT);
    }

    #[test]
    fn test_new_from_seconds() {
        let config = CacheConfig::new(2, 100, 1, 4);
        assert_eq!(config.ttl, Duration::from_secs(2));
        assert_eq!(config.capacity_hint, 100);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.shard_count, 4);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let zero_ttl = CacheConfig::new(0, 0, 1, 4);
        assert!(matches!(
            zero_ttl.validate(),
            Err(CacheError::InvalidConfig(_))
        ));

        let sub_second_ttl = CacheConfig {
            ttl: Duration::from_millis(500),
            ..Default::default()
        };
        assert!(sub_second_ttl.validate().is_err());

        let fractional_ttl = CacheConfig {
            ttl: Duration::from_millis(1_900),
            ..Default::default()
        };
        assert!(matches!(
            fractional_ttl.validate(),
            Err(CacheError::InvalidConfig(_))
        ));

        let zero_sweep = CacheConfig::new(2, 0, 0, 4);
        assert!(zero_sweep.validate().is_err());

        let zero_shards = CacheConfig::new(2, 0, 1, 0);
        assert!(zero_shards.validate().is_err());
    }

    #[test]
    fn test_builder_setters() {
        let builder = CacheBuilder::new()
            .ttl(Duration::from_secs(5))
            .capacity_hint(1024)
            .sweep_interval(Duration::from_millis(250))
            .shard_count(32);

        let config = builder.config();
        assert_eq!(config.ttl, Duration::from_secs(5));
        assert_eq!(config.capacity_hint, 1024);
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
        assert_eq!(config.shard_count, 32);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = CacheBuilder::new().shard_count(0).build::<u32, u32>();
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }
}
