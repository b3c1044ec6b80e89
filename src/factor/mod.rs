/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Memoized prime factorization for tensor dimensions.
//!
//! [`FactorizationCache`] answers `factorize(n)` from three tiers, in order:
//!
//! 1. the static table of common dimensions ([`table`]),
//! 2. a bounded dynamic cache,
//! 3. a fresh computation via [`strategy`].
//!
//! When the dynamic cache is full new results are simply not stored. A full
//! cache costs speed, never correctness.
//!
//! # Invariants
//!
//! - The product of `factorize(n)` equals `n` for every `n > 1`.
//! - Factors are prime and non-decreasing; `n <= 1` yields an empty vector.
//! - Cached, static and freshly computed answers are identical.

pub mod strategy;
pub mod table;

use alloc::vec::Vec;

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::{GestaltError, GestaltResult};

pub use strategy::LargeStrategy;
pub use table::COMMON_DIMENSIONS;

// ─── CacheStats ──────────────────────────────────────────────────────────────

/// Introspection counters for a [`FactorizationCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    /// Entries currently held in the dynamic cache.
    pub size: usize,
    /// Maximum entries the dynamic cache will hold.
    pub capacity: usize,
    /// Lookups answered by the dynamic cache.
    pub hits: u64,
    /// Lookups answered by the static table.
    pub static_hits: u64,
    /// Lookups that required a fresh computation.
    pub misses: u64,
}

// ─── FactorizationCache ──────────────────────────────────────────────────────

/// Bounded memoizing factorizer.
///
/// Owned by the caller (usually through a
/// [`crate::signature::SignatureEncoder`]); there is no global cache.
#[derive(Clone, Debug)]
pub struct FactorizationCache {
    entries: HashMap<u64, Vec<u64>>,
    config: CacheConfig,
    hits: u64,
    static_hits: u64,
    misses: u64,
}

impl FactorizationCache {
    /// Create a cache with the default configuration.
    pub fn new() -> Self {
        Self::from_config(CacheConfig::default())
    }

    /// Create a cache holding at most `capacity` dynamic entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_config(CacheConfig {
            capacity,
            ..CacheConfig::default()
        })
    }

    /// Create a cache from a validated configuration.
    pub fn try_new(config: CacheConfig) -> GestaltResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::with_capacity(config.capacity.min(1024)),
            config,
            hits: 0,
            static_hits: 0,
            misses: 0,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Prime factors of `n`, ascending with multiplicity. Empty for `n <= 1`.
    pub fn factorize(&mut self, n: u64) -> Vec<u64> {
        if n <= 1 {
            return Vec::new();
        }
        if self.config.use_static_table {
            if let Some(factors) = table::lookup(n) {
                self.static_hits += 1;
                trace!(n, "factorization static hit");
                return factors.to_vec();
            }
        }
        if let Some(factors) = self.entries.get(&n) {
            self.hits += 1;
            trace!(n, "factorization cache hit");
            return factors.clone();
        }

        self.misses += 1;
        let factors = self.factorize_uncached(n);
        trace!(n, count = factors.len(), "factorization cache miss");
        self.store(n, &factors);
        factors
    }

    /// Factorize without reading or writing any cache tier.
    pub fn factorize_uncached(&self, n: u64) -> Vec<u64> {
        if n < self.config.large_threshold {
            return strategy::trial_division(n);
        }
        match self.config.large_strategy {
            LargeStrategy::PollardRho => {
                strategy::pollard_factorize(n, self.config.large_threshold)
            }
            LargeStrategy::Wheel => strategy::wheel_factorize(n),
            LargeStrategy::TrialDivision => strategy::trial_division(n),
        }
    }

    /// Lenient signed entry point: negative input yields an empty vector.
    pub fn factorize_signed(&mut self, n: i64) -> Vec<u64> {
        match u64::try_from(n) {
            Ok(n) => self.factorize(n),
            Err(_) => Vec::new(),
        }
    }

    /// Strict signed entry point: negative input is an error.
    pub fn try_factorize_signed(&mut self, n: i64) -> GestaltResult<Vec<u64>> {
        let n = u64::try_from(n).map_err(|_| GestaltError::NegativeInput(n))?;
        Ok(self.factorize(n))
    }

    /// Factorize every value, returning results in the input order.
    ///
    /// Values are processed in ascending order so repeated and neighbouring
    /// values hit the cache back to back.
    pub fn batch_factorize(&mut self, values: &[u64]) -> Vec<Vec<u64>> {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by_key(|&i| values[i]);

        let mut out: Vec<Vec<u64>> = alloc::vec![Vec::new(); values.len()];
        for i in order {
            out[i] = self.factorize(values[i]);
        }
        out
    }

    /// Warm the dynamic cache with `values`, bypassing the static table.
    ///
    /// Stops storing once capacity is reached. Returns the cache size afterwards.
    pub fn precompute(&mut self, values: &[u64]) -> usize {
        for &n in values {
            if self.entries.len() >= self.config.capacity {
                break;
            }
            if n <= 1 || self.entries.contains_key(&n) {
                continue;
            }
            let factors = self.factorize_uncached(n);
            self.store(n, &factors);
        }
        debug!(size = self.entries.len(), "factorization cache precomputed");
        self.entries.len()
    }

    /// Drop every dynamic entry and reset the counters.
    pub fn clear(&mut self) {
        debug!(evicted = self.entries.len(), "factorization cache cleared");
        self.entries.clear();
        self.hits = 0;
        self.static_hits = 0;
        self.misses = 0;
    }

    /// Current size, capacity and hit counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.config.capacity,
            hits: self.hits,
            static_hits: self.static_hits,
            misses: self.misses,
        }
    }

    /// Number of dynamic entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the dynamic cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn store(&mut self, n: u64, factors: &[u64]) {
        if self.entries.len() < self.config.capacity {
            self.entries.insert(n, factors.to_vec());
        }
    }
}

impl Default for FactorizationCache {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
