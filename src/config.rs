//! Engine configuration.
//!
//! Everything is passed as explicit parameters with documented defaults.
//! Nothing is read from the environment or from files.

use alloc::format;

use crate::error::{GestaltError, GestaltResult};
use crate::factor::LargeStrategy;
use crate::similarity::SimilarityMetric;

/// Default dynamic cache capacity (entries).
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Inputs at or above this value use the large-number strategy.
pub const DEFAULT_LARGE_THRESHOLD: u64 = 1_000_000;

/// Default minimum similarity for an edge to exist.
pub const DEFAULT_EDGE_THRESHOLD: f64 = 0.3;

/// Default minimum edge strength for two nodes to share a cluster.
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.7;

// ─── CacheConfig ─────────────────────────────────────────────────────────────

/// Configuration for [`crate::factor::FactorizationCache`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    /// Maximum number of dynamically cached factorizations. Default: 1000.
    ///
    /// Zero disables the dynamic cache; the static table still applies.
    pub capacity: usize,

    /// Inputs `>= large_threshold` are factorized with `large_strategy`
    /// instead of plain trial division. Default: 1,000,000.
    pub large_threshold: u64,

    /// Strategy for large inputs. Default: [`LargeStrategy::PollardRho`].
    pub large_strategy: LargeStrategy,

    /// Consult the static table of common tensor dimensions. Default: true.
    pub use_static_table: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            large_threshold: DEFAULT_LARGE_THRESHOLD,
            large_strategy: LargeStrategy::PollardRho,
            use_static_table: true,
        }
    }
}

impl CacheConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> GestaltResult<()> {
        if self.large_threshold < 2 {
            return Err(GestaltError::Config(format!(
                "large_threshold must be >= 2, got {}",
                self.large_threshold
            )));
        }
        Ok(())
    }
}

// ─── GraphConfig ─────────────────────────────────────────────────────────────

/// Thresholds and metric for [`crate::graph::SimilarityGraph`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphConfig {
    /// An edge exists when similarity is strictly greater than this. Default: 0.3.
    pub edge_threshold: f64,

    /// Edges strictly stronger than this join clusters. Default: 0.7.
    ///
    /// Must be strictly greater than `edge_threshold`.
    pub cluster_threshold: f64,

    /// Similarity metric used for edges and cluster coherence.
    pub metric: SimilarityMetric,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            metric: SimilarityMetric::Weighted,
        }
    }
}

impl GraphConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> GestaltResult<()> {
        if !(0.0..=1.0).contains(&self.edge_threshold) {
            return Err(GestaltError::Config(format!(
                "edge_threshold must be in [0, 1], got {}",
                self.edge_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.cluster_threshold) {
            return Err(GestaltError::Config(format!(
                "cluster_threshold must be in [0, 1], got {}",
                self.cluster_threshold
            )));
        }
        if self.cluster_threshold <= self.edge_threshold {
            return Err(GestaltError::Config(format!(
                "cluster_threshold ({}) must be greater than edge_threshold ({})",
                self.cluster_threshold, self.edge_threshold
            )));
        }
        Ok(())
    }
}

// ─── EngineConfig ────────────────────────────────────────────────────────────

/// Full configuration for [`crate::engine::GestaltEngine`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Factorization cache settings.
    pub cache: CacheConfig,
    /// Similarity graph settings.
    pub graph: GraphConfig,
}

impl EngineConfig {
    /// Validate both sections.
    pub fn validate(&self) -> GestaltResult<()> {
        self.cache.validate()?;
        self.graph.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cache.capacity, 1000);
        assert_eq!(cfg.graph.edge_threshold, 0.3);
        assert_eq!(cfg.graph.cluster_threshold, 0.7);
    }

    #[test]
    fn test_cluster_threshold_must_exceed_edge_threshold() {
        let cfg = GraphConfig {
            edge_threshold: 0.5,
            cluster_threshold: 0.5,
            ..GraphConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GestaltError::Config(_))));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let cfg = GraphConfig {
            edge_threshold: f64::NAN,
            ..GraphConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_tiny_large_threshold_rejected() {
        let cfg = CacheConfig {
            large_threshold: 1,
            ..CacheConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_is_valid() {
        let cfg = CacheConfig {
            capacity: 0,
            ..CacheConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
