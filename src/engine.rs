/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Public facade over the encoder, graph, clustering and field synthesis.
//!
//! A [`GestaltEngine`] owns exactly one [`SignatureEncoder`] (and through it
//! one [`FactorizationCache`](crate::factor::FactorizationCache)) and one
//! [`SimilarityGraph`]. Independent engines share nothing.
//!
//! ```text
//! shape ──encode_shape──▶ ShapeEncoding ──upsert_node──▶ SimilarityGraph
//!                                                         │
//!                          get_clusters ◀─────────────────┤
//!                          synthesize_field ◀─────────────┘
//! ```
//!
//! The engine is single-threaded by contract; see `SharedEngine` (feature `std`) for a
//! lock-guarded handle.

use alloc::vec::Vec;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::cluster::Cluster;
use crate::config::EngineConfig;
use crate::error::GestaltResult;
use crate::factor::{CacheStats, FactorizationCache};
use crate::gestalt::{synthesize, GestaltField};
use crate::graph::{GraphNode, NodeHandle, NodeId, SimilarityGraph};
use crate::signature::{GrammarRule, ShapeEncoding, SignatureEncoder};

/// Stateful signature engine keyed by caller-assigned node ids.
#[derive(Debug)]
pub struct GestaltEngine<Id: NodeId> {
    encoder: SignatureEncoder,
    graph: SimilarityGraph<Id>,
}

impl<Id: NodeId> GestaltEngine<Id> {
    /// Engine with default cache and graph settings.
    pub fn new() -> Self {
        Self {
            encoder: SignatureEncoder::new(),
            graph: SimilarityGraph::new(),
        }
    }

    /// Engine built from a validated [`EngineConfig`].
    pub fn try_new(config: EngineConfig) -> GestaltResult<Self> {
        config.validate()?;
        let cache = FactorizationCache::try_new(config.cache)?;
        Ok(Self {
            encoder: SignatureEncoder::with_cache(cache),
            graph: SimilarityGraph::try_new(config.graph)?,
        })
    }

    /// The shape encoder.
    pub fn encoder(&self) -> &SignatureEncoder {
        &self.encoder
    }

    /// The similarity graph.
    pub fn graph(&self) -> &SimilarityGraph<Id> {
        &self.graph
    }

    // ─── Factorization ──────────────────────────────────────────────────────

    /// Prime factors of `n`, memoized.
    pub fn factorize(&mut self, n: u64) -> Vec<u64> {
        self.encoder.cache_mut().factorize(n)
    }

    /// Lenient signed factorization: negative input yields an empty vector.
    pub fn factorize_signed(&mut self, n: i64) -> Vec<u64> {
        self.encoder.cache_mut().factorize_signed(n)
    }

    /// Signed batch factorization, preserving input order.
    ///
    /// Non-negative values go through [`Self::batch_factorize`]; negative
    /// values map to empty vectors.
    pub fn batch_factorize_signed(&mut self, values: &[i64]) -> Vec<Vec<u64>> {
        let unsigned: Vec<u64> = values
            .iter()
            .filter_map(|&n| u64::try_from(n).ok())
            .collect();
        let mut factored = self.batch_factorize(&unsigned).into_iter();
        values
            .iter()
            .map(|&n| {
                if n < 0 {
                    Vec::new()
                } else {
                    factored.next().unwrap_or_default()
                }
            })
            .collect()
    }

    /// Factorize many values, preserving input order.
    pub fn batch_factorize(&mut self, values: &[u64]) -> Vec<Vec<u64>> {
        self.encoder.cache_mut().batch_factorize(values)
    }

    /// Warm the factorization cache. Returns the cache size afterwards.
    pub fn precompute(&mut self, values: &[u64]) -> usize {
        self.encoder.cache_mut().precompute(values)
    }

    /// Factorization cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.encoder.cache().stats()
    }

    /// Empty the dynamic factorization cache.
    pub fn clear_cache(&mut self) {
        self.encoder.cache_mut().clear();
    }

    // ─── Encoding ───────────────────────────────────────────────────────────

    /// Encode `shape` on behalf of `id`.
    ///
    /// The encoding depends only on the shape; `id` is used for diagnostics.
    /// Returns `None` for an empty shape or a zero dimension.
    pub fn encode_shape(&mut self, shape: &[usize], id: &Id) -> Option<ShapeEncoding> {
        match self.encoder.try_encode(shape) {
            Ok(encoding) => Some(encoding),
            Err(e) => {
                warn!(node = ?id, ?shape, error = %e, "rejected shape");
                None
            }
        }
    }

    /// Strict variant of [`Self::encode_shape`].
    pub fn try_encode_shape(&mut self, shape: &[usize]) -> GestaltResult<ShapeEncoding> {
        self.encoder.try_encode(shape)
    }

    /// Similarity of two encodings under the graph's metric.
    pub fn similarity(&self, a: &ShapeEncoding, b: &ShapeEncoding) -> f64 {
        self.graph.config().metric.score(a, b)
    }

    /// Register a named category override.
    ///
    /// Affects encodings produced afterwards; registered nodes keep theirs
    /// until they are re-encoded.
    pub fn add_grammar_rule<R>(&mut self, name: &str, rule: R) -> GestaltResult<()>
    where
        R: GrammarRule + 'static,
    {
        self.encoder.add_grammar_rule(name, rule)?;
        debug!(rule = name, "grammar rule added");
        Ok(())
    }

    /// Remove a grammar rule by name.
    pub fn remove_grammar_rule(&mut self, name: &str) -> bool {
        self.encoder.remove_grammar_rule(name)
    }

    // ─── Graph ──────────────────────────────────────────────────────────────

    /// Insert or re-encode a node and recompute its edges.
    pub fn upsert_node(&mut self, id: Id, encoding: ShapeEncoding, activity: f64) -> NodeHandle {
        self.graph.upsert_node(id, encoding, activity)
    }

    /// Insert a node whose id must be new.
    pub fn insert_node(
        &mut self,
        id: Id,
        encoding: ShapeEncoding,
        activity: f64,
    ) -> GestaltResult<NodeHandle> {
        self.graph.insert_node(id, encoding, activity)
    }

    /// Encode `shape` and upsert it as `id` in one step.
    ///
    /// Returns `None` (and leaves the graph untouched) when the shape is invalid.
    pub fn register_shape(&mut self, id: Id, shape: &[usize], activity: f64) -> Option<NodeHandle> {
        let encoding = self.encode_shape(shape, &id)?;
        Some(self.graph.upsert_node(id, encoding, activity))
    }

    /// Unregister a node and its edges.
    pub fn remove_node(&mut self, id: &Id) -> Option<GraphNode<Id>> {
        self.graph.remove_node(id)
    }

    /// Update a node's activity.
    pub fn set_activity(&mut self, id: &Id, activity: f64) -> GestaltResult<()> {
        self.graph.set_activity(id, activity)
    }

    /// Clusters of the current graph. Recomputed on every call.
    pub fn get_clusters(&self) -> Vec<Cluster<Id>> {
        self.graph.compute_clusters()
    }

    // ─── Fields ─────────────────────────────────────────────────────────────

    /// Field over the registered nodes named in `activities`.
    ///
    /// Nodes are taken in graph insertion order with the supplied activity.
    /// Ids that are not registered are skipped. Returns `None` when no named
    /// node is registered.
    pub fn synthesize_field<A>(&self, activities: A) -> Option<GestaltField<Id>>
    where
        A: IntoIterator<Item = (Id, f64)>,
    {
        let mut requested: HashMap<Id, f64> = activities.into_iter().collect();
        let mut picked = Vec::with_capacity(requested.len());
        for node in self.graph.nodes() {
            if let Some(activity) = requested.remove(node.id()) {
                picked.push((node.id(), Some(node.encoding()), activity));
            }
        }
        for unknown in requested.keys() {
            warn!(node = ?unknown, "activity for unregistered node ignored");
        }
        synthesize(picked)
    }

    /// Field over every registered node using its stored activity.
    pub fn synthesize_registered(&self) -> Option<GestaltField<Id>> {
        synthesize(
            self.graph
                .nodes()
                .map(|n| (n.id(), Some(n.encoding()), n.activity())),
        )
    }
}

impl<Id: NodeId> Default for GestaltEngine<Id> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, GraphConfig};
    use crate::error::GestaltError;
    use crate::signature::Category;
    use alloc::string::{String, ToString};
    use alloc::vec;

    #[test]
    fn test_encode_shape_rejects_invalid() {
        let mut engine: GestaltEngine<u32> = GestaltEngine::new();
        assert!(engine.encode_shape(&[], &1).is_none());
        assert!(engine.encode_shape(&[3, 0], &1).is_none());
        assert_eq!(
            engine.try_encode_shape(&[3, 0]),
            Err(GestaltError::ZeroDimension { index: 1 })
        );
        assert!(engine.register_shape(1, &[0], 1.0).is_none());
        assert!(engine.graph().is_empty());
    }

    #[test]
    fn test_encoding_ignores_id() {
        let mut engine: GestaltEngine<String> = GestaltEngine::new();
        let a = engine.encode_shape(&[3, 224, 224], &"a".to_string()).unwrap();
        let b = engine.encode_shape(&[3, 224, 224], &"b".to_string()).unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_register_and_cluster() {
        let mut engine: GestaltEngine<u32> = GestaltEngine::new();
        for id in 0..3 {
            engine.register_shape(id, &[2, 2], 1.0).unwrap();
        }
        engine.register_shape(3, &[3, 5], 1.0).unwrap();
        let clusters = engine.get_clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, [0, 1, 2]);
        assert_eq!(clusters[1].members, [3]);
    }

    #[test]
    fn test_synthesize_field_uses_supplied_activity_and_skips_unknown() {
        let mut engine: GestaltEngine<u32> = GestaltEngine::new();
        engine.register_shape(1, &[4], 9.0).unwrap();
        engine.register_shape(2, &[4], 9.0).unwrap();
        engine.register_shape(3, &[8], 9.0).unwrap();

        let field = engine
            .synthesize_field(vec![(2, 0.5), (1, 0.5), (99, 4.0)])
            .unwrap();
        let ids: Vec<u32> = field.components.iter().map(|c| c.id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(field.coherence, 1.0);
        assert_eq!(field.entropy.normalized, 0.0);

        assert!(engine.synthesize_field(vec![(99, 1.0)]).is_none());
    }

    #[test]
    fn test_synthesize_registered_uses_stored_activity() {
        let mut engine: GestaltEngine<u32> = GestaltEngine::new();
        assert!(engine.synthesize_registered().is_none());
        engine.register_shape(1, &[2], 1.0).unwrap();
        engine.register_shape(2, &[3], 3.0).unwrap();
        let field = engine.synthesize_registered().unwrap();
        assert_eq!(field.components.len(), 2);
        assert!(field.coherence < 1.0);
        assert!((field.entropy.normalized - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_grammar_rule_applies_to_later_encodings() {
        let mut engine: GestaltEngine<u32> = GestaltEngine::new();
        engine.register_shape(1, &[3, 3], 1.0).unwrap();
        engine
            .add_grammar_rule("square", |s: &[usize]| -> Option<Category> {
                (s.len() == 2 && s[0] == s[1]).then_some(Category::Tensor)
            })
            .unwrap();
        assert!(matches!(
            engine.add_grammar_rule("square", |_: &[usize]| -> Option<Category> { None }),
            Err(GestaltError::DuplicateRule(_))
        ));
        assert_eq!(
            engine.graph().node(&1).unwrap().encoding().category(),
            Category::Matrix
        );
        let e = engine.encode_shape(&[3, 3], &2).unwrap();
        assert_eq!(e.signature(), "tensor_p3:p3");
        assert!(engine.remove_grammar_rule("square"));
    }

    #[test]
    fn test_cache_passthrough() {
        let mut engine: GestaltEngine<u32> = GestaltEngine::new();
        assert_eq!(engine.factorize(9_240), [2, 2, 2, 3, 5, 7, 11]);
        assert_eq!(engine.factorize(9_240), [2, 2, 2, 3, 5, 7, 11]);
        let stats = engine.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        engine.clear_cache();
        assert_eq!(engine.cache_stats().size, 0);
        assert_eq!(engine.batch_factorize(&[6, 1]), [vec![2u64, 3], vec![]]);
    }

    #[test]
    fn test_signed_batch_uses_shared_cache_pass() {
        let mut engine: GestaltEngine<u32> = GestaltEngine::try_new(EngineConfig {
            cache: CacheConfig {
                use_static_table: false,
                ..CacheConfig::default()
            },
            ..EngineConfig::default()
        })
        .unwrap();
        let out = engine.batch_factorize_signed(&[12, -12, 7, 12, -1, 1]);
        assert_eq!(
            out,
            [vec![2u64, 2, 3], vec![], vec![7], vec![2, 2, 3], vec![], vec![]]
        );
        // 7 and 12 computed once each; the second 12 is a dynamic hit
        let stats = engine.cache_stats();
        assert_eq!((stats.misses, stats.hits, stats.size), (2, 1, 2));
    }

    #[test]
    fn test_try_new_validates() {
        let bad = EngineConfig {
            cache: CacheConfig::default(),
            graph: GraphConfig {
                edge_threshold: 1.5,
                ..GraphConfig::default()
            },
        };
        assert!(matches!(
            GestaltEngine::<u32>::try_new(bad),
            Err(GestaltError::Config(_))
        ));
        let ok = GestaltEngine::<u32>::try_new(EngineConfig::default());
        assert!(ok.is_ok());
    }
}
