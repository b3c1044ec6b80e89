/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Cloneable, lock-guarded handle to a [`GestaltEngine`].
//!
//! Requires the `std` feature. Every mutation (including factorization, which
//! writes the cache) takes the write lock. Clustering and field synthesis
//! snapshot the graph under the read lock and compute outside it, so long
//! cluster passes never block writers.

use std::sync::Arc;
use std::vec::Vec;

use parking_lot::RwLock;

use crate::cluster::{compute_clusters, Cluster};
use crate::engine::GestaltEngine;
use crate::error::GestaltResult;
use crate::factor::CacheStats;
use crate::gestalt::GestaltField;
use crate::graph::{GraphNode, NodeHandle, NodeId, SimilarityGraph};
use crate::signature::ShapeEncoding;

/// Thread-safe engine handle. Clones share one engine.
pub struct SharedEngine<Id: NodeId> {
    inner: Arc<RwLock<GestaltEngine<Id>>>,
}

impl<Id: NodeId> Clone for SharedEngine<Id> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Id: NodeId> SharedEngine<Id> {
    /// Wrap an engine.
    pub fn new(engine: GestaltEngine<Id>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Memoized factorization.
    pub fn factorize(&self, n: u64) -> Vec<u64> {
        self.inner.write().factorize(n)
    }

    /// Encode a shape on behalf of `id`.
    pub fn encode_shape(&self, shape: &[usize], id: &Id) -> Option<ShapeEncoding> {
        self.inner.write().encode_shape(shape, id)
    }

    /// Encode and upsert in one locked step.
    pub fn register_shape(&self, id: Id, shape: &[usize], activity: f64) -> Option<NodeHandle> {
        self.inner.write().register_shape(id, shape, activity)
    }

    /// Insert or re-encode a node.
    pub fn upsert_node(&self, id: Id, encoding: ShapeEncoding, activity: f64) -> NodeHandle {
        self.inner.write().upsert_node(id, encoding, activity)
    }

    /// Unregister a node.
    pub fn remove_node(&self, id: &Id) -> Option<GraphNode<Id>> {
        self.inner.write().remove_node(id)
    }

    /// Update a node's activity.
    pub fn set_activity(&self, id: &Id, activity: f64) -> GestaltResult<()> {
        self.inner.write().set_activity(id, activity)
    }

    /// Copy of the current graph.
    pub fn snapshot(&self) -> SimilarityGraph<Id> {
        self.inner.read().graph().clone()
    }

    /// Clusters of a graph snapshot.
    pub fn get_clusters(&self) -> Vec<Cluster<Id>> {
        compute_clusters(&self.snapshot())
    }

    /// Field over registered nodes named in `activities`.
    pub fn synthesize_field<A>(&self, activities: A) -> Option<GestaltField<Id>>
    where
        A: IntoIterator<Item = (Id, f64)>,
    {
        self.inner.read().synthesize_field(activities)
    }

    /// Factorization cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.read().cache_stats()
    }

    /// Empty the factorization cache.
    pub fn clear_cache(&self) {
        self.inner.write().clear_cache();
    }

    /// Run `f` with shared access to the engine.
    pub fn read<R>(&self, f: impl FnOnce(&GestaltEngine<Id>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access to the engine.
    pub fn write<R>(&self, f: impl FnOnce(&mut GestaltEngine<Id>) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl<Id: NodeId> Default for SharedEngine<Id> {
    fn default() -> Self {
        Self::new(GestaltEngine::new())
    }
}

impl<Id: NodeId> From<GestaltEngine<Id>> for SharedEngine<Id> {
    fn from(engine: GestaltEngine<Id>) -> Self {
        Self::new(engine)
    }
}
