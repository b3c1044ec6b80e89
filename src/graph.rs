/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Incremental similarity graph over shape encodings.
//!
//! Nodes live in an arena indexed by [`NodeHandle`]; edges and clusters store
//! handles, never references. New nodes are appended, so handle order is
//! insertion order and iteration is deterministic regardless of hash-map
//! layout.
//!
//! Removal empties a slot. Once empty slots outnumber live nodes the arena
//! is compacted: live nodes slide down in order and edge keys are remapped.
//! Compaction keeps handle order but changes handle values, so a
//! [`NodeHandle`] is only valid until the next [`SimilarityGraph::remove_node`].
//!
//! # Edges
//!
//! Upserting a node scores it against every other registered node. Each pair
//! whose similarity is strictly above `edge_threshold` gets one edge, keyed by
//! the canonical `(min, max)` handle pair. Re-scoring an existing pair
//! updates its strength in place and keeps its creation order; a pair that
//! falls to or below the threshold loses its edge.
//!
//! Cost is O(n) similarity evaluations per upsert, O(n²) over n upserts.
//!
//! # Invariants
//!
//! - At most one edge per unordered node pair; no self-edges.
//! - Every edge endpoint is a live node.
//! - Edge strength is in `(edge_threshold, 1.0]`.

use alloc::format;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::cluster::{compute_clusters, Cluster};
use crate::config::GraphConfig;
use crate::error::{GestaltError, GestaltResult};
use crate::signature::ShapeEncoding;

/// Caller-assigned opaque node identifier.
///
/// Blanket-implemented for any cloneable, hashable, debuggable type.
pub trait NodeId: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> NodeId for T {}

/// Arena index of a node. Ordered by insertion; reassigned by compaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    /// Raw arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A registered `(id, encoding, activity)` triple.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode<Id> {
    id: Id,
    encoding: ShapeEncoding,
    activity: f64,
    order: u64,
}

impl<Id> GraphNode<Id> {
    /// Caller-supplied identifier.
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Most recent encoding for this node.
    pub fn encoding(&self) -> &ShapeEncoding {
        &self.encoding
    }

    /// Caller-maintained activity level.
    pub fn activity(&self) -> f64 {
        self.activity
    }

    /// Insertion order (first registration; unchanged by re-encoding).
    pub fn order(&self) -> u64 {
        self.order
    }
}

/// Weighted similarity edge between two nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Edge {
    pub(crate) a: NodeHandle,
    pub(crate) b: NodeHandle,
    pub(crate) strength: f64,
    pub(crate) order: u64,
}

fn canonical(x: NodeHandle, y: NodeHandle) -> (NodeHandle, NodeHandle) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

// ─── SimilarityGraph ─────────────────────────────────────────────────────────

/// Node arena plus canonical edge map.
#[derive(Clone, Debug)]
pub struct SimilarityGraph<Id: NodeId> {
    nodes: Vec<Option<GraphNode<Id>>>,
    index: HashMap<Id, NodeHandle>,
    edges: HashMap<(NodeHandle, NodeHandle), Edge>,
    config: GraphConfig,
    next_node_order: u64,
    next_edge_order: u64,
}

impl<Id: NodeId> SimilarityGraph<Id> {
    /// Empty graph with default thresholds (0.3 edge, 0.7 cluster).
    pub fn new() -> Self {
        Self::from_config(GraphConfig::default())
    }

    /// Empty graph with a validated configuration.
    pub fn try_new(config: GraphConfig) -> GestaltResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: GraphConfig) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: HashMap::new(),
            config,
            next_node_order: 0,
            next_edge_order: 0,
        }
    }

    /// Active thresholds and metric.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ── Mutation ───────────────────────────────────────────────────────────

    /// Register a node whose id must not already exist.
    pub fn insert_node(
        &mut self,
        id: Id,
        encoding: ShapeEncoding,
        activity: f64,
    ) -> GestaltResult<NodeHandle> {
        if self.index.contains_key(&id) {
            return Err(GestaltError::DuplicateNode(format!("{id:?}")));
        }
        Ok(self.upsert_node(id, encoding, activity))
    }

    /// Insert a node, or replace the encoding and activity of an existing one.
    ///
    /// Either way the node's edges are recomputed against every other node.
    pub fn upsert_node(&mut self, id: Id, encoding: ShapeEncoding, activity: f64) -> NodeHandle {
        let handle = match self.index.get(&id) {
            Some(&h) => {
                if let Some(node) = self.nodes[h.0].as_mut() {
                    node.encoding = encoding;
                    node.activity = activity;
                }
                h
            }
            None => {
                let h = NodeHandle(self.nodes.len());
                self.nodes.push(Some(GraphNode {
                    id: id.clone(),
                    encoding,
                    activity,
                    order: self.next_node_order,
                }));
                self.next_node_order += 1;
                self.index.insert(id, h);
                h
            }
        };
        self.relink(handle);
        handle
    }

    /// Unregister a node and drop its edges. Returns the removed node.
    pub fn remove_node(&mut self, id: &Id) -> Option<GraphNode<Id>> {
        let handle = self.index.remove(id)?;
        let node = self.nodes[handle.0].take();
        let before = self.edges.len();
        self.edges.retain(|_, e| e.a != handle && e.b != handle);
        debug!(
            node = ?id,
            dropped_edges = before - self.edges.len(),
            "node removed"
        );
        if self.nodes.len() - self.index.len() > self.index.len() {
            self.compact();
        }
        node
    }

    /// Drop empty slots, keeping live nodes in order, and remap edge keys.
    fn compact(&mut self) {
        let before = self.nodes.len();
        let mut remap: Vec<Option<NodeHandle>> = Vec::with_capacity(before);
        let mut live = Vec::with_capacity(self.index.len());
        for slot in self.nodes.drain(..) {
            match slot {
                Some(node) => {
                    remap.push(Some(NodeHandle(live.len())));
                    live.push(Some(node));
                }
                None => remap.push(None),
            }
        }
        self.nodes = live;

        for h in self.index.values_mut() {
            if let Some(new) = remap[h.0] {
                *h = new;
            }
        }
        let edges: HashMap<(NodeHandle, NodeHandle), Edge> = self
            .edges
            .drain()
            .filter_map(|(_, mut e)| {
                e.a = remap[e.a.0]?;
                e.b = remap[e.b.0]?;
                Some(((e.a, e.b), e))
            })
            .collect();
        self.edges = edges;
        debug!(before, after = self.nodes.len(), "node arena compacted");
    }

    /// Replace a node's activity without touching edges.
    pub fn set_activity(&mut self, id: &Id, activity: f64) -> GestaltResult<()> {
        let handle = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| GestaltError::NodeNotFound(format!("{id:?}")))?;
        match self.nodes[handle.0].as_mut() {
            Some(node) => {
                node.activity = activity;
                Ok(())
            }
            None => Err(GestaltError::CorruptState(format!(
                "index points {id:?} at empty slot {}",
                handle.0
            ))),
        }
    }

    /// Recompute every edge touching `handle`.
    fn relink(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes[handle.0].as_ref() else {
            return;
        };
        let metric = self.config.metric;
        let threshold = self.config.edge_threshold;
        let (mut created, mut updated, mut dropped) = (0usize, 0usize, 0usize);

        for (idx, slot) in self.nodes.iter().enumerate() {
            let Some(other) = slot else { continue };
            if idx == handle.0 {
                continue;
            }
            let key = canonical(handle, NodeHandle(idx));
            let strength = metric.score(&node.encoding, &other.encoding);

            if strength > threshold {
                match self.edges.entry(key) {
                    Entry::Occupied(mut e) => {
                        e.get_mut().strength = strength;
                        updated += 1;
                    }
                    Entry::Vacant(e) => {
                        e.insert(Edge {
                            a: key.0,
                            b: key.1,
                            strength,
                            order: self.next_edge_order,
                        });
                        self.next_edge_order += 1;
                        created += 1;
                    }
                }
                trace!(a = key.0.index(), b = key.1.index(), strength, "edge set");
            } else if self.edges.remove(&key).is_some() {
                dropped += 1;
                trace!(a = key.0.index(), b = key.1.index(), strength, "edge dropped");
            }
        }

        debug!(
            node = ?node.id,
            signature = node.encoding.signature(),
            created,
            updated,
            dropped,
            "node linked"
        );
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// `true` when no node is registered.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// `true` if `id` is registered.
    pub fn contains(&self, id: &Id) -> bool {
        self.index.contains_key(id)
    }

    /// Handle currently assigned to `id`.
    pub fn handle(&self, id: &Id) -> Option<NodeHandle> {
        self.index.get(id).copied()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &Id) -> Option<&GraphNode<Id>> {
        self.index.get(id).and_then(|h| self.node_at(*h))
    }

    /// Look up a node by handle. `None` once the node is removed.
    pub fn node_at(&self, handle: NodeHandle) -> Option<&GraphNode<Id>> {
        self.nodes.get(handle.0).and_then(Option::as_ref)
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode<Id>> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Strength of the edge between two ids, if one exists.
    pub fn edge_strength(&self, a: &Id, b: &Id) -> Option<f64> {
        let key = canonical(self.handle(a)?, self.handle(b)?);
        self.edges.get(&key).map(|e| e.strength)
    }

    /// All edges as `(id, id, strength)` in creation order.
    pub fn edges(&self) -> Vec<(&Id, &Id, f64)> {
        self.edges_in_order()
            .into_iter()
            .filter_map(|e| {
                let a = self.node_at(e.a)?;
                let b = self.node_at(e.b)?;
                Some((&a.id, &b.id, e.strength))
            })
            .collect()
    }

    /// Neighbours of `id` with edge strengths, in neighbour insertion order.
    pub fn neighbors(&self, id: &Id) -> Vec<(&Id, f64)> {
        let Some(h) = self.handle(id) else {
            return Vec::new();
        };
        let mut out: Vec<(NodeHandle, f64)> = self
            .edges
            .values()
            .filter_map(|e| {
                if e.a == h {
                    Some((e.b, e.strength))
                } else if e.b == h {
                    Some((e.a, e.strength))
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable_by_key(|&(n, _)| n);
        out.into_iter()
            .filter_map(|(n, s)| self.node_at(n).map(|node| (&node.id, s)))
            .collect()
    }

    /// Connected components over edges above `cluster_threshold`.
    ///
    /// See [`crate::cluster`]. Recomputed on every call.
    pub fn compute_clusters(&self) -> Vec<Cluster<Id>> {
        compute_clusters(self)
    }

    /// Verify that the id index, arena and edge map agree.
    pub fn check_consistency(&self) -> GestaltResult<()> {
        for (id, h) in self.index.iter() {
            match self.node_at(*h) {
                Some(node) if &node.id == id => {}
                _ => {
                    return Err(GestaltError::CorruptState(format!(
                        "index entry {id:?} -> slot {} does not hold that node",
                        h.0
                    )))
                }
            }
        }
        let live = self.nodes.iter().filter(|n| n.is_some()).count();
        if live != self.index.len() {
            return Err(GestaltError::CorruptState(format!(
                "{live} live slots but {} indexed ids",
                self.index.len()
            )));
        }
        for (key, e) in self.edges.iter() {
            if key.0 >= key.1 || (e.a, e.b) != *key {
                return Err(GestaltError::CorruptState(format!(
                    "edge key ({}, {}) is not canonical",
                    key.0.index(),
                    key.1.index()
                )));
            }
            if self.node_at(e.a).is_none() || self.node_at(e.b).is_none() {
                return Err(GestaltError::CorruptState(format!(
                    "edge ({}, {}) touches a removed node",
                    e.a.0, e.b.0
                )));
            }
        }
        Ok(())
    }

    // ── Crate-internal views for clustering ───────────────────────────────

    pub(crate) fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn live_nodes(&self) -> impl Iterator<Item = (NodeHandle, &GraphNode<Id>)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeHandle(i), n)))
    }

    pub(crate) fn edges_in_order(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.values().collect();
        edges.sort_unstable_by_key(|e| e.order);
        edges
    }
}

impl<Id: NodeId> Default for SimilarityGraph<Id> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
