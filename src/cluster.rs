//! Connected-component clustering over strong edges.
//!
//! Only edges with strength strictly above `cluster_threshold` count. Each
//! node belongs to exactly one [`Cluster`]; isolated nodes are singletons.
//!
//! Traversal is an iterative depth-first search over sorted adjacency lists,
//! so recursion depth never grows with cluster size and the output is a pure
//! function of the graph: seeds are taken in node insertion order, members
//! are reported in insertion order, and clusters are ordered by their first
//! member.
//!
//! ```text
//! center     node with the largest summed incident strength (all edges)
//! coherence  mean pairwise similarity inside the cluster (1.0 for singletons)
//! dominant   most frequent category; ties go to the earliest-seen category
//! ```

use alloc::vec;
use alloc::vec::Vec;

use tracing::debug;

use crate::graph::{GraphNode, NodeHandle, NodeId, SimilarityGraph};
use crate::signature::Category;

/// One connected component of the strong-edge graph.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster<Id> {
    /// Member ids in insertion order.
    pub members: Vec<Id>,
    /// Member with the highest total incident edge strength.
    pub center: Id,
    /// Mean pairwise similarity between members, in [0, 1].
    pub coherence: f64,
    /// Most frequent category among members.
    pub dominant_category: Category,
}

impl<Id> Cluster<Id> {
    /// Number of members.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// `true` for a cluster of one node.
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Partition every live node of `graph` into clusters.
pub fn compute_clusters<Id: NodeId>(graph: &SimilarityGraph<Id>) -> Vec<Cluster<Id>> {
    let slots = graph.arena_len();
    let threshold = graph.config().cluster_threshold;

    let mut strong: Vec<Vec<usize>> = vec![Vec::new(); slots];
    let mut incident: Vec<f64> = vec![0.0; slots];
    for edge in graph.edges_in_order() {
        let (a, b) = (edge.a.index(), edge.b.index());
        incident[a] += edge.strength;
        incident[b] += edge.strength;
        if edge.strength > threshold {
            strong[a].push(b);
            strong[b].push(a);
        }
    }
    for list in strong.iter_mut() {
        list.sort_unstable();
    }

    let mut visited = vec![false; slots];
    let mut stack: Vec<usize> = Vec::new();
    let mut clusters = Vec::new();

    for (seed, _) in graph.live_nodes() {
        let seed = seed.index();
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        stack.push(seed);
        let mut members = vec![seed];
        while let Some(current) = stack.pop() {
            for &next in strong[current].iter() {
                if !visited[next] {
                    visited[next] = true;
                    members.push(next);
                    stack.push(next);
                }
            }
        }
        members.sort_unstable();
        if let Some(cluster) = build_cluster(graph, &members, &incident) {
            clusters.push(cluster);
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        clusters = clusters.len(),
        singletons = clusters.iter().filter(|c| c.is_singleton()).count(),
        "clusters computed"
    );
    clusters
}

fn build_cluster<Id: NodeId>(
    graph: &SimilarityGraph<Id>,
    members: &[usize],
    incident: &[f64],
) -> Option<Cluster<Id>> {
    let nodes: Vec<(usize, &GraphNode<Id>)> = members
        .iter()
        .filter_map(|&m| graph.node_at(NodeHandle(m)).map(|n| (m, n)))
        .collect();
    let &(first_slot, first) = nodes.first()?;

    let mut center = first;
    let mut best = incident[first_slot];
    for &(slot, node) in &nodes[1..] {
        if incident[slot] > best {
            best = incident[slot];
            center = node;
        }
    }

    let coherence = if nodes.len() == 1 {
        1.0
    } else {
        let metric = graph.config().metric;
        let mut total = 0.0;
        let mut pairs = 0usize;
        for (i, (_, a)) in nodes.iter().enumerate() {
            for (_, b) in &nodes[i + 1..] {
                total += metric.score(a.encoding(), b.encoding());
                pairs += 1;
            }
        }
        total / pairs as f64
    };

    let mut tally: Vec<(Category, usize)> = Vec::new();
    for (_, node) in &nodes {
        let category = node.encoding().category();
        match tally.iter_mut().find(|(c, _)| *c == category) {
            Some((_, count)) => *count += 1,
            None => tally.push((category, 1)),
        }
    }
    let mut dominant = tally[0];
    for &entry in &tally[1..] {
        if entry.1 > dominant.1 {
            dominant = entry;
        }
    }

    Some(Cluster {
        members: nodes.iter().map(|(_, n)| n.id().clone()).collect(),
        center: center.id().clone(),
        coherence,
        dominant_category: dominant.0,
    })
}
