use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::graph::{CsrGraph, NodeId, NodeIndex};

/// Degree information for a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DegreeEntry {
    pub node_id: NodeId,
    pub degree: usize,
}

/// The node with the highest degree.
///
/// Ties go to the smallest original node id, so the answer does not depend
/// on file order. Single O(N) scan over the offsets.
pub fn critical_node(graph: &CsrGraph) -> Result<NodeId> {
    let mut best: Option<DegreeEntry> = None;
    for idx in 0..graph.node_count() as NodeIndex {
        let entry = DegreeEntry {
            node_id: graph.node_id(idx),
            degree: graph.degree(idx),
        };
        best = match best {
            Some(b) if b.degree > entry.degree => Some(b),
            Some(b) if b.degree == entry.degree && b.node_id < entry.node_id => Some(b),
            _ => Some(entry),
        };
    }
    best.map(|b| b.node_id).ok_or(EngineError::EmptyGraph)
}

/// Largest degree in the graph, 0 for an empty graph.
pub fn max_degree(graph: &CsrGraph) -> usize {
    (0..graph.node_count() as NodeIndex)
        .map(|idx| graph.degree(idx))
        .max()
        .unwrap_or(0)
}

/// Degree of one node by original id.
pub fn degree_of(graph: &CsrGraph, id: NodeId) -> Result<usize> {
    graph
        .index_of(id)
        .map(|idx| graph.degree(idx))
        .ok_or(EngineError::InvalidNode(id))
}

/// Return nodes ranked by degree.
///
/// If `top_n` is 0, returns all nodes. Otherwise returns the top N by
/// degree (descending). Ties are broken by node ID (ascending).
pub fn top_degree(graph: &CsrGraph, top_n: usize) -> Vec<DegreeEntry> {
    let mut results: Vec<DegreeEntry> = (0..graph.node_count() as NodeIndex)
        .map(|idx| DegreeEntry {
            node_id: graph.node_id(idx),
            degree: graph.degree(idx),
        })
        .collect();

    let cmp = |a: &DegreeEntry, b: &DegreeEntry| {
        b.degree.cmp(&a.degree).then(a.node_id.cmp(&b.node_id))
    };

    if top_n > 0 && top_n < results.len() {
        results.select_nth_unstable_by(top_n - 1, cmp);
        results.truncate(top_n);
    }
    results.sort_unstable_by(cmp);
    results
}
