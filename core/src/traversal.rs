use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::graph::{CsrGraph, NodeId, NodeIndex};

/// Edges of a depth-bounded BFS, in discovery order, in original id space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalResult {
    pub edges: Vec<(NodeId, NodeId)>,
    /// Distinct nodes reached, start included.
    pub nodes_visited: usize,
    /// The walk stopped early because the edge cap was reached.
    pub truncated: bool,
}

impl TraversalResult {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// `[src, dst, src, dst, ...]`, for renderers that consume pairs positionally.
    pub fn flat(&self) -> Vec<NodeId> {
        self.edges.iter().flat_map(|&(u, v)| [u, v]).collect()
    }
}

/// A node found during BFS neighborhood traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NeighborResult {
    pub node_id: NodeId,
    pub distance: u32,
}

/// Nodes within `max_depth` hops of a start node, start excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Neighborhood {
    pub neighbors: Vec<NeighborResult>,
    pub nodes_visited: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Queued,
    Expanded,
}

fn resolve(graph: &CsrGraph, start: NodeId) -> Result<NodeIndex> {
    graph.index_of(start).ok_or(EngineError::InvalidNode(start))
}

/// Depth-bounded BFS returning the edges it walks.
///
/// Nodes are expanded in level order, each at most once, and only while
/// their level is below `max_depth`. Expanding `u` emits `(u, v)` for every
/// neighbor `v` that has not been expanded yet, so an edge between two
/// frontier nodes is reported once, from whichever side is expanded first.
/// Neighbors are walked in stored order, which makes the output a pure
/// function of the input file.
///
/// Visited state lives in a hash map keyed by dense index, so cost is bounded
/// by the `max_depth` ball around `start` rather than by the graph size.
pub fn bfs_subgraph(graph: &CsrGraph, start: NodeId, max_depth: u32) -> Result<TraversalResult> {
    bfs_subgraph_capped(graph, start, max_depth, 0)
}

/// [`bfs_subgraph`] that stops once `max_edges` edges have been emitted.
///
/// The result is then exactly the first `max_edges` edges of the uncapped
/// walk, with `truncated` set. `max_edges == 0` means no cap.
pub fn bfs_subgraph_capped(
    graph: &CsrGraph,
    start: NodeId,
    max_depth: u32,
    max_edges: usize,
) -> Result<TraversalResult> {
    let start_idx = resolve(graph, start)?;
    let cap = if max_edges == 0 { usize::MAX } else { max_edges };

    let mut marks: FxHashMap<NodeIndex, Mark> = FxHashMap::default();
    let mut queue: VecDeque<(NodeIndex, u32)> = VecDeque::new();
    let mut edges = Vec::new();
    let mut truncated = false;

    marks.insert(start_idx, Mark::Queued);
    queue.push_back((start_idx, 0));

    'walk: while let Some((current, depth)) = queue.pop_front() {
        marks.insert(current, Mark::Expanded);
        if depth >= max_depth {
            continue;
        }

        let from = graph.node_id(current);
        for &next in graph.neighbors(current) {
            if marks.get(&next) == Some(&Mark::Expanded) {
                continue;
            }
            if edges.len() == cap {
                truncated = true;
                break 'walk;
            }
            if marks.insert(next, Mark::Queued).is_none() {
                queue.push_back((next, depth + 1));
            }
            edges.push((from, graph.node_id(next)));
        }
    }

    Ok(TraversalResult {
        edges,
        nodes_visited: marks.len(),
        truncated,
    })
}

/// BFS neighborhood: find all nodes reachable from `start` within `max_depth` hops.
///
/// Each node is reported once, at its minimum distance, in discovery order.
pub fn bfs_neighborhood(graph: &CsrGraph, start: NodeId, max_depth: u32) -> Result<Neighborhood> {
    let start_idx = resolve(graph, start)?;

    let mut visited: FxHashMap<NodeIndex, u32> = FxHashMap::default();
    let mut queue: VecDeque<(NodeIndex, u32)> = VecDeque::new();
    let mut neighbors = Vec::new();

    visited.insert(start_idx, 0);
    queue.push_back((start_idx, 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for &next in graph.neighbors(current) {
            if !visited.contains_key(&next) {
                visited.insert(next, depth + 1);
                queue.push_back((next, depth + 1));
                neighbors.push(NeighborResult {
                    node_id: graph.node_id(next),
                    distance: depth + 1,
                });
            }
        }
    }

    Ok(Neighborhood {
        neighbors,
        nodes_visited: visited.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square() -> CsrGraph {
        CsrGraph::build(vec![(1, 2), (2, 3), (3, 4), (1, 4)]).unwrap()
    }

    fn make_chain(n: u64) -> CsrGraph {
        CsrGraph::build((0..n - 1).map(|i| (i, i + 1))).unwrap()
    }

    fn make_star(center: u64, leaves: u64) -> CsrGraph {
        CsrGraph::build((1..=leaves).map(|i| (center, center + i))).unwrap()
    }

    fn make_cycle(n: u64) -> CsrGraph {
        CsrGraph::build((0..n).map(|i| (i, (i + 1) % n))).unwrap()
    }

    // --- Subgraph tests ---

    #[test]
    fn test_square_depth_one() {
        let g = make_square();
        let r = bfs_subgraph(&g, 1, 1).unwrap();
        assert_eq!(r.edges, vec![(1, 2), (1, 4)]);
        assert_eq!(r.nodes_visited, 3);
    }

    #[test]
    fn test_square_depth_two() {
        let g = make_square();
        let r = bfs_subgraph(&g, 1, 2).unwrap();
        assert_eq!(r.edges, vec![(1, 2), (1, 4), (2, 3), (4, 3)]);
        assert_eq!(r.flat(), vec![1, 2, 1, 4, 2, 3, 4, 3]);
    }

    #[test]
    fn test_square_depth_beyond_diameter_is_stable() {
        let g = make_square();
        assert_eq!(bfs_subgraph(&g, 1, 2).unwrap(), bfs_subgraph(&g, 1, 50).unwrap());
    }

    #[test]
    fn test_depth_zero_is_empty() {
        let g = make_square();
        let r = bfs_subgraph(&g, 3, 0).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.nodes_visited, 1);
    }

    #[test]
    fn test_unknown_start() {
        let g = make_square();
        assert!(matches!(bfs_subgraph(&g, 99, 1), Err(EngineError::InvalidNode(99))));
    }

    #[test]
    fn test_chain_depth_limited() {
        let g = make_chain(10);
        let r = bfs_subgraph(&g, 0, 3).unwrap();
        assert_eq!(r.edges, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_chain_from_middle() {
        let g = make_chain(5);
        let r = bfs_subgraph(&g, 2, 1).unwrap();
        assert_eq!(r.edges, vec![(2, 1), (2, 3)]);
    }

    #[test]
    fn test_triangle_edge_between_frontier_nodes_once() {
        let g = CsrGraph::build(vec![(0, 1), (0, 2), (1, 2)]).unwrap();
        let r = bfs_subgraph(&g, 0, 2).unwrap();
        assert_eq!(r.edges, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_edges_among_last_level_not_reported() {
        let g = CsrGraph::build(vec![(0, 1), (0, 2), (1, 2)]).unwrap();
        let r = bfs_subgraph(&g, 0, 1).unwrap();
        assert_eq!(r.edges, vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn test_cycle_terminates() {
        let g = make_cycle(6);
        let r = bfs_subgraph(&g, 0, 100).unwrap();
        assert_eq!(r.edges.len(), 6);
        assert_eq!(r.nodes_visited, 6);
    }

    #[test]
    fn test_star_from_leaf() {
        let g = make_star(0, 20);
        let r = bfs_subgraph(&g, 5, 2).unwrap();
        assert_eq!(r.edges.len(), 20);
        assert_eq!(r.edges[0], (5, 0));
    }

    #[test]
    fn test_cap_truncates_hub_expansion() {
        let g = make_star(0, 100_000);
        let r = bfs_subgraph_capped(&g, 0, 1, 2000).unwrap();
        assert_eq!(r.edges.len(), 2000);
        assert!(r.truncated);
        assert_eq!(r.edges[0], (0, 1));
        assert_eq!(r.edges[1999], (0, 2000));
        assert_eq!(r.nodes_visited, 2001);
    }

    #[test]
    fn test_zero_cap_is_unlimited() {
        let g = make_star(0, 100_000);
        let r = bfs_subgraph_capped(&g, 0, 1, 0).unwrap();
        assert_eq!(r.edges.len(), 100_000);
        assert!(!r.truncated);
        assert_eq!(r, bfs_subgraph(&g, 0, 1).unwrap());
    }

    #[test]
    fn test_cap_is_prefix_of_full_walk() {
        let g = make_square();
        let full = bfs_subgraph(&g, 1, 2).unwrap();
        let capped = bfs_subgraph_capped(&g, 1, 2, 3).unwrap();
        assert!(capped.truncated);
        assert_eq!(capped.edges, full.edges[..3].to_vec());
    }

    #[test]
    fn test_cap_exactly_met_is_not_truncated() {
        let g = make_square();
        let r = bfs_subgraph_capped(&g, 1, 2, 4).unwrap();
        assert_eq!(r.edges.len(), 4);
        assert!(!r.truncated);

        let loose = bfs_subgraph_capped(&g, 1, 2, 10).unwrap();
        assert!(!loose.truncated);
        assert_eq!(loose, bfs_subgraph(&g, 1, 2).unwrap());
    }

    // --- Neighborhood tests ---

    #[test]
    fn test_neighborhood_chain() {
        let g = make_chain(6);
        let n = bfs_neighborhood(&g, 0, 10).unwrap();
        assert_eq!(n.neighbors.len(), 5);
        let node5 = n.neighbors.iter().find(|r| r.node_id == 5).unwrap();
        assert_eq!(node5.distance, 5);
    }

    #[test]
    fn test_neighborhood_star() {
        let g = make_star(0, 100);
        let n = bfs_neighborhood(&g, 0, 1).unwrap();
        assert_eq!(n.neighbors.len(), 100);
        assert!(n.neighbors.iter().all(|r| r.distance == 1));
    }

    #[test]
    fn test_neighborhood_depth_zero() {
        let g = make_chain(5);
        let n = bfs_neighborhood(&g, 0, 0).unwrap();
        assert!(n.neighbors.is_empty());
        assert_eq!(n.nodes_visited, 1);
    }

    #[test]
    fn test_neighborhood_square_order() {
        let g = make_square();
        let n = bfs_neighborhood(&g, 1, 2).unwrap();
        let order: Vec<(NodeId, u32)> = n.neighbors.iter().map(|r| (r.node_id, r.distance)).collect();
        assert_eq!(order, vec![(2, 1), (4, 1), (3, 2)]);
    }
}
