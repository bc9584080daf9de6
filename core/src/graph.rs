use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Node identifier as written in the source file.
pub type NodeId = u64;

/// Dense `[0, N)` index used for array addressing.
pub type NodeIndex = u32;

/// Immutable undirected graph in compressed sparse row layout.
///
/// `offsets[i]..offsets[i + 1]` delimits node `i`'s slice of `neighbors`.
/// Every undirected edge is stored once in each endpoint's slice, self-loops
/// are dropped and duplicate pairs coalesced during [`CsrGraph::build`].
/// Nothing writes to the arrays after construction.
#[derive(Debug, Clone)]
pub struct CsrGraph {
    offsets: Vec<usize>,
    neighbors: Vec<NodeIndex>,
    index_to_node: Vec<NodeId>,
    node_to_index: FxHashMap<NodeId, NodeIndex>,
    edge_count: usize,
}

/// Most distinct ids a graph can hold; keeps `node_count()` itself
/// representable as a `NodeIndex`.
pub(crate) const MAX_NODES: usize = NodeIndex::MAX as usize;

/// Assigns dense indices in order of first appearance.
struct IdRemap {
    index_to_node: Vec<NodeId>,
    node_to_index: FxHashMap<NodeId, NodeIndex>,
    limit: usize,
}

impl IdRemap {
    fn new(limit: usize) -> Self {
        Self {
            index_to_node: Vec::new(),
            node_to_index: FxHashMap::default(),
            limit: limit.min(MAX_NODES),
        }
    }

    fn intern(&mut self, id: NodeId) -> Result<NodeIndex> {
        if let Some(&idx) = self.node_to_index.get(&id) {
            return Ok(idx);
        }
        if self.index_to_node.len() >= self.limit {
            return Err(EngineError::CapacityExceeded);
        }
        let idx = self.index_to_node.len() as NodeIndex;
        self.index_to_node.push(id);
        self.node_to_index.insert(id, idx);
        Ok(idx)
    }
}

#[inline]
fn edge_key(a: NodeIndex, b: NodeIndex) -> u64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    ((lo as u64) << 32) | hi as u64
}

impl CsrGraph {
    /// Build from raw `(u, v)` pairs in two linear passes.
    ///
    /// Pass 1 remaps ids, drops self-loops and duplicates, and counts degrees.
    /// Pass 2 scatters each unique edge into both endpoints' slots through a
    /// per-node write cursor, so `neighbors` is allocated exactly once.
    pub fn build<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        Self::try_build(pairs.into_iter().map(Ok))
    }

    /// Same as [`CsrGraph::build`] over a fallible stream; the first `Err`
    /// aborts the build and is returned as-is.
    pub fn try_build<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<(NodeId, NodeId)>>,
    {
        let mut remap = IdRemap::new(MAX_NODES);
        let mut seen: FxHashSet<u64> = FxHashSet::default();
        let mut unique: Vec<(NodeIndex, NodeIndex)> = Vec::new();
        let mut degree: Vec<usize> = Vec::new();
        let mut self_loops = 0usize;
        let mut duplicates = 0usize;

        for pair in pairs {
            let (u, v) = pair?;
            let a = remap.intern(u)?;
            let b = remap.intern(v)?;
            if degree.len() < remap.index_to_node.len() {
                degree.resize(remap.index_to_node.len(), 0);
            }
            if a == b {
                self_loops += 1;
                continue;
            }
            if !seen.insert(edge_key(a, b)) {
                duplicates += 1;
                continue;
            }
            degree[a as usize] += 1;
            degree[b as usize] += 1;
            unique.push((a, b));
        }
        drop(seen);

        if unique.is_empty() {
            return Err(EngineError::EmptyGraph);
        }

        let node_count = remap.index_to_node.len();
        debug!(
            nodes = node_count,
            edges = unique.len(),
            self_loops,
            duplicates,
            "edge scan complete"
        );

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0usize);
        let mut running = 0usize;
        for d in &degree {
            running += d;
            offsets.push(running);
        }
        drop(degree);

        let mut neighbors: Vec<NodeIndex> = vec![0; running];
        let mut cursor = offsets[..node_count].to_vec();
        for &(a, b) in &unique {
            neighbors[cursor[a as usize]] = b;
            cursor[a as usize] += 1;
            neighbors[cursor[b as usize]] = a;
            cursor[b as usize] += 1;
        }

        let mut graph = CsrGraph {
            offsets,
            neighbors,
            index_to_node: remap.index_to_node,
            node_to_index: remap.node_to_index,
            edge_count: unique.len(),
        };
        graph.index_to_node.shrink_to_fit();
        debug!(bytes = graph.memory_usage(), "csr layout built");
        Ok(graph)
    }

    pub fn node_count(&self) -> usize {
        self.index_to_node.len()
    }

    /// Undirected edges, each counted once.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Neighbor slice of a dense index, in file order.
    #[inline]
    pub fn neighbors(&self, idx: NodeIndex) -> &[NodeIndex] {
        let i = idx as usize;
        &self.neighbors[self.offsets[i]..self.offsets[i + 1]]
    }

    #[inline]
    pub fn degree(&self, idx: NodeIndex) -> usize {
        let i = idx as usize;
        self.offsets[i + 1] - self.offsets[i]
    }

    /// Dense index for an original id, if it appeared in the input.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_to_index.get(&id).copied()
    }

    /// Original id of a dense index.
    #[inline]
    pub fn node_id(&self, idx: NodeIndex) -> NodeId {
        self.index_to_node[idx as usize]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node_to_index.contains_key(&id)
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The flat adjacency array, `2 * edge_count` entries long.
    pub fn adjacency(&self) -> &[NodeIndex] {
        &self.neighbors
    }

    /// Original ids in dense-index order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.index_to_node
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let offsets = self.offsets.capacity() * size_of::<usize>();
        let neighbors = self.neighbors.capacity() * size_of::<NodeIndex>();
        let inverse = self.index_to_node.capacity() * size_of::<NodeId>();
        // hashbrown: one control byte per bucket plus the entry itself
        let forward =
            self.node_to_index.capacity() * (size_of::<(NodeId, NodeIndex)>() + 1);

        offsets + neighbors + inverse + forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(g: &CsrGraph, id: NodeId) -> Vec<NodeId> {
        let idx = g.index_of(id).unwrap();
        g.neighbors(idx).iter().map(|&n| g.node_id(n)).collect()
    }

    #[test]
    fn test_square() {
        let g = CsrGraph::build(vec![(1, 2), (2, 3), (3, 4), (1, 4)]).unwrap();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.offsets(), &[0, 2, 4, 6, 8]);
        assert_eq!(ids(&g, 1), vec![2, 4]);
        assert_eq!(ids(&g, 2), vec![1, 3]);
        assert_eq!(ids(&g, 3), vec![2, 4]);
        assert_eq!(ids(&g, 4), vec![3, 1]);
    }

    #[test]
    fn test_dense_indices_follow_first_appearance() {
        let g = CsrGraph::build(vec![(900, 5), (5, 42), (42, 900)]).unwrap();
        assert_eq!(g.node_ids(), &[900, 5, 42]);
        assert_eq!(g.index_of(900), Some(0));
        assert_eq!(g.index_of(42), Some(2));
        assert_eq!(g.index_of(7), None);
    }

    #[test]
    fn test_self_loops_dropped() {
        let g = CsrGraph::build(vec![(1, 1), (1, 2), (2, 2)]).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(ids(&g, 1), vec![2]);
        assert_eq!(ids(&g, 2), vec![1]);
    }

    #[test]
    fn test_self_loop_only_node_is_kept_with_zero_degree() {
        let g = CsrGraph::build(vec![(7, 7), (1, 2)]).unwrap();
        assert_eq!(g.node_count(), 3);
        assert!(g.contains(7));
        assert_eq!(g.degree(g.index_of(7).unwrap()), 0);
    }

    #[test]
    fn test_duplicates_coalesced_both_orientations() {
        let g = CsrGraph::build(vec![(1, 2), (2, 1), (1, 2), (1, 2)]).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.adjacency().len(), 2);
    }

    #[test]
    fn test_only_self_loops_is_empty() {
        let err = CsrGraph::build(vec![(3, 3), (4, 4)]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyGraph));
    }

    #[test]
    fn test_no_pairs_is_empty() {
        let err = CsrGraph::build(Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyGraph));
    }

    #[test]
    fn test_stream_error_aborts_build() {
        let pairs = vec![Ok((1, 2)), Err(EngineError::Cancelled), Ok((2, 3))];
        let err = CsrGraph::try_build(pairs).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn test_star_degrees() {
        let g = CsrGraph::build((1..=50).map(|i| (0, i))).unwrap();
        assert_eq!(g.degree(g.index_of(0).unwrap()), 50);
        assert_eq!(g.degree(g.index_of(17).unwrap()), 1);
        assert_eq!(g.adjacency().len(), 2 * g.edge_count());
    }

    #[test]
    fn test_remap_refuses_ids_past_limit() {
        let mut remap = IdRemap::new(2);
        assert_eq!(remap.intern(10).unwrap(), 0);
        assert_eq!(remap.intern(20).unwrap(), 1);
        assert_eq!(remap.intern(10).unwrap(), 0);
        assert!(matches!(remap.intern(30), Err(EngineError::CapacityExceeded)));
    }

    #[test]
    fn test_node_limit_fits_index_type() {
        // node_count() must survive a cast to NodeIndex for index loops
        assert_eq!(MAX_NODES as NodeIndex as usize, MAX_NODES);
        assert_eq!(IdRemap::new(usize::MAX).limit, MAX_NODES);
    }

    #[test]
    fn test_memory_usage_nonzero() {
        let g = CsrGraph::build((1..=100).map(|i| (0, i))).unwrap();
        assert!(g.memory_usage() > 200 * std::mem::size_of::<NodeIndex>());
    }
}
