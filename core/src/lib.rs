//! massgraph-core: compact in-memory engine for massive undirected networks.
//!
//! Streams a SNAP-style edge list into an immutable CSR adjacency store and
//! answers two kinds of read-only query on it: the highest-degree node and
//! depth-bounded BFS subgraphs. The [`Engine`] façade owns the loaded graph
//! and swaps it atomically on reload.

mod config;
mod degree;
mod engine;
mod error;
mod graph;
mod parser;
mod traversal;

pub use config::EngineConfig;
pub use degree::{critical_node, degree_of, max_degree, top_degree, DegreeEntry};
pub use engine::{Engine, EngineStatus, LoadHandle, LoadState, LoadSummary, LoadedGraph};
pub use error::{EngineError, ErrorKind, Result};
pub use graph::{CsrGraph, NodeId, NodeIndex};
pub use parser::{CancelToken, EdgeListParser, ParseStats};
pub use traversal::{
    bfs_neighborhood, bfs_subgraph, bfs_subgraph_capped, NeighborResult, Neighborhood, TraversalResult,
};
