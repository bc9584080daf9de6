//! Engine façade: owns at most one loaded graph and answers queries on it.
//!
//! `load` builds the new graph completely before swapping it in, so a failed
//! load leaves the previous graph untouched and readers never observe a
//! half-built one. Queries take an `Arc` snapshot under a short read lock and
//! then run without holding any lock.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::degree::{self, DegreeEntry};
use crate::error::{EngineError, Result};
use crate::graph::{CsrGraph, NodeId};
use crate::parser::{CancelToken, EdgeListParser, ParseStats};
use crate::traversal::{self, Neighborhood, TraversalResult};

/// A built graph plus metadata about the load that produced it.
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: CsrGraph,
    pub source: PathBuf,
    pub parse_stats: ParseStats,
    pub load_time_ms: f64,
    pub loaded_at: Instant,
    /// Engine generation at install time, starting at 1.
    pub generation: u64,
}

/// Returned by a successful load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub source: PathBuf,
    pub node_count: usize,
    pub edge_count: usize,
    pub memory_bytes: usize,
    pub parse_stats: ParseStats,
    pub load_time_ms: f64,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    NotLoaded,
    Loaded,
}

/// Point-in-time description of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub status: LoadState,
    pub source: Option<PathBuf>,
    pub node_count: usize,
    pub edge_count: usize,
    pub max_degree: usize,
    pub memory_bytes: usize,
    pub load_time_ms: f64,
    /// Seconds since the current graph was installed.
    pub loaded_secs_ago: f64,
    pub generation: u64,
}

pub struct Engine {
    config: EngineConfig,
    current: RwLock<Option<Arc<LoadedGraph>>>,
    generation: AtomicU64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load an edge-list file, replacing the current graph on success.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadSummary> {
        let parser = EdgeListParser::open(path, &self.config)?;
        self.install(parser)
    }

    /// Like [`Engine::load`], but gives up with `Cancelled` once `token` fires.
    pub fn load_with_cancel(&self, path: impl AsRef<Path>, token: &CancelToken) -> Result<LoadSummary> {
        let parser = EdgeListParser::open(path, &self.config)?.with_cancel(token.clone());
        self.install(parser)
    }

    /// Load from any buffered reader. `source` only labels logs and errors.
    pub fn load_reader<R: BufRead>(&self, reader: R, source: impl Into<PathBuf>) -> Result<LoadSummary> {
        self.install(EdgeListParser::new(reader, source, &self.config))
    }

    /// Run [`Engine::load`] on a worker thread.
    ///
    /// The current graph keeps serving queries until the new one is swapped
    /// in. Callers that must not query a stale graph wait on the handle.
    pub fn spawn_load(self: &Arc<Self>, path: impl Into<PathBuf>) -> Result<LoadHandle> {
        let path = path.into();
        let token = CancelToken::new();
        let engine = Arc::clone(self);
        let worker_token = token.clone();
        let worker_path = path.clone();
        let handle = std::thread::Builder::new()
            .name("massgraph-load".to_string())
            .spawn(move || engine.load_with_cancel(&worker_path, &worker_token))
            .map_err(|e| EngineError::io(path, e))?;
        Ok(LoadHandle { handle, token })
    }

    fn install<R: BufRead>(&self, mut parser: EdgeListParser<R>) -> Result<LoadSummary> {
        let start = Instant::now();
        let source = parser.source().to_path_buf();
        info!(source = %source.display(), "loading edge list");

        let built = CsrGraph::try_build(parser.by_ref());
        let parse_stats = parser.finish();
        let graph = match built {
            Ok(graph) => graph,
            Err(e) => {
                warn!(source = %source.display(), error = %e, "load failed, keeping previous graph");
                return Err(e);
            }
        };

        let memory_bytes = graph.memory_usage();
        let used_mb = memory_bytes / (1024 * 1024);
        let limit_mb = self.config.max_memory_mb;
        if limit_mb > 0 && used_mb > limit_mb {
            warn!(used_mb, limit_mb, "load rejected by memory cap");
            return Err(EngineError::MemoryLimitExceeded { used_mb, limit_mb });
        }

        let load_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();

        let generation = {
            let mut current = self.current.write();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *current = Some(Arc::new(LoadedGraph {
                graph,
                source: source.clone(),
                parse_stats,
                load_time_ms,
                loaded_at: Instant::now(),
                generation,
            }));
            generation
        };

        info!(
            source = %source.display(),
            nodes = node_count,
            edges = edge_count,
            malformed = parse_stats.malformed,
            load_time_ms,
            generation,
            "graph loaded"
        );

        Ok(LoadSummary {
            source,
            node_count,
            edge_count,
            memory_bytes,
            parse_stats,
            load_time_ms,
            generation,
        })
    }

    /// Drop the current graph, if any.
    pub fn unload(&self) {
        self.current.write().take();
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Shared handle to the current graph. Stays valid across later loads.
    pub fn snapshot(&self) -> Result<Arc<LoadedGraph>> {
        self.current.read().clone().ok_or(EngineError::NotLoaded)
    }

    pub fn critical_node(&self) -> Result<NodeId> {
        degree::critical_node(&self.snapshot()?.graph)
    }

    /// Depth-bounded BFS subgraph, capped at `max_result_edges` edges.
    pub fn bfs_subgraph(&self, start: NodeId, depth: u32) -> Result<TraversalResult> {
        let loaded = self.snapshot()?;
        let result =
            traversal::bfs_subgraph_capped(&loaded.graph, start, depth, self.config.max_result_edges)?;
        if result.truncated {
            debug!(start, depth, cap = self.config.max_result_edges, "bfs result truncated");
        }
        Ok(result)
    }

    pub fn bfs_neighborhood(&self, start: NodeId, depth: u32) -> Result<Neighborhood> {
        traversal::bfs_neighborhood(&self.snapshot()?.graph, start, depth)
    }

    pub fn degree_of(&self, id: NodeId) -> Result<usize> {
        degree::degree_of(&self.snapshot()?.graph, id)
    }

    pub fn top_degree(&self, top_n: usize) -> Result<Vec<DegreeEntry>> {
        Ok(degree::top_degree(&self.snapshot()?.graph, top_n))
    }

    pub fn status(&self) -> EngineStatus {
        match self.snapshot() {
            Ok(loaded) => EngineStatus {
                status: LoadState::Loaded,
                source: Some(loaded.source.clone()),
                node_count: loaded.graph.node_count(),
                edge_count: loaded.graph.edge_count(),
                max_degree: degree::max_degree(&loaded.graph),
                memory_bytes: loaded.graph.memory_usage(),
                load_time_ms: loaded.load_time_ms,
                loaded_secs_ago: loaded.loaded_at.elapsed().as_secs_f64(),
                generation: loaded.generation,
            },
            Err(_) => EngineStatus {
                status: LoadState::NotLoaded,
                source: None,
                node_count: 0,
                edge_count: 0,
                max_degree: 0,
                memory_bytes: 0,
                load_time_ms: 0.0,
                loaded_secs_ago: 0.0,
                generation: self.generation.load(Ordering::SeqCst),
            },
        }
    }
}

/// A load running on a worker thread.
pub struct LoadHandle {
    handle: JoinHandle<Result<LoadSummary>>,
    token: CancelToken,
}

impl LoadHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the worker to stop at its next cancellation check.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Block until the load completes.
    pub fn wait(self) -> Result<LoadSummary> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SQUARE: &str = "1 2\n2 3\n3 4\n1 4\n";

    fn loaded(input: &str) -> Engine {
        let engine = Engine::default();
        engine
            .load_reader(Cursor::new(input.as_bytes().to_vec()), "<test>")
            .unwrap();
        engine
    }

    #[test]
    fn test_queries_before_load() {
        let engine = Engine::default();
        assert!(!engine.is_loaded());
        assert!(matches!(engine.critical_node(), Err(EngineError::NotLoaded)));
        assert!(matches!(engine.bfs_subgraph(1, 1), Err(EngineError::NotLoaded)));
        assert!(matches!(engine.top_degree(3), Err(EngineError::NotLoaded)));
        assert_eq!(engine.status().status, LoadState::NotLoaded);
    }

    #[test]
    fn test_square_end_to_end() {
        let engine = loaded(SQUARE);
        let status = engine.status();
        assert_eq!(status.node_count, 4);
        assert_eq!(status.edge_count, 4);
        assert_eq!(status.generation, 1);
        assert_eq!(engine.critical_node().unwrap(), 1);
        assert_eq!(engine.bfs_subgraph(1, 1).unwrap().edges, vec![(1, 2), (1, 4)]);
        assert!(matches!(engine.bfs_subgraph(99, 1), Err(EngineError::InvalidNode(99))));
    }

    #[test]
    fn test_failed_load_keeps_previous_graph() {
        let engine = loaded(SQUARE);
        let err = engine
            .load_reader(Cursor::new(b"# nothing\n5 5\n".to_vec()), "<empty>")
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyGraph));
        assert_eq!(engine.status().node_count, 4);
        assert_eq!(engine.status().generation, 1);
    }

    #[test]
    fn test_reload_replaces_graph() {
        let engine = loaded(SQUARE);
        let summary = engine
            .load_reader(Cursor::new(b"10 20\n".to_vec()), "<second>")
            .unwrap();
        assert_eq!(summary.generation, 2);
        assert_eq!(engine.critical_node().unwrap(), 10);
        assert!(matches!(engine.bfs_subgraph(1, 1), Err(EngineError::InvalidNode(1))));
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let engine = loaded(SQUARE);
        let old = engine.snapshot().unwrap();
        engine
            .load_reader(Cursor::new(b"10 20\n".to_vec()), "<second>")
            .unwrap();
        assert_eq!(old.graph.node_count(), 4);
        assert_eq!(engine.snapshot().unwrap().graph.node_count(), 2);
    }

    #[test]
    fn test_memory_cap() {
        let engine = Engine::new(EngineConfig {
            max_memory_mb: 1,
            ..EngineConfig::default()
        });
        let input: String = (0..200_000u64).map(|i| format!("{} {}\n", i, i + 1)).collect();
        let err = engine
            .load_reader(Cursor::new(input.into_bytes()), "<big>")
            .unwrap_err();
        assert!(matches!(err, EngineError::MemoryLimitExceeded { limit_mb: 1, .. }));
        assert!(!engine.is_loaded());
    }

    #[test]
    fn test_bfs_cap_from_config() {
        let engine = Engine::new(EngineConfig {
            max_result_edges: 2000,
            ..EngineConfig::default()
        });
        let star: String = (1..=100_000u64).map(|i| format!("0 {}\n", i)).collect();
        engine
            .load_reader(Cursor::new(star.into_bytes()), "<star>")
            .unwrap();

        let r = engine.bfs_subgraph(0, 1).unwrap();
        assert_eq!(r.edges.len(), 2000);
        assert!(r.truncated);

        let small = engine.bfs_subgraph(5, 1).unwrap();
        assert_eq!(small.edges, vec![(5, 0)]);
        assert!(!small.truncated);
    }

    #[test]
    fn test_bfs_uncapped_by_default() {
        let star: String = (1..=100_000u64).map(|i| format!("0 {}\n", i)).collect();
        let engine = loaded(&star);
        let r = engine.bfs_subgraph(0, 1).unwrap();
        assert_eq!(r.edges.len(), 100_000);
        assert!(!r.truncated);
    }

    #[test]
    fn test_status_reports_load_age() {
        let engine = Engine::default();
        assert_eq!(engine.status().loaded_secs_ago, 0.0);

        let engine = loaded(SQUARE);
        let first = engine.status().loaded_secs_ago;
        std::thread::sleep(std::time::Duration::from_millis(20));
        let later = engine.status().loaded_secs_ago;
        assert!(first >= 0.0);
        assert!(later >= first + 0.015);
    }

    #[test]
    fn test_unload() {
        let engine = loaded(SQUARE);
        engine.unload();
        assert!(matches!(engine.critical_node(), Err(EngineError::NotLoaded)));
    }
}
