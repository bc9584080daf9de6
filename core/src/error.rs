use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::graph::NodeId;

/// Errors surfaced by the engine and its building blocks.
///
/// Every variant maps to a stable [`ErrorKind`] so callers that only render
/// messages can still branch on the failure class.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot read '{}': {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("no valid edges found in input")]
    EmptyGraph,

    #[error("node {0} not found")]
    InvalidNode(NodeId),

    #[error("no graph loaded, call load() first")]
    NotLoaded,

    #[error("input has more than {} distinct node ids", u32::MAX)]
    CapacityExceeded,

    #[error("loaded graph uses {used_mb}MB, exceeds max_memory_mb={limit_mb}MB")]
    MemoryLimitExceeded { used_mb: usize, limit_mb: usize },

    #[error("load cancelled")]
    Cancelled,
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Io { .. } => ErrorKind::Io,
            EngineError::EmptyGraph => ErrorKind::EmptyGraph,
            EngineError::InvalidNode(_) => ErrorKind::InvalidNode,
            EngineError::NotLoaded => ErrorKind::NotLoaded,
            EngineError::CapacityExceeded => ErrorKind::CapacityExceeded,
            EngineError::MemoryLimitExceeded { .. } => ErrorKind::MemoryLimitExceeded,
            EngineError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Coarse failure class, stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    EmptyGraph,
    InvalidNode,
    NotLoaded,
    CapacityExceeded,
    MemoryLimitExceeded,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::EmptyGraph => "empty_graph",
            ErrorKind::InvalidNode => "invalid_node",
            ErrorKind::NotLoaded => "not_loaded",
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::MemoryLimitExceeded => "memory_limit_exceeded",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
