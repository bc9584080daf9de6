use serde::{Deserialize, Serialize};

/// Engine settings. Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Memory cap for a loaded graph, in MB. 0 disables the check.
    pub max_memory_mb: usize,
    /// Line prefixes that mark a comment in the edge-list file.
    pub comment_prefixes: Vec<String>,
    /// Individual malformed-line warnings emitted before switching to a summary.
    pub max_malformed_warnings: usize,
    /// Lines read between cancellation checks.
    pub cancel_check_interval: usize,
    /// Most edges a single BFS subgraph query returns. 0 means unlimited.
    pub max_result_edges: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 4096,
            comment_prefixes: vec!["#".to_string()],
            max_malformed_warnings: 10,
            cancel_check_interval: 65_536,
            max_result_edges: 0,
        }
    }
}
