//! Streaming reader for SNAP-style edge lists.
//!
//! One edge per line, `<u> <v>` separated by spaces or tabs. Blank lines and
//! comment lines are ignored. Noisy lines are skipped and counted rather than
//! failing the whole load: real-world network dumps routinely contain them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::graph::NodeId;

const READ_BUFFER_BYTES: usize = 1 << 20;

/// Shared flag for cooperative cancellation of a long load.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Line accounting for one pass over an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ParseStats {
    pub lines: u64,
    pub blank: u64,
    pub comments: u64,
    pub malformed: u64,
    pub pairs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Malformed {
    InvalidUtf8,
    TokenCount(usize),
    NotAnInteger,
}

impl Malformed {
    fn reason(self) -> String {
        match self {
            Malformed::InvalidUtf8 => "invalid UTF-8".to_string(),
            Malformed::TokenCount(n) => format!("expected 2 tokens, found {}", n),
            Malformed::NotAnInteger => "token is not a non-negative integer".to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Blank,
    Comment,
    Pair(NodeId, NodeId),
    Malformed(Malformed),
}

/// Lazy iterator of raw `(u, v)` pairs.
///
/// Yields `Err` at most once (I/O failure or cancellation) and is fused
/// afterwards. Restarting means opening the source again.
pub struct EdgeListParser<R> {
    reader: R,
    source: PathBuf,
    comment_prefixes: Vec<String>,
    max_warnings: usize,
    cancel: Option<CancelToken>,
    cancel_interval: u64,
    buf: Vec<u8>,
    stats: ParseStats,
    done: bool,
}

impl EdgeListParser<BufReader<File>> {
    /// Open a file for streaming. Fails with `Io` if it cannot be opened.
    pub fn open(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
        Ok(Self::new(
            BufReader::with_capacity(READ_BUFFER_BYTES, file),
            path,
            config,
        ))
    }
}

impl<R: BufRead> EdgeListParser<R> {
    pub fn new(reader: R, source: impl Into<PathBuf>, config: &EngineConfig) -> Self {
        Self {
            reader,
            source: source.into(),
            comment_prefixes: config
                .comment_prefixes
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
            max_warnings: config.max_malformed_warnings,
            cancel: None,
            cancel_interval: config.cancel_check_interval.max(1) as u64,
            buf: Vec::with_capacity(64),
            stats: ParseStats::default(),
            done: false,
        }
    }

    /// Poll `token` every `cancel_check_interval` lines.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Log the malformed-line summary once the stream is drained.
    pub fn finish(self) -> ParseStats {
        if self.stats.malformed > self.max_warnings as u64 {
            warn!(
                source = %self.source.display(),
                malformed = self.stats.malformed,
                suppressed = self.stats.malformed - self.max_warnings as u64,
                "skipped malformed lines"
            );
        }
        self.stats
    }

    fn classify(&self, raw: &[u8]) -> Line {
        let Ok(text) = std::str::from_utf8(raw) else {
            return Line::Malformed(Malformed::InvalidUtf8);
        };
        let text = text.trim();
        if text.is_empty() {
            return Line::Blank;
        }
        if self
            .comment_prefixes
            .iter()
            .any(|p| text.starts_with(p.as_str()))
        {
            return Line::Comment;
        }

        let mut tokens = text.split_whitespace();
        let (Some(a), Some(b), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Line::Malformed(Malformed::TokenCount(text.split_whitespace().count()));
        };
        match (a.parse::<NodeId>(), b.parse::<NodeId>()) {
            (Ok(u), Ok(v)) => Line::Pair(u, v),
            _ => Line::Malformed(Malformed::NotAnInteger),
        }
    }

    fn check_cancelled(&self) -> bool {
        match &self.cancel {
            Some(token) => self.stats.lines % self.cancel_interval == 0 && token.is_cancelled(),
            None => false,
        }
    }
}

impl<R: BufRead> Iterator for EdgeListParser<R> {
    type Item = Result<(NodeId, NodeId)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(EngineError::io(self.source.clone(), e)));
                }
            }

            self.stats.lines += 1;
            if self.check_cancelled() {
                self.done = true;
                return Some(Err(EngineError::Cancelled));
            }

            match self.classify(&self.buf) {
                Line::Blank => self.stats.blank += 1,
                Line::Comment => self.stats.comments += 1,
                Line::Pair(u, v) => {
                    self.stats.pairs += 1;
                    return Some(Ok((u, v)));
                }
                Line::Malformed(kind) => {
                    self.stats.malformed += 1;
                    if self.stats.malformed <= self.max_warnings as u64 {
                        warn!(
                            source = %self.source.display(),
                            line = self.stats.lines,
                            reason = %kind.reason(),
                            "skipping malformed line"
                        );
                    }
                }
            }
        }
        None
    }
}

impl<R: BufRead> std::iter::FusedIterator for EdgeListParser<R> {}
