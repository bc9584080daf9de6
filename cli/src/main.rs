//! massgraph-cli: load an edge-list file and run a single query against it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use massgraph_core::{Engine, EngineConfig, EngineError, LoadSummary};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "massgraph-cli", version, about = "Query massive edge-list networks")]
struct Cli {
    /// SNAP-style edge list: one `<u> <v>` pair per line, `#` comments
    file: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Refuse graphs larger than this many MB (0 = no limit)
    #[arg(long, env = "MASSGRAPH_MAX_MEMORY_MB", default_value_t = 4096)]
    max_memory_mb: usize,

    /// Stop a BFS subgraph after this many edges (0 = no limit)
    #[arg(long = "max-edges", env = "MASSGRAPH_MAX_EDGES", default_value_t = 0)]
    max_edges: usize,

    /// Extra comment prefixes besides `#`
    #[arg(long = "comment-prefix", env = "MASSGRAPH_COMMENT_PREFIXES", value_delimiter = ',')]
    comment_prefixes: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Node/edge counts, memory and load timing
    Stats,
    /// Highest-degree node (smallest id on ties)
    Critical,
    /// Edges walked by a depth-bounded BFS
    Bfs {
        start: u64,
        depth: u32,
        /// Print one flat line: src dst src dst ...
        #[arg(long)]
        flat: bool,
    },
    /// Nodes within `depth` hops with their distance
    Neighborhood { start: u64, depth: u32 },
    /// Nodes ranked by degree
    Top {
        #[arg(default_value_t = 10)]
        k: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{}]: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

fn config_from(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig {
        max_memory_mb: cli.max_memory_mb,
        max_result_edges: cli.max_edges,
        ..EngineConfig::default()
    };
    config.comment_prefixes.extend(cli.comment_prefixes.iter().cloned());
    config
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let engine = Engine::new(config_from(&cli));

    let t = Instant::now();
    let summary = engine.load(&cli.file)?;
    if !cli.json {
        print_summary(&summary, t.elapsed().as_secs_f64());
    }

    match cli.command {
        Commands::Stats => {
            let status = engine.status();
            if cli.json {
                emit_json(&status);
            } else {
                println!("max degree:  {}", status.max_degree);
                println!("memory:      ~{:.1}MB", status.memory_bytes as f64 / 1_048_576.0);
                println!("malformed:   {}", summary.parse_stats.malformed);
            }
        }
        Commands::Critical => {
            let node = engine.critical_node()?;
            let degree = engine.degree_of(node)?;
            if cli.json {
                emit_json(&serde_json::json!({ "node_id": node, "degree": degree }));
            } else {
                println!("critical node: {} (degree {})", node, degree);
            }
        }
        Commands::Bfs { start, depth, flat } => {
            let result = engine.bfs_subgraph(start, depth)?;
            if cli.json {
                emit_json(&result);
            } else if flat {
                let line: Vec<String> = result.flat().iter().map(|id| id.to_string()).collect();
                println!("{}", line.join(" "));
            } else {
                for (u, v) in &result.edges {
                    println!("{}\t{}", u, v);
                }
                println!("# {} edges, {} nodes", result.edges.len(), result.nodes_visited);
                if result.truncated {
                    println!("# truncated at --max-edges {}", cli.max_edges);
                }
            }
        }
        Commands::Neighborhood { start, depth } => {
            let result = engine.bfs_neighborhood(start, depth)?;
            if cli.json {
                emit_json(&result);
            } else {
                for n in &result.neighbors {
                    println!("{}\t{}", n.node_id, n.distance);
                }
            }
        }
        Commands::Top { k } => {
            let top = engine.top_degree(k)?;
            if cli.json {
                emit_json(&top);
            } else {
                for entry in &top {
                    println!("{:>12} {:>10}", entry.node_id, entry.degree);
                }
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &LoadSummary, wall_secs: f64) {
    println!(
        "loaded {}: {} nodes, {} edges in {:.2}s",
        summary.source.display(),
        summary.node_count,
        summary.edge_count,
        wall_secs
    );
}

fn emit_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!(error = %e, "failed to serialize result"),
    }
}
