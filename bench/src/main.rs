use std::collections::VecDeque;
use std::io::{BufWriter, Write};
use std::time::Instant;

use massgraph_core::Engine;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

type Generator = fn(u64, &mut dyn FnMut(u64, u64));

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("all");
    let node_count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1_000_000);

    if mode == "help" || mode == "--help" {
        println!("Usage: massgraph-bench [mode] [node_count]");
        println!();
        println!("Modes:");
        println!("  all         Run all generators and benchmark each (default)");
        println!("  lsystem     Fractal branching tree (deep paths)");
        println!("  scalefree   Preferential attachment via edge sampling (hub-and-spoke)");
        println!("  smallworld  Watts-Strogatz ring lattice + shortcuts");
        println!("  random      Erdos-Renyi uniform random edges");
        println!("  barbell     Two dense cliques connected by a thin bridge");
        println!("  dla         Diffusion-limited aggregation (organic branching)");
        println!();
        println!("Default node_count: 1000000");
        return;
    }

    println!("massgraph-bench");
    println!("===============");
    println!();

    let generators: Vec<(&str, Generator)> = match mode {
        "lsystem" => vec![("L-system tree", gen_lsystem)],
        "scalefree" => vec![("Scale-free (edge sampling)", gen_scale_free)],
        "smallworld" => vec![("Small-world (Watts-Strogatz)", gen_small_world)],
        "random" => vec![("Erdos-Renyi random", gen_random)],
        "barbell" => vec![("Barbell (clique-bridge-clique)", gen_barbell)],
        "dla" => vec![("DLA (organic branching)", gen_dla)],
        "all" => vec![
            ("L-system tree", gen_lsystem as Generator),
            ("Scale-free (edge sampling)", gen_scale_free),
            ("Small-world (Watts-Strogatz)", gen_small_world),
            ("Erdos-Renyi random", gen_random),
            ("Barbell (clique-bridge-clique)", gen_barbell),
            ("DLA (organic branching)", gen_dla),
        ],
        _ => {
            eprintln!("Unknown mode: {}. Use --help for options.", mode);
            return;
        }
    };

    for (name, generator) in generators {
        if let Err(e) = run_benchmark(name, generator, node_count) {
            eprintln!("{}: {}", name, e);
        }
    }
}

fn write_dataset(generator: Generator, node_count: u64) -> std::io::Result<(NamedTempFile, u64)> {
    let file = NamedTempFile::new()?;
    let mut out = BufWriter::with_capacity(1 << 20, file.as_file());
    writeln!(out, "# massgraph-bench synthetic edge list, {} nodes", node_count)?;

    let mut lines = 0u64;
    let mut result = Ok(());
    generator(node_count, &mut |u, v| {
        if result.is_ok() {
            result = writeln!(out, "{}\t{}", u, v);
            lines += 1;
        }
    });
    result?;
    out.flush()?;
    drop(out);
    Ok((file, lines))
}

fn run_benchmark(name: &str, generator: Generator, node_count: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("--- {} ---", name);
    println!("Target: {} nodes", node_count);

    let t = Instant::now();
    let (file, lines) = write_dataset(generator, node_count)?;
    println!("Wrote {} edge lines in {:.2}s", lines, t.elapsed().as_secs_f64());

    let engine = Engine::default();
    let summary = engine.load(file.path())?;
    println!(
        "Loaded in {:.2}s: {} nodes, {} edges, ~{:.0}MB",
        summary.load_time_ms / 1000.0,
        summary.node_count,
        summary.edge_count,
        summary.memory_bytes as f64 / 1_048_576.0
    );

    let t = Instant::now();
    let critical = engine.critical_node()?;
    println!(
        "Critical node: {} (degree {}) in {:.1}ms",
        critical,
        engine.degree_of(critical)?,
        t.elapsed().as_secs_f64() * 1000.0
    );

    // BFS from node 0 (typically a hub or root)
    println!();
    println!("{:>8} {:>12} {:>12} {:>10}", "depth", "edges", "visited", "time");
    println!("{:->8} {:->12} {:->12} {:->10}", "", "", "", "");

    for depth in [1, 2, 3, 5, 10] {
        let t = Instant::now();
        let result = engine.bfs_subgraph(0, depth)?;
        let elapsed = t.elapsed();
        println!(
            "{:>8} {:>12} {:>12} {:>8.1}ms",
            depth,
            result.edges.len(),
            result.nodes_visited,
            elapsed.as_secs_f64() * 1000.0
        );
        // Stop if we already found everything
        if result.nodes_visited >= summary.node_count {
            println!("{:>8} (entire graph reached)", "");
            break;
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Generators: all O(n) or O(n + edges), single-threaded, deterministic
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// L-system fractal tree: each node spawns 3 children.
///
/// Log depth with exponential width. Exercises deep BFS levels.
fn gen_lsystem(node_count: u64, emit: &mut dyn FnMut(u64, u64)) {
    let branching = 3u64;
    let mut next_id: u64 = 1;
    let mut frontier: Vec<u64> = vec![0];

    while next_id < node_count && !frontier.is_empty() {
        let mut next_frontier = Vec::with_capacity(frontier.len() * branching as usize);
        for &parent in &frontier {
            for _ in 0..branching {
                if next_id >= node_count {
                    break;
                }
                emit(parent, next_id);
                next_frontier.push(next_id);
                next_id += 1;
            }
        }
        frontier = next_frontier;
    }
}

/// Scale-free via edge-list sampling (O(edges), not O(n²)).
///
/// Preferential attachment by picking a random existing edge endpoint.
/// Nodes with more edges are more likely to be picked, and repeated picks
/// produce duplicate lines the loader has to coalesce.
fn gen_scale_free(node_count: u64, emit: &mut dyn FnMut(u64, u64)) {
    let edges_per_node = 10u64;
    let mut rng = FastRng::new(12345);
    let mut edge_endpoints: Vec<u64> = Vec::with_capacity((node_count * edges_per_node * 2) as usize);

    // Seed: small clique
    let seed = 5u64.min(node_count);
    for i in 0..seed {
        for j in (i + 1)..seed {
            emit(i, j);
            edge_endpoints.push(i);
            edge_endpoints.push(j);
        }
    }

    for new_node in seed..node_count {
        let attach = edges_per_node.min(new_node);
        for _ in 0..attach {
            if edge_endpoints.is_empty() {
                break;
            }
            let idx = rng.next(edge_endpoints.len() as u64) as usize;
            let target = edge_endpoints[idx];
            if target != new_node {
                emit(new_node, target);
                edge_endpoints.push(new_node);
                edge_endpoints.push(target);
            }
        }
    }
}

/// Small-world (Watts-Strogatz): ring lattice + random rewiring.
///
/// Each node connects to K ring neighbors; each edge is rewired with
/// probability p. High clustering with short path lengths.
fn gen_small_world(node_count: u64, emit: &mut dyn FnMut(u64, u64)) {
    let k = 10u64;
    let p = 0.05f64;
    let mut rng = FastRng::new(67890);

    for i in 0..node_count {
        for j in 1..=k {
            let neighbor = (i + j) % node_count;
            if rng.next_f64() < p {
                let rewired = rng.next(node_count);
                emit(i, if rewired != i { rewired } else { neighbor });
            } else {
                emit(i, neighbor);
            }
        }
    }
}

/// Erdos-Renyi: ~10 uniform random edges per node, self-loops included.
fn gen_random(node_count: u64, emit: &mut dyn FnMut(u64, u64)) {
    let mut rng = FastRng::new(54321);
    for _ in 0..node_count * 10 {
        emit(rng.next(node_count), rng.next(node_count));
    }
}

/// Barbell: two dense clusters joined by a chain of 10 bridge nodes.
fn gen_barbell(node_count: u64, emit: &mut dyn FnMut(u64, u64)) {
    let bridge_len = 10u64;
    let clique_size = node_count.saturating_sub(bridge_len) / 2;
    if clique_size < 2 {
        return;
    }
    let mut rng = FastRng::new(99999);

    for i in 0..clique_size {
        for _ in 0..20u64.min(clique_size - 1) {
            let target = rng.next(clique_size);
            if target != i {
                emit(i, target);
            }
        }
    }

    let bridge_start = clique_size;
    emit(clique_size - 1, bridge_start);
    for i in 1..bridge_len {
        emit(bridge_start + i - 1, bridge_start + i);
    }

    let b_start = bridge_start + bridge_len;
    emit(b_start - 1, b_start);
    for i in 0..clique_size {
        for _ in 0..20u64.min(clique_size - 1) {
            let target = rng.next(clique_size);
            if target != i {
                emit(b_start + i, b_start + target);
            }
        }
    }
}

/// DLA (Diffusion-Limited Aggregation): organic branching growth.
///
/// Each new node attaches to a random recent "surface" node, with a 10%
/// chance of a second long-range edge.
fn gen_dla(node_count: u64, emit: &mut dyn FnMut(u64, u64)) {
    let mut rng = FastRng::new(77777);
    let surface_max = 10000usize;
    let mut surface: VecDeque<u64> = VecDeque::with_capacity(surface_max + 1);
    surface.push_back(0);

    for new_node in 1..node_count {
        let attach_to = surface[rng.next(surface.len() as u64) as usize];
        emit(new_node, attach_to);

        if rng.next(10) == 0 && new_node > 1 {
            let other = rng.next(new_node);
            if other != attach_to {
                emit(new_node, other);
            }
        }

        surface.push_back(new_node);
        if surface.len() > surface_max {
            surface.pop_front();
        }
    }
}
