//! Binary that reads or generates a graph, computes a minimum caterpillar
//! forest edge deletion set, verifies it and prints it to standard out.
//! Statistics go to standard error either way.

use std::error;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;

use flexi_logger::Logger;
use structopt::StructOpt;

use cater_pillage::bounded_search::SolvOptions;
use cater_pillage::cf_instance::{format_solution, CfInstance};
use cater_pillage::graph::Graph;
use cater_pillage::random_graphs::random_connected_graph;
use cater_pillage::statistics::Stats;
use cater_pillage::verify::verify_solution;

#[derive(StructOpt)]
enum Input {
    /// Read a whitespace edge list from a file.
    File { path: PathBuf },
    /// Generate a random connected graph with the given number of vertices
    /// and additional non-tree edges.
    Rand { vertices: usize, extra_edges: usize },
}

#[derive(StructOpt)]
#[structopt(name = "exact", about = "Exact caterpillar-forest edge-deletion solver")]
struct Opts {
    #[structopt(subcommand)]
    input: Input,

    /// Apply the slower star-packing lower bound every x layers.
    #[structopt(long = "lbmod", default_value = "8")]
    lbmod: usize,

    /// Control the B-bridge branching rule (0 = off, 1 = on).
    #[structopt(long = "bb", default_value = "1")]
    bb: u8,

    /// Perform the Y-lookahead while the graph has fewer than x vertices.
    #[structopt(long = "yl", default_value = "30")]
    yl: usize,
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let _logger = Logger::try_with_env_or_str("warn")?.log_to_stderr().start()?;
    let opts = Opts::from_args();

    let solv_opts = SolvOptions {
        slow_lower_bound_cadence: opts.lbmod.max(1),
        use_bbridge_rule: opts.bb != 0,
        max_size_for_y_lookahead: opts.yl,
        ..SolvOptions::default()
    };

    let graph = match opts.input {
        Input::File { path } => Graph::read_edge_list(BufReader::new(File::open(path)?))?,
        Input::Rand {
            vertices,
            extra_edges,
        } => random_connected_graph(vertices, extra_edges)?,
    };
    let pristine = graph.clone();

    let mut ins = CfInstance::new(graph, 0);
    let mut stats = Stats::for_input(&mut ins.graph);
    let sol = ins
        .branch_and_reduce(&solv_opts, &mut stats)
        .expect("the search always succeeds within its greedy upper bound");

    if !verify_solution(&pristine, &sol, &solv_opts) {
        eprintln!("{}", stats);
        eprintln!("verification failed for: {}", format_solution(&sol));
        process::exit(1);
    }

    println!("solution: {} size: {}", format_solution(&sol), sol.len());
    eprintln!("{}", stats);
    stats.write_parser_friendly(&mut io::stderr().lock())?;
    Ok(())
}
