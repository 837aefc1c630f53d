//! Counters accumulated during the search: rule applications, search-tree
//! shape and per-rule branching numbers. Dumped to stderr after every run.

use std::fmt;
use std::io::Write;

use fxhash::FxHashMap;

use crate::branching::{branch_number, branch_number_of, BranchOp, BranchType};
use crate::graph::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionKind {
    Trr1,
    Trr2,
    Trr3,
    Trr4,
    Trr5,
    Trr6,
    Prr1,
    Prr2,
    Prr3,
    Prr4,
    Prr5,
    Prr6,
    Prr7,
    Prr8,
    YLookahead,
}

pub const ALL_REDUCTIONS: &[ReductionKind] = &[
    ReductionKind::Trr1,
    ReductionKind::Trr2,
    ReductionKind::Trr3,
    ReductionKind::Trr4,
    ReductionKind::Trr5,
    ReductionKind::Trr6,
    ReductionKind::Prr1,
    ReductionKind::Prr2,
    ReductionKind::Prr3,
    ReductionKind::Prr4,
    ReductionKind::Prr5,
    ReductionKind::Prr6,
    ReductionKind::Prr7,
    ReductionKind::Prr8,
    ReductionKind::YLookahead,
];

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReductionKind::Trr1 => "T1",
            ReductionKind::Trr2 => "T2",
            ReductionKind::Trr3 => "T3",
            ReductionKind::Trr4 => "T4",
            ReductionKind::Trr5 => "T5",
            ReductionKind::Trr6 => "T6",
            ReductionKind::Prr1 => "P1",
            ReductionKind::Prr2 => "P2",
            ReductionKind::Prr3 => "P3",
            ReductionKind::Prr4 => "P4",
            ReductionKind::Prr5 => "P5",
            ReductionKind::Prr6 => "P6",
            ReductionKind::Prr7 => "P7",
            ReductionKind::Prr8 => "P8",
            ReductionKind::YLookahead => "YL",
        };
        write!(f, "{}", name)
    }
}

/// If branching number `x` occurs `a` times and branching number `y` occurs
/// `b` times then the average is `(ax + by) / (a + b)` over `a + b` events.
fn combine(p1: (usize, f64), p2: (usize, f64)) -> (usize, f64) {
    let num = p1.0 + p2.0;
    if num == 0 {
        return (0, 0.0);
    }
    let avg = (p1.1 * p1.0 as f64 + p2.1 * p2.0 as f64) / num as f64;
    (num, avg)
}

#[derive(Debug, Default)]
pub struct Stats {
    pub input_vertices: usize,
    pub input_edges: usize,
    pub input_fes: usize,
    pub searchtree_nodes: usize,
    pub searchtree_depth: usize,
    pub reductions: FxHashMap<ReductionKind, usize>,
    /// Per branching type: number of applications and average branching
    /// number.
    pub branchings: FxHashMap<BranchType, (usize, f64)>,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    pub fn for_input(graph: &mut Graph) -> Self {
        let mut stats = Stats::default();
        stats.input_vertices = graph.num_vertices();
        stats.input_edges = graph.num_edges();
        stats.input_fes = graph.fes_size();
        stats
    }

    pub fn count_reduction(&mut self, kind: ReductionKind) {
        *self.reductions.entry(kind).or_insert(0) += 1;
    }

    pub fn enter_node(&mut self, depth: usize) {
        self.searchtree_nodes += 1;
        self.searchtree_depth = self.searchtree_depth.max(depth);
    }

    pub fn record_branching(&mut self, op: &BranchOp) {
        let entry = self.branchings.entry(op.kind).or_insert((0, 0.0));
        *entry = combine(*entry, (1, branch_number_of(op)));
    }

    pub fn record_branching_sizes(&mut self, kind: BranchType, sizes: &[usize]) {
        let entry = self.branchings.entry(kind).or_insert((0, 0.0));
        *entry = combine(*entry, (1, branch_number(sizes)));
    }

    /// The overall average branching number across all branching rules.
    pub fn avg_branch_number(&self) -> f64 {
        let mut accu = (0usize, 0.0f64);
        for entry in self.branchings.values() {
            accu = combine(accu, *entry);
        }
        accu.1
    }

    /// Dumps the statistics as one tab-separated line.
    pub fn write_parser_friendly<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            self.input_vertices,
            self.input_edges,
            self.input_fes,
            self.searchtree_nodes,
            self.searchtree_depth
        )?;
        for kind in ALL_REDUCTIONS {
            write!(out, "\t{}", self.reductions.get(kind).copied().unwrap_or(0))?;
        }
        for kind in BranchType::ALL {
            let (num, avg) = self.branchings.get(kind).copied().unwrap_or((0, 0.0));
            write!(out, "\t{}\t{}", num, avg)?;
        }
        writeln!(out, "\t{}", self.avg_branch_number())
    }
}

/// The branching number that would create a search tree of this size and
/// depth: the positive root of `(x^(d+1) - 1) / (x - 1) = n`, bracketed.
pub fn branch_number_from_tree(size: usize, depth: usize) -> f64 {
    if size == 0 || depth == 0 {
        return 0.0;
    }
    let (mut lower, mut upper) = (0.0f64, 4.0f64);
    for _ in 0..40 {
        let x = (lower + upper) / 2.0;
        if (x.powi(depth as i32 + 1) - 1.0) / (x - 1.0) > size as f64 {
            upper = x;
        } else {
            lower = x;
        }
    }
    (lower + upper) / 2.0
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== statistics: ===")?;
        writeln!(
            f,
            "fes: {} ST nodes: {} ST depth: {}",
            self.input_fes, self.searchtree_nodes, self.searchtree_depth
        )?;
        write!(f, "Reductions:")?;
        for kind in ALL_REDUCTIONS {
            if let Some(count) = self.reductions.get(kind) {
                write!(f, " ({}: {})", kind, count)?;
            }
        }
        writeln!(f)?;
        write!(f, "Branchings:")?;
        for kind in BranchType::ALL {
            if let Some((num, avg)) = self.branchings.get(kind) {
                write!(f, " ({}: {} avg {:.4})", kind, num, avg)?;
            }
        }
        writeln!(f)?;
        writeln!(
            f,
            "Overall average branching number: {:.4}",
            self.avg_branch_number()
        )?;
        writeln!(
            f,
            "branching number from ST-size vs depth: {:.4}",
            branch_number_from_tree(self.searchtree_nodes, self.searchtree_depth)
        )?;
        write!(
            f,
            "branching number from ST-size vs fes: {:.4}",
            branch_number_from_tree(self.searchtree_nodes, self.input_fes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_shape_branch_number_test() {
        // a full binary tree of depth 3 has 15 nodes
        let x = branch_number_from_tree(15, 3);
        assert!((x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn combine_test() {
        let combined = combine((1, 2.0), (3, 1.0));
        assert_eq!(combined.0, 4);
        assert!((combined.1 - 1.25).abs() < 1e-9);
    }
}
