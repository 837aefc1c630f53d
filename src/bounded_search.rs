//! The recursive branch-and-reduce driver.
//!
//! Each call reduces the instance with the tree and path rules, compares a
//! lower bound against the remaining budget, decomposes into connected
//! components, tries the B-bridge rule, and finally branches on the best
//! operation the branching rules produce. `None` means the instance has no
//! solution within its budget; the failed instance carries `k = -1`.

use log::debug;

use crate::branching::{apply_branch_op, apply_one_branch, get_best_branch_op};
use crate::cf_instance::{CfInstance, Solution, SolutionEdge};
use crate::heuristics::compute_lower_bound;
use crate::path_reduction::PathInfo;
use crate::statistics::Stats;

/// Tuning knobs of the search, surfaced on the command line.
#[derive(Debug, Clone)]
pub struct SolvOptions {
    /// Apply the cyclomatic lower bound every this many layers.
    pub fast_lower_bound_cadence: usize,
    /// Apply the star-packing lower bound every this many layers.
    pub slow_lower_bound_cadence: usize,
    pub use_bbridge_rule: bool,
    /// Keep collecting branch operations instead of taking the first
    /// acceptable one.
    pub elaborate_branch_selection: bool,
    /// With quick selection, stop looking once an operation at or below
    /// this branching number is found.
    pub keep_searching_if_bnum_above: f64,
    /// Run the Y-lookahead while the graph has fewer vertices than this.
    pub max_size_for_y_lookahead: usize,
}

impl Default for SolvOptions {
    fn default() -> Self {
        SolvOptions {
            fast_lower_bound_cadence: 1,
            slow_lower_bound_cadence: 8,
            use_bbridge_rule: true,
            elaborate_branch_selection: false,
            keep_searching_if_bnum_above: 2.5,
            max_size_for_y_lookahead: 30,
        }
    }
}

/// Below this many vertices no 2-claw fits, so any feedback edge set is an
/// optimal solution.
const SMALL_INSTANCE: usize = 7;

impl CfInstance {
    /// Solves a reduced instance of fewer than seven vertices outright by
    /// taking a spanning-forest feedback edge set.
    pub fn solv_small_instance(&mut self) -> Solution {
        let fes = self.graph.spanning_forest_fes();
        let sol: Solution = fes
            .iter()
            .map(|&e| SolutionEdge::named(&self.graph, e))
            .collect();
        self.k -= sol.len() as i64;
        self.graph.clear();
        sol
    }

    /// One node of the search tree. Returns the deletions that solve this
    /// instance within its budget, or `None`.
    pub fn run_search(
        &mut self,
        stats: &mut Stats,
        opts: &SolvOptions,
        depth: usize,
    ) -> Option<Solution> {
        stats.enter_node(depth);

        if self.graph.num_vertices() < SMALL_INSTANCE {
            let sol = self.solv_small_instance();
            return (self.k >= 0).then_some(sol);
        }

        debug!(
            "depth {}: reducing {} vertices, {} edges, k = {}",
            depth,
            self.graph.num_vertices(),
            self.graph.num_edges(),
            self.k
        );
        let mut sol = self.apply_trrs(stats);
        self.apply_split_rule();
        let mut deg2paths: Vec<PathInfo> = Vec::new();
        sol.extend(self.apply_prrs(opts, stats, &mut deg2paths));

        if self.graph.is_empty() && self.k >= 0 {
            return Some(sol);
        }
        if self.k <= 0 {
            self.k = -1;
            return None;
        }
        if self.graph.num_vertices() < SMALL_INSTANCE + 1 {
            let rest = self.solv_small_instance();
            sol.extend(rest);
            return (self.k >= 0).then_some(sol);
        }

        let lower_bound = compute_lower_bound(&mut self.graph, opts, depth);
        debug!("depth {}: lower bound {} vs budget {}", depth, lower_bound, self.k);
        if lower_bound as i64 > self.k {
            self.k = -1;
            return None;
        }

        self.graph.mark_bridges();
        if self.graph.cc_count > 1 {
            return self.solve_componentwise(sol, stats, opts, depth);
        }

        if opts.use_bbridge_rule {
            if let Some(bb_sol) = self.apply_bbridge_rule(stats, opts, depth) {
                debug!("B-bridge rule produced {} deletions", bb_sol.len());
                sol.extend(bb_sol);
                let rest = self.run_search(stats, opts, depth)?;
                sol.extend(rest);
                return Some(sol);
            }
            if self.k < 0 {
                return None;
            }
        }

        let bop = get_best_branch_op(
            &self.graph,
            &deg2paths,
            !opts.elaborate_branch_selection,
            opts.keep_searching_if_bnum_above,
        );
        let bop = match bop {
            Some(bop) => bop,
            None => panic!("no reduction and no branching applies"),
        };

        match bop.branches.len() {
            0 => {
                // every candidate edge is already permanent: the optimum
                // was found in an earlier sibling
                None
            }
            1 => {
                // a single branch is a reduction; no copy needed
                stats.record_branching(&bop);
                apply_one_branch(self, &bop.branches[0], &mut sol);
                let rest = self.run_search(stats, opts, depth + 1)?;
                sol.extend(rest);
                Some(sol)
            }
            _ => {
                stats.record_branching(&bop);
                let min_sol = apply_branch_op(&bop, self, stats, opts, depth)?;
                self.graph.clear();
                sol.extend(min_sol);
                Some(sol)
            }
        }
    }

    /// Splits one component off and solves both sides, smaller first, on
    /// the shared budget.
    fn solve_componentwise(
        &mut self,
        mut sol: Solution,
        stats: &mut Stats,
        opts: &SolvOptions,
        depth: usize,
    ) -> Option<Solution> {
        let comp = self
            .graph
            .split_off_component()
            .expect("more than one component");
        let mut other = CfInstance::new(comp, self.k);
        debug!(
            "depth {}: splitting components of {} and {} vertices",
            depth,
            self.graph.num_vertices(),
            other.graph.num_vertices()
        );

        let mut rec_sol;
        if self.graph.num_vertices() < other.graph.num_vertices() {
            rec_sol = match self.run_search(stats, opts, depth + 1) {
                Some(s) => s,
                None => {
                    self.k = -1;
                    return None;
                }
            };
            other.k -= rec_sol.len() as i64;
            match other.run_search(stats, opts, depth + 1) {
                Some(s) => rec_sol.extend(s),
                None => {
                    self.k = -1;
                    return None;
                }
            }
            self.k = other.k;
        } else {
            rec_sol = match other.run_search(stats, opts, depth + 1) {
                Some(s) => s,
                None => {
                    self.k = -1;
                    return None;
                }
            };
            self.k -= rec_sol.len() as i64;
            match self.run_search(stats, opts, depth + 1) {
                Some(s) => rec_sol.extend(s),
                None => {
                    self.k = -1;
                    return None;
                }
            }
        }
        sol.extend(rec_sol);
        Some(sol)
    }

    /// The public entry: seed the budget with the greedy upper bound, then
    /// search. An instance within its heuristic bound always solves.
    pub fn branch_and_reduce(&mut self, opts: &SolvOptions, stats: &mut Stats) -> Option<Solution> {
        self.k = i64::MAX;
        let upper = self.upper_bound_simple();
        self.k = upper.len() as i64;
        debug!("starting search with upper bound {}", self.k);
        self.run_search(stats, opts, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use std::io::Cursor;

    fn solve(input: &str) -> Solution {
        solve_with(input, &SolvOptions::default())
    }

    fn solve_with(input: &str, opts: &SolvOptions) -> Solution {
        let graph = Graph::read_edge_list(Cursor::new(input)).unwrap();
        let mut ins = CfInstance::new(graph, 0);
        let mut stats = Stats::new();
        ins.branch_and_reduce(opts, &mut stats)
            .expect("within the upper bound a solution exists")
    }

    #[test]
    fn single_edge_test() {
        assert!(solve("a b\n").is_empty());
    }

    #[test]
    fn triangle_test() {
        assert_eq!(solve("a b\nb c\nc a\n").len(), 1);
    }

    #[test]
    fn complete_four_test() {
        // K4 keeps a path on four vertices
        assert_eq!(solve("a b\na c\na d\nb c\nb d\nc d\n").len(), 3);
    }

    #[test]
    fn two_disjoint_triangles_test() {
        assert_eq!(solve("a b\nb c\nc a\nx y\ny z\nz x\n").len(), 2);
    }

    #[test]
    fn path_is_already_solved_test() {
        assert!(solve("a b\nb c\nc d\nd e\n").is_empty());
    }

    #[test]
    fn spider_reduces_without_branching_test() {
        // four length-2 legs at one centre: the star packing proves two
        // deletions necessary, and the P2 trimming reaches them without
        // ever branching
        let graph = Graph::read_edge_list(Cursor::new(
            "c x\nx x'\nc y\ny y'\nc z\nz z'\nc p\np p'\n",
        ))
        .unwrap();
        let mut ins = CfInstance::new(graph, 0);
        let mut stats = Stats::new();
        let sol = ins
            .branch_and_reduce(&SolvOptions::default(), &mut stats)
            .unwrap();
        assert_eq!(sol.len(), 2);
        assert_eq!(stats.branchings.len(), 0);
    }

    #[test]
    fn two_squares_over_bridge_test() {
        assert_eq!(
            solve("a b\nb c\nc d\nd a\ne f\nf g\ng h\nh e\nd e\n").len(),
            2
        );
    }

    #[test]
    fn triangle_with_two_ptwos_test() {
        assert_eq!(solve("a b\nb c\nc a\na p1\np1 p2\na q1\nq1 q2\n").len(), 1);
    }

    #[test]
    fn two_kfours_test() {
        // two disjoint K4s split into components
        let input = "a b\na c\na d\nb c\nb d\nc d\n\
                     e f\ne g\ne h\nf g\nf h\ng h\n";
        assert_eq!(solve(input).len(), 6);
    }

    #[test]
    fn two_kfours_over_bridge_test() {
        let input = "a b\na c\na d\nb c\nb d\nc d\n\
                     e f\ne g\ne h\nf g\nf h\ng h\nd e\n";
        assert_eq!(solve(input).len(), 6);
    }

    #[test]
    fn options_do_not_change_the_optimum_test() {
        let input = "a b\na c\na d\nb c\nb d\nc d\n\
                     e f\ne g\ne h\nf g\nf h\ng h\nd e\n";
        for use_bb in [true, false] {
            for slow_cadence in [1, 8] {
                let opts = SolvOptions {
                    use_bbridge_rule: use_bb,
                    slow_lower_bound_cadence: slow_cadence,
                    ..SolvOptions::default()
                };
                assert_eq!(solve_with(input, &opts).len(), 6);
            }
        }
    }

    #[test]
    fn solution_stays_within_fes_bound_test() {
        let input = "a b\na c\na d\nb c\nb d\nc d\n";
        let mut graph = Graph::read_edge_list(Cursor::new(input)).unwrap();
        let fes = graph.fes_size();
        assert_eq!(solve(input).len(), fes);
    }

    #[test]
    fn permanent_edge_is_never_named_test() {
        let graph = Graph::read_edge_list(Cursor::new("a b\nb c\nc a\n")).unwrap();
        let mut ins = CfInstance::new(graph, 0);
        let ab = ins
            .graph
            .canonical_edges()
            .find(|&e| {
                let mut ends = [
                    ins.graph.label(ins.graph.tail(e)),
                    ins.graph.label(ins.graph.head(e)),
                ];
                ends.sort();
                ends == ["a", "b"]
            })
            .unwrap();
        ins.graph.mark_permanent(ab);
        let mut stats = Stats::new();
        let sol = ins
            .branch_and_reduce(&SolvOptions::default(), &mut stats)
            .unwrap();
        assert_eq!(sol.len(), 1);
        for entry in &sol {
            if let SolutionEdge::Named { tail, head } = entry {
                let mut ends = [tail.as_str(), head.as_str()];
                ends.sort();
                assert_ne!(ends, ["a", "b"]);
            }
        }
    }
}
