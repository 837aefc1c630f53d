//! Rules that look at the whole graph instead of a single pendant tree or
//! degree-2 path: the structural split rule, the generalized TRR3, the
//! Y-graph lookahead and the B-bridge branching rule. The last one invokes
//! the recursive driver, which makes this module mutually recursive with
//! the bounded search.

use std::collections::VecDeque;

use fxhash::{FxHashMap, FxHashSet};
use log::debug;

use crate::bounded_search::SolvOptions;
use crate::cf_instance::{CfInstance, Solution, SolutionEdge};
use crate::graph::{EdgeId, Graph, VertexId};
use crate::kernelization::{attach_pendant, PendantShape};
use crate::statistics::{ReductionKind, Stats};

/// Both sides of a B-bridge need this much cyclic structure before the
/// four-way pendant analysis pays off.
const BBRIDGE_GLOBAL_FES_THRESHOLD: usize = 4;

/// Returns whether there is a path from `u` to `v` that avoids `x` and
/// every generator. Passing `x == u` forbids the direct edge `{u, v}`
/// instead of a vertex.
pub fn exists_gen_free_path(graph: &Graph, u: VertexId, v: VertexId, x: VertexId) -> bool {
    if graph.is_generator(u) || graph.is_generator(v) {
        return false;
    }
    let mut visited: FxHashSet<VertexId> = FxHashSet::default();
    let mut queue: VecDeque<VertexId> = VecDeque::new();
    if x == u {
        visited.insert(u);
        for e in graph.adj(u) {
            if graph.head(e) != v {
                queue.push_back(graph.head(e));
            }
        }
    } else {
        queue.push_back(u);
    }
    while let Some(w) = queue.pop_front() {
        visited.insert(w);
        if w == x || graph.is_generator(w) {
            continue;
        }
        if w == v {
            return true;
        }
        for e in graph.adj(w) {
            let next = graph.head(e);
            if !visited.contains(&next) {
                queue.push_back(next);
            }
        }
    }
    false
}

/// Generalized PRR4 applicability: the separator either carries two P2s
/// outright, or its two core neighbors are only connected through it once
/// generators are forbidden.
pub fn prr4_gen_applicable(graph: &Graph, separator: VertexId) -> bool {
    if graph.pendants(separator).ptwos.len() > 1 {
        return true;
    }
    let nh = graph.cyclic_core_neighbors(separator);
    debug_assert_eq!(nh.len(), 2);
    !exists_gen_free_path(graph, graph.head(nh[0]), graph.head(nh[1]), separator)
}

/// A bridge can be split at its head `v` if `v` is no leaf and neither `v`
/// nor any of its neighbors has more than two non-leaf neighbors.
fn is_splittable(graph: &Graph, b: EdgeId) -> bool {
    let v = graph.head(b);
    if graph.degree(v) <= 1 {
        return false;
    }
    if graph.nldeg(v) > 2 {
        return false;
    }
    graph.adj(v).all(|e| graph.nldeg(graph.head(e)) <= 2)
}

impl CfInstance {
    /// The split rule: replace a splittable B-bridge `{u, v}` by a fresh
    /// pendant leaf at `u`, separating the caterpillar-shaped side. Purely
    /// structural, no budget.
    pub fn apply_split_rule(&mut self) -> bool {
        let bridges = self.graph.bbridges();
        for b in bridges {
            for cand in [b, self.graph.twin(b)] {
                if is_splittable(&self.graph, cand) {
                    let v = self.graph.head(cand);
                    let u = self.graph.tail(cand);
                    debug!(
                        "split rule replaces {} by a leaf at {}",
                        self.graph.edge_name(cand),
                        self.graph.label(u)
                    );
                    let label = format!("{}'", self.graph.label(v));
                    let vprime = self.graph.add_vertex(label);
                    self.graph.add_edge(vprime, u);
                    self.graph.delete_edge(cand);
                    return true;
                }
            }
        }
        false
    }

    /// Generalized TRR3: a core vertex with two P2 pendants keeps them as
    /// its backbone; every cyclic neighbor is turned into a Y-pendant so no
    /// later branching ever runs through here.
    pub fn trr3_gen(&mut self, stats: &mut Stats, v: VertexId, sol: &mut Solution) -> bool {
        if !self.graph.on_cyclic_core(v) {
            return false;
        }
        if self.graph.pendants(v).ptwos.len() < 2 {
            return false;
        }
        stats.count_reduction(ReductionKind::Trr3);

        let cn = self.graph.cyclic_core_neighbors(v);
        let mut do_not_cross: FxHashSet<VertexId> =
            cn.iter().map(|&e| self.graph.head(e)).collect();

        for &e in &cn {
            // an earlier conversion may already have consumed this edge
            if !self.graph.edge_exists(e) {
                continue;
            }
            let u = self.graph.head(e);
            do_not_cross.remove(&u);
            self.graph.ygraphify(e);
            let s = self.apply_trrs_upwards(stats, u, &do_not_cross);
            sol.extend(s);
        }
        true
    }

    /// Y-graph lookahead at `v`: if keeping the Y forces more deletions at
    /// `v` than the upper bound allows, the Y-edge goes. At equality a
    /// hypothetical cut of everything else decides.
    pub fn y_lookahead_at(
        &mut self,
        stats: &mut Stats,
        sol: &mut Solution,
        v: VertexId,
        upper_bound: i64,
    ) -> bool {
        if self.graph.pendants(v).ygraphs.is_empty() {
            return false;
        }
        let cyc_v_deg = self.graph.degree(v) as i64 - 1;
        if cyc_v_deg < upper_bound {
            return false;
        }
        if cyc_v_deg == upper_bound {
            // keep the Y only if cutting all other edges at v solves
            // everything outright
            let mut probe = self.clone();
            let y_center = probe.graph.head(probe.graph.pendants(v).ygraphs[0]);
            let edges: Vec<EdgeId> = probe.graph.adj(v).collect();
            for e in edges {
                if probe.graph.head(e) != y_center {
                    probe.graph.delete_edge(e);
                }
            }
            probe.trr6();
            if probe.graph.is_empty() {
                return false;
            }
        }
        debug!(
            "Y-lookahead cuts the Y off {} (upper bound {})",
            self.graph.label(v),
            upper_bound
        );
        stats.count_reduction(ReductionKind::YLookahead);
        let ye = self
            .graph
            .pendants_mut(v)
            .ygraphs
            .pop_front()
            .expect("checked above");
        self.delete_edge_into(ye, sol);
        true
    }

    /// The B-bridge branching rule. Picks the B-bridge `uv` splitting the
    /// graph most evenly, solves the smaller side `C2` under four pendant
    /// hypotheses at `v` (nothing, leaf, P2, Y), and commits the variant
    /// that reveals the role of `uv` in an optimal solution. Returns the
    /// partial solution for `C2`, already continued on the remainder, or
    /// `None` if the rule does not apply here.
    pub fn apply_bbridge_rule(
        &mut self,
        stats: &mut Stats,
        opts: &SolvOptions,
        depth: usize,
    ) -> Option<Solution> {
        debug_assert_eq!(self.graph.cc_count, 1);

        let big_fes = self.graph.fes_size();
        if big_fes < BBRIDGE_GLOBAL_FES_THRESHOLD {
            return None;
        }
        let bridges = self.graph.weighted_bbridges();
        if bridges.is_empty() {
            return None;
        }

        // the score of a bridge is the size of the smaller side it cuts off
        let n = self.graph.num_vertices();
        let mut best_score = 0;
        let mut uv = bridges[0].0;
        for &(e, head_side) in &bridges {
            if head_side < n / 2 {
                if head_side > best_score {
                    best_score = head_side;
                    uv = e;
                }
            } else {
                let score = n - head_side;
                if score > best_score {
                    best_score = score;
                    uv = self.graph.twin(e);
                }
            }
        }
        debug!(
            "B-bridge rule picks {} with score {} of {} vertices",
            self.graph.edge_name(uv),
            best_score,
            n
        );

        let u = self.graph.tail(uv);
        let v = self.graph.head(uv);
        let uv_was_permanent = self.graph.is_permanent(uv);
        let u_label = self.graph.label(u).to_owned();

        // split the head side off into its own instance
        self.graph.delete_edge(uv);
        let mut small = CfInstance::new(Graph::new(), self.k);
        let mut map: FxHashMap<VertexId, VertexId> = FxHashMap::default();
        self.graph.copy_component(v, &mut small.graph, &mut map);
        self.graph.delete_component(v);
        let v_small = map[&v];
        let v_label = small.graph.label(v_small).to_owned();

        let fes_small = small.graph.fes_size();
        let fes_rest = big_fes - fes_small;

        // the leaf variant always has a solution and bounds the others
        let s4 = match recurse_for(&small, v_small, PendantShape::Leaf, stats, opts, depth) {
            Some(s) => s,
            None => {
                self.k = -1;
                return None;
            }
        };
        small.k = s4.len() as i64;

        // 1. a strictly better solution without the bridge commits to
        //    deleting uv
        if !uv_was_permanent {
            small.k = s4.len() as i64 - 1;
            if let Some(mut s1) = recurse_for(&small, v_small, PendantShape::Nothing, stats, opts, depth)
            {
                s1.push(SolutionEdge::Named {
                    tail: u_label,
                    head: v_label,
                });
                self.k -= s1.len() as i64;
                stats.record_branching_sizes(
                    crate::branching::BranchType::BBridge,
                    &[fes_small, fes_rest, fes_rest],
                );
                if let Some(rest) = self.run_search(stats, opts, depth + 1) {
                    s1.extend(rest);
                }
                return Some(s1);
            }
            small.k = s4.len() as i64;
        }

        // 2. uv survives; perhaps v's whole neighborhood except uv goes
        let permanent_at_v = small
            .graph
            .adj(v_small)
            .any(|e| small.graph.is_permanent(e));
        if !permanent_at_v {
            if let Some(mut s2) = recurse_for(&small, v_small, PendantShape::Y, stats, opts, depth) {
                self.k -= s2.len() as i64;
                self.graph.add_leaf(u, "");
                stats.record_branching_sizes(
                    crate::branching::BranchType::BBridge,
                    &[fes_small, fes_rest, fes_rest, fes_rest],
                );
                if let Some(rest) = self.run_search(stats, opts, depth + 1) {
                    s2.extend(rest);
                }
                return Some(s2);
            }
        }

        // 3. otherwise v keeps one more edge beyond uv
        stats.record_branching_sizes(
            crate::branching::BranchType::BBridge,
            &[fes_small, fes_rest, fes_rest, fes_rest, fes_rest],
        );
        if let Some(mut s3) = recurse_for(&small, v_small, PendantShape::P2, stats, opts, depth) {
            self.k -= s3.len() as i64;
            self.graph.add_p2(u, "");
            if let Some(rest) = self.run_search(stats, opts, depth + 1) {
                s3.extend(rest);
            }
            return Some(s3);
        }

        // 4. fall back to the unconstrained optimum: v ends the spine, so a
        //    Y-graph dangles at u after deleting it
        let mut s4 = s4;
        self.k -= s4.len() as i64;
        self.graph.add_y(u, "");
        if let Some(rest) = self.run_search(stats, opts, depth + 1) {
            s4.extend(rest);
        }
        Some(s4)
    }
}

/// Solves a copy of `small` with the given pendant shape attached to `v`.
/// Returns the solution only if the copy was solved within its budget.
fn recurse_for(
    small: &CfInstance,
    v: VertexId,
    shape: PendantShape,
    stats: &mut Stats,
    opts: &SolvOptions,
    depth: usize,
) -> Option<Solution> {
    let mut probe = small.clone();
    attach_pendant(&mut probe.graph, v, shape, "");
    probe.run_search(stats, opts, depth + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use std::io::Cursor;

    fn instance(input: &str, k: i64) -> CfInstance {
        let graph = Graph::read_edge_list(Cursor::new(input)).unwrap();
        CfInstance::new(graph, k)
    }

    fn by_label(ins: &CfInstance, label: &str) -> VertexId {
        ins.graph
            .vertices()
            .find(|&v| ins.graph.label(v) == label)
            .unwrap()
    }

    #[test]
    fn gen_free_path_test() {
        let mut ins = instance("a b\nb c\nc d\nd a\nb p\np q\n", 10);
        let mut stats = Stats::new();
        ins.update_pendant_infos(&mut stats);
        let (a, b, c, d) = (
            by_label(&ins, "a"),
            by_label(&ins, "b"),
            by_label(&ins, "c"),
            by_label(&ins, "d"),
        );
        assert!(ins.graph.is_generator(b));
        // the direct edge reaches a just fine
        assert!(exists_gen_free_path(&ins.graph, d, a, c));
        // without it, the only route runs through the generator b
        assert!(!exists_gen_free_path(&ins.graph, d, a, d));
        assert!(!exists_gen_free_path(&ins.graph, c, a, d));
    }

    #[test]
    fn split_rule_test() {
        // two squares joined by a degree-2 chain of B-bridges
        let mut ins = instance(
            "a b\nb c\nc d\nd a\nd x\nx y\ny z\nz e\ne f\nf g\ng h\nh e\n",
            10,
        );
        ins.graph.mark_bridges();
        assert!(ins.apply_split_rule());
        ins.graph.mark_bridges();
        assert_eq!(ins.graph.cc_count, 2);
        // no budget was spent
        assert_eq!(ins.k, 10);
    }

    #[test]
    fn y_lookahead_test() {
        let mut ins = instance("a b\nb c\nc a\n", 10);
        let a = by_label(&ins, "a");
        ins.graph.add_y(a, "");
        let mut stats = Stats::new();
        let mut sol = Solution::new();
        // a keeps degree 3; an upper bound of 1 forbids the Y
        assert!(ins.y_lookahead_at(&mut stats, &mut sol, a, 1));
        assert!(!ins.graph.pendant_is_y(a));
        assert_eq!(sol.len(), 1);
        assert_eq!(ins.k, 9);
    }
}
