//! Path reduction rules: compression and rewriting of the degree-2 paths of
//! the cyclic core.
//!
//! A degree-2 path is a maximal run of core vertices with core degree two.
//! Each path is summarised into a [`PathInfo`] carrying its generators
//! (vertices with P2 pendants), separators, Y-pendant vertices and length;
//! PRR1-8 decide from that summary how to cut or compress the path. Most
//! rules destroy the path they act on and flag the info invalid, at which
//! point control returns to the scan loop.

use std::collections::VecDeque;

use fxhash::{FxHashMap, FxHashSet};
use log::debug;

use crate::bounded_search::SolvOptions;
use crate::cf_instance::{CfInstance, Solution, SolutionEdge};
use crate::global_rules::prr4_gen_applicable;
use crate::graph::{EdgeId, Graph, VertexId};
use crate::kernelization::update_infos_from_child;
use crate::statistics::{ReductionKind, Stats};

/// Summary of one degree-2 path of the cyclic core. `start` and `end` are
/// directed edges into the path's endpoint anchors; a path whose anchors
/// coincide is a cycle. `length` counts the path's edges.
#[derive(Debug, Clone)]
pub struct PathInfo {
    pub start: EdgeId,
    pub end: EdgeId,
    /// Edges pointing to the generators, in path order.
    pub generators: VecDeque<EdgeId>,
    /// Edges pointing to anchor vertices that are themselves generators.
    pub end_generators: Vec<EdgeId>,
    /// Path vertices carrying a Y-pendant, in path order.
    pub pendant_ys: VecDeque<VertexId>,
    pub separators: FxHashSet<VertexId>,
    pub length: usize,
    pub valid: bool,
}

/// Walks the degree-2 path entered through `e`, marking the inner vertices
/// with `mark` and summarising what hangs off them.
pub fn get_path_infos(graph: &mut Graph, e: EdgeId, mark: u32) -> PathInfo {
    let anchor = graph.tail(e);
    let mut info = PathInfo {
        start: e,
        end: e,
        generators: VecDeque::new(),
        end_generators: Vec::new(),
        pendant_ys: VecDeque::new(),
        separators: FxHashSet::default(),
        length: 1,
        valid: false,
    };
    if graph.is_generator(anchor) {
        info.end_generators.push(graph.twin(e));
    }

    let mut next = e;
    loop {
        let v = graph.head(next);
        if graph.cyc_core_degree(v) != 2 || v == anchor {
            break;
        }
        graph.set_mark(v, mark);
        info.length += 1;
        if graph.is_separator(v) {
            info.separators.insert(v);
        }
        if graph.is_generator(v) {
            info.generators.push_back(next);
        }
        if graph.pendant_is_y(v) {
            info.pendant_ys.push_back(v);
        }
        next = graph.next_on_deg2path(next);
    }
    let end_vertex = graph.head(next);
    if graph.is_generator(end_vertex) && end_vertex != anchor {
        info.end_generators.push(next);
    }
    info.end = next;
    info.valid = true;
    info
}

impl PathInfo {
    pub fn is_cycle(&self, graph: &Graph) -> bool {
        graph.tail(self.start) == graph.head(self.end)
    }
}

// Applicability predicates, one per rule.

/// PRR1 applies at `v` if one of `v`'s core neighbors is on the backbone,
/// or continues into an inner vertex without a P2.
fn prr1_applicable(graph: &Graph, v: VertexId) -> bool {
    for &e in &graph.cyclic_core_neighbors(v) {
        let w = graph.head(e);
        if graph.on_backbone(w) {
            return true;
        }
        if graph.degree(w) == 2 {
            if let Some(ue) = graph.first_cyclic_core_neighbor_except(w, v) {
                let u = graph.head(ue);
                if graph.cyc_core_degree(u) == 2 && graph.pendants(u).ptwos.is_empty() {
                    return true;
                }
            }
        }
    }
    false
}

/// PRR2 applies at a core-degree-2 vertex `v` if a neighbor carries a Y, or
/// a plain neighbor continues onto the backbone, or both neighbors are
/// plain inner vertices.
fn prr2_applicable(graph: &Graph, v: VertexId) -> bool {
    let nh = graph.cyclic_core_neighbors(v);
    if nh.len() != 2 {
        return false;
    }
    let mut single_neighbors = 0;
    for &e in &nh {
        let w = graph.head(e);
        if graph.cyc_core_degree(w) == 2 {
            if graph.pendant_is_y(w) {
                return true;
            }
            single_neighbors += 1;
            if let Some(xe) = graph.first_cyclic_core_neighbor_except(w, v) {
                let x = graph.head(xe);
                if graph.cyc_core_degree(x) == 2 && graph.on_backbone(x) {
                    return true;
                }
            }
        }
    }
    single_neighbors == 2
}

fn prr3_applicable(info: &PathInfo) -> bool {
    if !info.generators.is_empty() {
        return false;
    }
    if !info.separators.is_empty() {
        return true;
    }
    info.pendant_ys.is_empty() && info.length == 3
}

fn prr4_applicable(graph: &Graph, info: &PathInfo) -> bool {
    match min_separator(info) {
        Some(x) => prr4_gen_applicable(graph, x),
        None => false,
    }
}

fn prr5_applicable(info: &PathInfo) -> bool {
    info.separators.is_empty() && info.generators.len() > 2
}

fn prr6_applicable(graph: &Graph, info: &PathInfo) -> bool {
    info.is_cycle(graph) && info.generators.len() <= 1
}

fn prr7_applicable(graph: &Graph, info: &PathInfo) -> bool {
    info.is_cycle(graph) && graph.is_generator(graph.tail(info.start))
}

/// The separator sets are unordered; pick the lowest id for determinism.
fn min_separator(info: &PathInfo) -> Option<VertexId> {
    info.separators.iter().copied().min()
}

// Rule bodies.
impl CfInstance {
    /// PRR1: cut the Y-pendant off `v` and discard it, one budget unit.
    fn perform_prr1(&mut self, v: VertexId) -> Solution {
        debug!("PRR1 at {}", self.graph.label(v));
        let mut sol = Solution::new();
        let e = self
            .graph
            .pendants_mut(v)
            .ygraphs
            .pop_front()
            .expect("PRR1 needs a Y-pendant");
        let w = self.graph.head(e);
        self.delete_edge_into(e, &mut sol);
        self.graph.delete_component(w);
        sol
    }

    /// PRR2: remove `v` from its path. On a triangle both of `v`'s core
    /// edges go; otherwise `v` is bypassed with a skip edge and a single
    /// anonymous deletion is charged.
    fn perform_prr2(&mut self, stats: &mut Stats, v: VertexId, info: &mut PathInfo) -> Solution {
        debug!("PRR2 at {}", self.graph.label(v));
        let mut sol = Solution::new();
        let nh = self.graph.cyclic_core_neighbors(v);
        debug_assert_eq!(nh.len(), 2);
        let mut u = self.graph.head(nh[0]);
        let mut w = self.graph.head(nh[1]);

        if self.graph.adjacent(u, w) {
            let path_start = self.graph.tail(info.start);
            self.delete_edges_into(&nh, &mut sol);
            // the lower of the two fell off the core; gnaw from there
            if self.graph.degree(u) - self.graph.subtree_nh(u) == 1 {
                if u != path_start {
                    sol.extend(self.apply_trrs_upwards_until(stats, u, w));
                }
            } else if w != path_start {
                sol.extend(self.apply_trrs_upwards_until(stats, w, u));
            }
        } else {
            sol.push(SolutionEdge::Incident(self.graph.label(v).to_owned()));
            self.k -= 1;

            let update_start = self.graph.head(info.start) == v;
            let update_end = self.graph.tail(info.end) == v;
            if update_start && w == self.graph.tail(info.start) {
                std::mem::swap(&mut u, &mut w);
            }
            if update_end && u == self.graph.head(info.end) {
                std::mem::swap(&mut u, &mut w);
            }

            self.graph.delete_edge(nh[0]);
            self.graph.delete_edge(nh[1]);
            let skip_edge = self.graph.add_edge(u, w);
            if update_start {
                info.start = skip_edge;
            }
            if update_end {
                info.end = skip_edge;
            }

            // the endpoints take over v's role; tag them so the recorded
            // anonymous deletion stays verifiable
            if self.graph.cyc_core_degree(u) == 2 {
                self.graph.append_label(u, "*");
            }
            if self.graph.cyc_core_degree(w) == 2 {
                self.graph.append_label(w, "*");
            }
            for x in [u, w] {
                if self.graph.is_separator(x) {
                    info.separators.insert(x);
                } else {
                    info.separators.remove(&x);
                }
            }
            info.length -= 1;
        }
        info.valid = false;
        self.graph.delete_component(v);
        sol
    }

    /// PRR3: contract a generator-free path down to a short skeleton with
    /// leaves at the endpoints. On a generator-free separator cycle one
    /// edge is deleted instead.
    fn perform_prr3(&mut self, stats: &mut Stats, info: &mut PathInfo, sol: &mut Solution) -> bool {
        debug!("PRR3");
        if info.separators.is_empty() {
            debug_assert_eq!(info.length, 3);
            let u = self.graph.tail(info.start);
            let v = self.graph.head(info.end);
            let mut change = false;
            for x in [u, v] {
                if !self.graph.on_backbone(x) {
                    self.graph.add_leaf(x, "");
                    sol.extend(self.perform_trrs(stats, x));
                    change = true;
                }
            }
            return change;
        }
        if info.is_cycle(&self.graph) {
            // a cycle of separators loses exactly one edge in any solution
            let v = self.graph.head(info.end);
            let x = self.graph.head(info.start);
            self.delete_edge_into(info.start, sol);
            sol.extend(self.apply_trrs_upwards_until(stats, x, v));
            info.valid = false;
            return true;
        }

        let e = info.start;
        let f = self.graph.twin(info.end);
        let u = self.graph.head(e);
        let v = self.graph.head(f);
        let x = self.graph.tail(info.start);
        let y = self.graph.head(info.end);
        // here the path reads  x --e--> u ... v <--f-- y
        let mut change = false;
        if u != v {
            let e2 = self.graph.next_on_deg2path(e);
            self.graph.delete_edge(e2);
            self.graph.delete_edge(f);
            self.graph.delete_component(v);
            let f2 = self.graph.add_edge(u, y);
            if self.graph.pendants(u).leaves.is_empty() {
                self.graph.add_leaf(u, "");
            }
            // the path stays valid with its new length and lone separator
            info.separators.clear();
            info.separators.insert(u);
            info.length = 2;
            info.end = f2;
            change = true;
        }
        for z in [x, y] {
            if !self.graph.on_backbone(z) {
                self.graph.add_leaf(z, "");
                sol.extend(self.perform_trrs(stats, z));
                change = true;
            }
        }
        change
    }

    /// PRR4: split the graph at a separator by duplicating it, then gnaw
    /// both halves of the path back towards the anchor.
    fn perform_prr4(&mut self, stats: &mut Stats, info: &mut PathInfo) -> Solution {
        let x = min_separator(info).expect("PRR4 needs a separator");
        debug!("PRR4 splitting at {}", self.graph.label(x));
        let mut sol = Solution::new();

        let do_not_cross = self.graph.tail(info.start);
        let e = self
            .graph
            .first_cyclic_core_neighbor(x)
            .expect("a separator has core neighbors");
        let w = self.graph.head(e);
        self.graph.delete_edge(e);

        let label = format!("{}'", self.graph.label(x));
        let xprime = self.graph.add_vertex(label);
        self.graph.add_edge(xprime, w);
        copy_pendant(&mut self.graph, x, xprime);

        sol.extend(self.apply_trrs_upwards_until(stats, x, do_not_cross));
        sol.extend(self.apply_trrs_upwards_until(stats, xprime, do_not_cross));
        info.valid = false;
        sol
    }

    /// PRR5: a separator-free path with more than two generators loses an
    /// edge next to every second generator; the count is charged without
    /// naming the edges and the stubs are reconnected with one skip edge.
    fn perform_prr5(&mut self, stats: &mut Stats, info: &mut PathInfo) -> Solution {
        debug!("PRR5 with {} generators", info.generators.len());
        let mut sol = Solution::new();

        // an odd generator count starts deleting before the first
        // generator, an even one behind it
        let first_to_del = if info.generators.len() % 2 == 1 {
            info.generators[0]
        } else {
            self.graph.next_on_deg2path(info.generators[0])
        };
        let last_to_del = *info.generators.back().expect("more than two generators");

        let deletes = (info.generators.len() - 1) / 2;
        self.k -= deletes as i64;
        let first_gen = self.graph.label(self.graph.head(info.generators[0]));
        let last_gen = self.graph.label(self.graph.head(last_to_del));
        for _ in 0..deletes {
            sol.push(SolutionEdge::Between(
                first_gen.to_owned(),
                last_gen.to_owned(),
            ));
        }

        let first_vertex = self.graph.tail(first_to_del);
        let last_vertex = self.graph.head(last_to_del);
        let cut_component = self.graph.head(first_to_del);
        let first_entry = SolutionEdge::named(&self.graph, first_to_del);

        self.graph.delete_edge(first_to_del);
        self.graph.delete_edge(last_to_del);
        self.graph.delete_component(cut_component);
        if self.graph.adjacent(first_vertex, last_vertex) {
            // the reconnection already exists: the path was a cycle, and
            // the leftover 2-cycle costs one more deletion
            sol.push(first_entry);
            self.k -= 1;
            sol.extend(self.apply_trrs_upwards_until(stats, last_vertex, first_vertex));
        } else {
            self.graph.add_edge(first_vertex, last_vertex);
        }
        info.valid = false;
        sol
    }

    /// PRR6: a cycle with at most one generator loses one edge far away
    /// from the generator.
    fn perform_prr6(&mut self, stats: &mut Stats, info: &mut PathInfo) -> Solution {
        debug!("PRR6");
        let mut sol = Solution::new();
        let v = self.graph.head(info.end);
        if !info.separators.is_empty() {
            panic!("PRR6 met a cycle with separators; PRR3 should have fired first");
        }
        let e = if info.generators.is_empty() {
            self.graph.next_on_deg2path(info.start)
        } else {
            let mut e = self.graph.twin(info.generators[0]);
            if self.graph.head(e) != v {
                e = self.graph.next_on_deg2path(e);
            }
            e
        };
        let x = self.graph.tail(e);
        let y = self.graph.head(e);
        self.delete_edge_into(e, &mut sol);
        sol.extend(self.apply_trrs_upwards_until(stats, x, v));
        sol.extend(self.apply_trrs_upwards_until(stats, y, v));
        info.valid = false;
        sol
    }

    /// PRR7: a cycle anchored at a generator loses an edge next to a
    /// generator.
    fn perform_prr7(&mut self, stats: &mut Stats, info: &mut PathInfo) -> Solution {
        debug!("PRR7");
        let mut sol = Solution::new();
        let v = self.graph.head(info.end);
        let e = if self.graph.is_generator(self.graph.head(info.start)) {
            info.start
        } else {
            self.graph.next_on_deg2path(info.start)
        };
        let x = self.graph.head(e);
        let y = self.graph.tail(e);
        self.delete_edge_into(e, &mut sol);
        sol.extend(self.apply_trrs_upwards_until(stats, x, v));
        sol.extend(self.apply_trrs_upwards_until(stats, y, v));
        info.valid = false;
        sol
    }
}

// Overhead: budget gating and re-run control per rule.
impl CfInstance {
    fn budget_exceeded(&mut self, info: &mut PathInfo) {
        self.k = -1;
        info.valid = false;
    }

    fn prr12_from_infos(
        &mut self,
        stats: &mut Stats,
        info: &mut PathInfo,
        sol: &mut Solution,
    ) -> bool {
        let mut change = false;
        while info.valid && !info.pendant_ys.is_empty() {
            let v = info.pendant_ys[0];
            // both PRR1 and PRR2 need at least one edge deletion
            if prr1_applicable(&self.graph, v) {
                change = true;
                if self.k <= 0 {
                    self.budget_exceeded(info);
                    return false;
                }
                stats.count_reduction(ReductionKind::Prr1);
                info.pendant_ys.pop_front();
                sol.extend(self.perform_prr1(v));
            } else if prr2_applicable(&self.graph, v) {
                change = true;
                if self.k <= 0 {
                    self.budget_exceeded(info);
                    return false;
                }
                stats.count_reduction(ReductionKind::Prr2);
                info.pendant_ys.pop_front();
                sol.extend(self.perform_prr2(stats, v, info));
            } else {
                // a short path carrying just a Y-graph: nothing to do here
                break;
            }
        }
        change
    }

    fn prr3_from_infos(
        &mut self,
        stats: &mut Stats,
        info: &mut PathInfo,
        sol: &mut Solution,
    ) -> bool {
        if prr3_applicable(info) {
            stats.count_reduction(ReductionKind::Prr3);
            self.perform_prr3(stats, info, sol)
        } else {
            false
        }
    }

    fn prr4_from_infos(
        &mut self,
        stats: &mut Stats,
        info: &mut PathInfo,
        sol: &mut Solution,
    ) -> bool {
        if prr4_applicable(&self.graph, info) {
            if self.k <= 0 {
                self.budget_exceeded(info);
                return false;
            }
            stats.count_reduction(ReductionKind::Prr4);
            let s = self.perform_prr4(stats, info);
            sol.extend(s);
            true
        } else {
            false
        }
    }

    fn prr5_from_infos(
        &mut self,
        stats: &mut Stats,
        info: &mut PathInfo,
        sol: &mut Solution,
    ) -> bool {
        if prr5_applicable(info) {
            if self.k <= 0 {
                self.budget_exceeded(info);
                return false;
            }
            stats.count_reduction(ReductionKind::Prr5);
            let s = self.perform_prr5(stats, info);
            sol.extend(s);
            true
        } else {
            false
        }
    }

    fn prr6_from_infos(
        &mut self,
        stats: &mut Stats,
        info: &mut PathInfo,
        sol: &mut Solution,
    ) -> bool {
        if prr6_applicable(&self.graph, info) {
            if self.k <= 0 {
                self.budget_exceeded(info);
                return false;
            }
            stats.count_reduction(ReductionKind::Prr6);
            let s = self.perform_prr6(stats, info);
            sol.extend(s);
            true
        } else {
            false
        }
    }

    fn prr7_from_infos(
        &mut self,
        stats: &mut Stats,
        info: &mut PathInfo,
        sol: &mut Solution,
    ) -> bool {
        if prr7_applicable(&self.graph, info) {
            if self.k <= 0 {
                self.budget_exceeded(info);
                return false;
            }
            stats.count_reduction(ReductionKind::Prr7);
            let s = self.perform_prr7(stats, info);
            sol.extend(s);
            true
        } else {
            false
        }
    }

    /// Runs PRR1-7 against one path, stopping as soon as the path is
    /// destroyed.
    fn act_on_path_info(
        &mut self,
        stats: &mut Stats,
        info: &mut PathInfo,
        sol: &mut Solution,
    ) -> bool {
        let mut change = self.prr12_from_infos(stats, info, sol);
        if !info.valid {
            return change;
        }
        change |= self.prr3_from_infos(stats, info, sol);
        if !info.valid {
            return change;
        }
        change |= self.prr4_from_infos(stats, info, sol);
        if !info.valid {
            return change;
        }
        change |= self.prr5_from_infos(stats, info, sol);
        if !info.valid {
            return change;
        }
        change |= self.prr6_from_infos(stats, info, sol);
        if !info.valid {
            return change;
        }
        change |= self.prr7_from_infos(stats, info, sol);
        change
    }

    /// PRR8: when two generator-free paths share both anchors, delete the
    /// second edge of the less structured one. The tie-break order is
    /// pendant-Ys, then separators, then backbone-attached endpoints.
    fn apply_prr8(
        &mut self,
        stats: &mut Stats,
        sol: &mut Solution,
        path: &PathInfo,
        paths: &mut FxHashMap<VertexId, PathInfo>,
    ) -> bool {
        if !path.generators.is_empty() {
            return false;
        }
        let v = self.graph.head(path.end);
        let old = match paths.get(&v) {
            Some(old) => old.clone(),
            None => {
                paths.insert(v, path.clone());
                return false;
            }
        };
        // neither path has generators from here on
        if !old.pendant_ys.is_empty() {
            return self.prr8_delete_second_edge(stats, sol, &old, false);
        }
        if !path.pendant_ys.is_empty() {
            return self.prr8_delete_second_edge(stats, sol, path, false);
        }
        if path.separators.is_empty() || old.separators.is_empty() {
            if !path.separators.is_empty() {
                return self.prr8_delete_second_edge(stats, sol, &old, false);
            }
            if !old.separators.is_empty() {
                return self.prr8_delete_second_edge(stats, sol, path, false);
            }
            // two all-singleton paths: cut away from a backbone endpoint
            if self.graph.on_backbone(self.graph.tail(path.start)) {
                return self.prr8_delete_second_edge(stats, sol, path, false);
            }
            if self.graph.on_backbone(self.graph.head(path.end)) {
                return self.prr8_delete_second_edge(stats, sol, path, path.length < 3);
            }
        }
        false
    }

    fn prr8_delete_second_edge(
        &mut self,
        stats: &mut Stats,
        sol: &mut Solution,
        doomed: &PathInfo,
        delete_first_edge: bool,
    ) -> bool {
        let mut e = doomed.start;
        if !delete_first_edge && doomed.length > 1 {
            e = self.graph.next_on_deg2path(e);
        }
        let anchor = self.graph.tail(doomed.start);
        let x = self.graph.head(e);
        let y = self.graph.tail(e);

        stats.count_reduction(ReductionKind::Prr8);
        self.delete_edge_into(e, sol);
        sol.extend(self.apply_trrs_upwards_until(stats, x, anchor));
        sol.extend(self.apply_trrs_upwards_until(stats, y, anchor));
        true
    }

    /// Discovers and processes every degree-2 path leaving `v`. Returns
    /// whether the graph changed; surviving paths are appended to `infos`.
    fn apply_prrs_to_vertex(
        &mut self,
        stats: &mut Stats,
        sol: &mut Solution,
        infos: &mut Vec<PathInfo>,
        v: VertexId,
        mark: u32,
    ) -> bool {
        if self.trr3_gen(stats, v, sol) {
            return true;
        }

        // PRR8 needs to see the paths that end at the same anchor
        let mut paths: FxHashMap<VertexId, PathInfo> = FxHashMap::default();
        self.graph.set_mark(v, mark);

        let mut change = false;
        let mut path_via = find_first_path(&self.graph, v, mark);
        while let Some(via) = path_via {
            let mut info = get_path_infos(&mut self.graph, via, mark);
            // advance before acting; the rules may destroy this path
            path_via = find_next_path(&self.graph, &info, mark);
            let acted = self.act_on_path_info(stats, &mut info, sol);
            change |= acted;
            if info.valid {
                if self.apply_prr8(stats, sol, &info, &mut paths) {
                    return true;
                }
                infos.push(info.clone());
            } else if acted {
                // the path is gone and the graph changed shape; restart the
                // scan instead of walking stale edges
                return true;
            }
            if self.graph.cyc_core_degree(v) < 3 {
                break;
            }
        }
        change
    }

    /// Like [`apply_prrs_to_vertex`], but follows up with TRRs from `v` in
    /// case all of `v`'s paths were cut.
    fn apply_prrs_and_trrs_to_vertex(
        &mut self,
        stats: &mut Stats,
        sol: &mut Solution,
        infos: &mut Vec<PathInfo>,
        v: VertexId,
        mark: u32,
    ) -> bool {
        if self.apply_prrs_to_vertex(stats, sol, infos, v, mark) {
            let s = self.apply_trrs_upwards_free(stats, v);
            sol.extend(s);
            true
        } else {
            false
        }
    }

    /// Exhaustively applies the path reduction rules, collecting the
    /// surviving degree-2 paths for the path branching rules.
    pub fn apply_prrs(
        &mut self,
        opts: &SolvOptions,
        stats: &mut Stats,
        infos: &mut Vec<PathInfo>,
    ) -> Solution {
        let mut sol = self.update_pendant_infos(stats);
        loop {
            // old path summaries point into a graph that no longer exists
            infos.clear();

            let mut has_cyc_deg3 = false;
            let mut has_cyc_deg2 = false;
            let mut change = false;
            let mark = self.graph.next_mark();

            let verts: Vec<VertexId> = self.graph.vertices().collect();
            for v in verts {
                if !self.graph.contains_vertex(v) {
                    continue;
                }
                if self.graph.cyc_core_degree(v) > 2 {
                    has_cyc_deg3 = true;
                    let mut v_infos = Vec::new();
                    if self.graph.pendant_is_y(v)
                        && prr1_applicable(&self.graph, v)
                        && self.k > 0
                    {
                        stats.count_reduction(ReductionKind::Prr1);
                        let s = self.perform_prr1(v);
                        sol.extend(s);
                        change = true;
                    }
                    if self.apply_prrs_and_trrs_to_vertex(stats, &mut sol, &mut v_infos, v, mark) {
                        change = true;
                    } else {
                        if self.graph.num_vertices() < opts.max_size_for_y_lookahead {
                            let bound = self.k;
                            self.y_lookahead_at(stats, &mut sol, v, bound);
                        }
                        infos.append(&mut v_infos);
                    }
                } else if self.graph.cyc_core_degree(v) == 2 {
                    has_cyc_deg2 = true;
                }
            }

            if !change && !has_cyc_deg3 {
                // degenerate leftovers: the core is a union of plain cycles
                if has_cyc_deg2 {
                    let verts: Vec<VertexId> = self.graph.vertices().collect();
                    for v in verts {
                        if !self.graph.contains_vertex(v) || !self.graph.on_cyclic_core(v) {
                            continue;
                        }
                        let cycle_mark = self.graph.next_mark();
                        if self.apply_prrs_and_trrs_to_vertex(
                            stats, &mut sol, infos, v, cycle_mark,
                        ) {
                            change = true;
                            break;
                        }
                    }
                }
                change |= self.trr6();
            }

            if !(change && self.k > 0 && !self.graph.is_empty()) {
                break;
            }
        }
        // a budget that ran out exactly may leave finished caterpillars
        if self.k == 0 {
            self.trr6();
        }
        sol
    }
}

fn find_first_path(graph: &Graph, v: VertexId, mark: u32) -> Option<EdgeId> {
    graph
        .adj(v)
        .find(|&e| graph.on_cyclic_core(graph.head(e)) && graph.mark(graph.head(e)) != mark)
}

/// The next unexplored path around the tail of `info.start`, skipping
/// already-marked entries and the back door through `info.end`.
fn find_next_path(graph: &Graph, info: &PathInfo, mark: u32) -> Option<EdgeId> {
    let mut cur = graph.next_edge(info.start);
    while let Some(e) = cur {
        let head = graph.head(e);
        if graph.mark(head) != mark
            && graph.on_cyclic_core(head)
            && e != graph.twin(info.end)
        {
            return Some(e);
        }
        cur = graph.next_edge(e);
    }
    None
}

// Pendant copying for PRR4.

fn copy_leaf(graph: &mut Graph, v: VertexId, leaf: VertexId) {
    let label = format!("{}'", graph.label(leaf));
    let new_leaf = graph.add_vertex(label);
    let mark = graph.mark(leaf);
    graph.set_mark(new_leaf, mark);
    let to_v = graph.add_edge(new_leaf, v);
    update_infos_from_child(graph, to_v);
}

fn copy_p2(graph: &mut Graph, v: VertexId, center: VertexId) {
    let label = format!("{}'", graph.label(center));
    let new_center = graph.add_vertex(label);
    let mark = graph.mark(center);
    graph.set_mark(new_center, mark);
    let leaves: Vec<VertexId> = graph
        .pendants(center)
        .leaves
        .iter()
        .map(|&e| graph.head(e))
        .collect();
    for leaf in leaves {
        copy_leaf(graph, new_center, leaf);
    }
    let to_v = graph.add_edge(new_center, v);
    update_infos_from_child(graph, to_v);
}

fn copy_y(graph: &mut Graph, v: VertexId, center: VertexId) {
    let label = format!("{}'", graph.label(center));
    let new_center = graph.add_vertex(label);
    let mark = graph.mark(center);
    graph.set_mark(new_center, mark);
    let leaves: Vec<VertexId> = graph
        .pendants(center)
        .leaves
        .iter()
        .map(|&e| graph.head(e))
        .collect();
    for leaf in leaves {
        copy_leaf(graph, new_center, leaf);
    }
    let ptwos: Vec<VertexId> = graph
        .pendants(center)
        .ptwos
        .iter()
        .map(|&e| graph.head(e))
        .collect();
    for center2 in ptwos {
        copy_p2(graph, new_center, center2);
    }
    let to_v = graph.add_edge(new_center, v);
    update_infos_from_child(graph, to_v);
}

/// Copies `v`'s complete pendant tree onto `vprime`, marks included.
fn copy_pendant(graph: &mut Graph, v: VertexId, vprime: VertexId) {
    let leaves: Vec<VertexId> = graph
        .pendants(v)
        .leaves
        .iter()
        .map(|&e| graph.head(e))
        .collect();
    for leaf in leaves {
        copy_leaf(graph, vprime, leaf);
    }
    let ptwos: Vec<VertexId> = graph
        .pendants(v)
        .ptwos
        .iter()
        .map(|&e| graph.head(e))
        .collect();
    for center in ptwos {
        copy_p2(graph, vprime, center);
    }
    let ys: Vec<VertexId> = graph
        .pendants(v)
        .ygraphs
        .iter()
        .map(|&e| graph.head(e))
        .collect();
    for center in ys {
        copy_y(graph, vprime, center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounded_search::SolvOptions;
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
    fn path_info_on_cycle_test() {
        // two triangles glued at h
        let mut ins = instance("h a\na b\nb h\nh c\nc d\nd h\n", 10);
        let mut stats = Stats::new();
        ins.update_pendant_infos(&mut stats);
        let h = by_label(&ins, "h");
        assert_eq!(ins.graph.cyc_core_degree(h), 4);
        let mark = ins.graph.next_mark();
        let via = ins.graph.first_cyclic_core_neighbor(h).unwrap();
        let info = get_path_infos(&mut ins.graph, via, mark);
        assert!(info.valid);
        assert!(info.is_cycle(&ins.graph));
        assert_eq!(info.length, 3);
        assert!(info.generators.is_empty());
        assert!(info.separators.is_empty());
    }

    #[test]
    fn prr6_cuts_plain_cycles_test() {
        let mut ins = instance("h a\na b\nb h\nh c\nc d\nd h\n", 10);
        let mut stats = Stats::new();
        let mut infos = Vec::new();
        let sol = ins.apply_prrs(&SolvOptions::default(), &mut stats, &mut infos);
        // each triangle costs one deletion, the rest reduces away
        assert!(ins.graph.is_empty());
        assert_eq!(sol.len(), 2);
        assert_eq!(ins.k, 8);
    }

    #[test]
    fn trr3_gen_conversion_test() {
        // a triangle whose corner a carries two P2 pendants
        let mut ins = instance("a b\nb c\nc a\na p1\np1 p2\na q1\nq1 q2\n", 10);
        let mut stats = Stats::new();
        let mut infos = Vec::new();
        let sol = ins.apply_prrs(&SolvOptions::default(), &mut stats, &mut infos);
        // deleting the triangle edge opposite to a turns both far corners
        // into leaves of a's spine, so one deletion suffices
        assert!(ins.graph.is_empty());
        assert_eq!(sol.len(), 1);
        assert_eq!(ins.k, 9);
    }

    #[test]
    fn squares_over_bridge_test() {
        // two squares joined by a bridge reduce without branching
        let mut ins = instance(
            "a b\nb c\nc d\nd a\ne f\nf g\ng h\nh e\nd e\n",
            10,
        );
        let mut stats = Stats::new();
        let mut infos = Vec::new();
        ins.apply_prrs(&SolvOptions::default(), &mut stats, &mut infos);
        assert!(ins.graph.is_empty());
        assert_eq!(ins.k, 8);
    }
}
