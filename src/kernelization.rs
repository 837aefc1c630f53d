//! Pendant classification and the tree reduction rules.
//!
//! The classifier folds the acyclic fringe bottom-up: once a subtree rooted
//! at a vertex is fully classified, the vertex registers itself in its
//! parent's pendant lists as a leaf, a P2, a Y-graph or a 2-claw. The tree
//! reduction rules run opportunistically at every vertex the fold reaches:
//! * TRR1 deletes redundant pendant leaves (free).
//! * TRR2 cuts redundant Y-pendants (one budget unit each).
//! * TRR3 cuts all but two P2-pendants (one budget unit each).
//! * TRR4 collapses a lone P2 below the core into a leaf (free).
//! * TRR5 cuts 2-claw pendants (one budget unit each).
//! * TRR6 removes whole components that already are caterpillars (free).

use fxhash::FxHashSet;
use log::debug;

use crate::cf_instance::{CfInstance, Solution, SolutionEdge};
use crate::graph::{EdgeId, Graph, VertexId};
use crate::statistics::{ReductionKind, Stats};

/// Registers a fully classified subtree with its parent. `e` points from
/// the child towards the parent. Leaf and P2 connection edges become
/// permanent here; they survive in every optimal solution of the fringe.
pub fn update_infos_from_child(graph: &mut Graph, e: EdgeId) {
    let to_child = graph.twin(e);
    let child = graph.tail(e);
    let parent = graph.head(e);

    // newest registrations go to the front, so trimming rules eat the
    // youngest pendant first and never a survivor of an earlier split
    graph.set_parent(child, e);
    match graph.degree(child) {
        1 => {
            graph.pendants_mut(parent).leaves.push_front(to_child);
            graph.mark_permanent(to_child);
        }
        2 => {
            if !graph.pendants(child).ygraphs.is_empty() {
                graph.pendants_mut(parent).tclaws.push_front(to_child);
            } else if !graph.pendants(child).leaves.is_empty() {
                graph.pendants_mut(parent).ptwos.push_front(to_child);
                graph.mark_permanent(to_child);
            } else {
                panic!(
                    "classifier saw degree-2 vertex {} with neither Y nor leaf; TRRs not applied?",
                    graph.label(child)
                );
            }
        }
        _ => {
            if graph.pendants(child).ptwos.len() > 1 {
                graph.pendants_mut(parent).ygraphs.push_front(to_child);
            } else {
                panic!(
                    "classifier saw degree>2 vertex {} without two P2s; TRRs not applied?",
                    graph.label(child)
                );
            }
        }
    }
}

// Pendant gadget construction. All of these keep the classification of the
// attachment vertex current.
impl Graph {
    fn pendant_name(&self, v: VertexId, name: &str) -> String {
        let base = if name.is_empty() { self.label(v) } else { name };
        format!("{}~", base)
    }

    /// Attaches a fresh pendant leaf to `v`.
    pub fn add_leaf(&mut self, v: VertexId, name: &str) {
        let label = self.pendant_name(v, name);
        let w = self.add_vertex(label);
        let e = self.add_edge(w, v);
        update_infos_from_child(self, e);
    }

    /// Attaches a fresh P2 pendant (a path of two edges) to `v`.
    pub fn add_p2(&mut self, v: VertexId, name: &str) {
        let label = self.pendant_name(v, name);
        let w = self.add_vertex(label.clone());
        let e = self.add_edge(w, v);
        self.add_leaf(w, &label);
        update_infos_from_child(self, e);
    }

    pub fn add_2p2(&mut self, v: VertexId, name: &str) {
        let base = if name.is_empty() {
            self.label(v).to_owned()
        } else {
            name.to_owned()
        };
        self.add_p2(v, &base);
        self.add_p2(v, &format!("{}~~~", base));
    }

    /// Attaches a fresh Y-graph (a junction with two P2s) to `v`.
    pub fn add_y(&mut self, v: VertexId, name: &str) {
        let label = self.pendant_name(v, name);
        let w = self.add_vertex(label.clone());
        let e = self.add_edge(w, v);
        self.add_2p2(w, &label);
        update_infos_from_child(self, e);
    }

    /// Replaces the edge `e` by a fresh Y-pendant at its head. The tail
    /// keeps a primed copy of its name so solutions stay readable.
    pub fn ygraphify(&mut self, e: EdgeId) {
        let v = self.head(e);
        let u = self.tail(e);
        let name = self.label(u).to_owned();
        self.delete_edge(e);
        self.add_y(v, &name);
        self.append_label(u, "'");
    }
}

/// Pendant shapes the B-bridge rule hangs onto a cut vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendantShape {
    Nothing,
    Leaf,
    P2,
    Y,
}

pub fn attach_pendant(graph: &mut Graph, v: VertexId, shape: PendantShape, name: &str) {
    match shape {
        PendantShape::Nothing => {}
        PendantShape::Leaf => graph.add_leaf(v, name),
        PendantShape::P2 => graph.add_p2(v, name),
        PendantShape::Y => graph.add_y(v, name),
    }
}

impl CfInstance {
    /// Rebuilds the pendant classification of every vertex with a
    /// leaves-to-core work-queue pass, applying the tree reduction rules at
    /// every vertex reached. No-op while the classification is fresh.
    pub fn update_pendant_infos(&mut self, stats: &mut Stats) -> Solution {
        let mut sol = Solution::new();
        if self.graph.pendants_fresh {
            return sol;
        }
        debug!("reclassifying pendant subtrees");

        let mut queue: std::collections::VecDeque<VertexId> = Default::default();
        let verts: Vec<VertexId> = self.graph.vertices().collect();
        for v in verts {
            self.graph.invalidate_parent(v);
            self.graph.pendants_mut(v).clear();
            if self.graph.degree(v) == 1 && !self.graph.protected(v) {
                queue.push_back(v);
            }
        }

        let mark = self.graph.next_mark();
        while let Some(v) = queue.pop_front() {
            // reductions below may have consumed queued vertices
            if !self.graph.contains_vertex(v) {
                continue;
            }
            self.graph.set_mark(v, mark);
            sol.extend(self.perform_trrs(stats, v));
            if !self.graph.contains_vertex(v) {
                continue;
            }

            // the parent is the only neighbor whose subtree is not done yet
            let to_parent = self
                .graph
                .adj(v)
                .find(|&e| self.graph.mark(self.graph.head(e)) != mark);
            if let Some(e) = to_parent {
                let parent = self.graph.head(e);
                update_infos_from_child(&mut self.graph, e);
                if self.graph.degree(parent) <= self.graph.subtree_nh(parent) + 1 {
                    queue.push_back(parent);
                }
            }
        }

        // the queue never reaches the cyclic core, so sweep it separately
        let verts: Vec<VertexId> = self.graph.vertices().collect();
        for v in verts {
            if self.graph.contains_vertex(v) && self.graph.on_cyclic_core(v) {
                sol.extend(self.perform_trrs(stats, v));
            }
        }

        self.graph.pendants_fresh = true;
        sol
    }

    /// Applies TRR1-5 at `v` to a fixed point. Assumes `v`'s pendant lists
    /// are current.
    pub fn perform_trrs(&mut self, stats: &mut Stats, v: VertexId) -> Solution {
        if self.graph.pendants(v).is_empty() {
            return Solution::new();
        }
        let mut sol = Solution::new();
        loop {
            let before = sol.len();
            self.trr1_and_4(stats, v);
            sol.extend(self.trr2(stats, v));
            sol.extend(self.trr3(stats, v));
            sol.extend(self.trr5(stats, v));
            if sol.len() == before {
                break;
            }
        }
        sol
    }

    /// TRR4 folds a lone P2 below the core into a leaf, then TRR1 deletes
    /// every redundant leaf. Both are free of budget.
    fn trr1_and_4(&mut self, stats: &mut Stats, v: VertexId) -> bool {
        let mut result = false;

        let lone_p2 = self.graph.pendants(v).ptwos.len() == 1
            && self.graph.pendants(v).ygraphs.is_empty()
            && self.graph.pendants(v).tclaws.is_empty()
            && !self.graph.on_cyclic_core(v);
        if lone_p2 {
            stats.count_reduction(ReductionKind::Trr4);
            let to_middle = *self.graph.pendants(v).ptwos.front().expect("one P2");
            let middle = self.graph.head(to_middle);
            let leaf_edge = *self
                .graph
                .pendants(middle)
                .leaves
                .front()
                .expect("a P2 centre has its leaf registered");
            let leaf = self.graph.head(leaf_edge);
            self.graph.delete_vertex(leaf);
            self.graph.pendants_mut(middle).leaves.clear();
            // the former centre is a pendant leaf of v now
            let pendants = self.graph.pendants_mut(v);
            pendants.ptwos.pop_front();
            pendants.leaves.push_back(to_middle);
            result = true;
        }

        let num_leaves = self.graph.pendants(v).leaves.len();
        let has_ptwos = !self.graph.pendants(v).ptwos.is_empty();
        if num_leaves > 1 || (has_ptwos && num_leaves >= 1) {
            stats.count_reduction(ReductionKind::Trr1);
            let mut keep = None;
            if !has_ptwos {
                // keep the lowest-id leaf for determinism
                keep = self
                    .graph
                    .pendants(v)
                    .leaves
                    .iter()
                    .copied()
                    .min_by_key(|&e| self.graph.head(e));
            }
            let doomed: Vec<EdgeId> = self
                .graph
                .pendants(v)
                .leaves
                .iter()
                .copied()
                .filter(|&e| Some(e) != keep)
                .collect();
            let pendants = self.graph.pendants_mut(v);
            pendants.leaves.retain(|&e| Some(e) == keep);
            for e in doomed {
                let leaf = self.graph.head(e);
                self.graph.delete_vertex(leaf);
            }
            debug!("TRR1 cleared the leaves of {}", self.graph.label(v));
            result = true;
        }
        result
    }

    /// While `v` has a Y-pendant next to any other pendant (or next to a
    /// permanent core edge), cut the Y off and charge the budget.
    fn trr2(&mut self, stats: &mut Stats, v: VertexId) -> Solution {
        let mut sol = Solution::new();
        let leaves_and_ptwos =
            self.graph.pendants(v).leaves.len() + self.graph.pendants(v).ptwos.len();

        let mut has_permanent = false;
        if self.graph.on_cyclic_core(v) {
            has_permanent = self
                .graph
                .cyclic_core_neighbors(v)
                .iter()
                .any(|&e| self.graph.is_permanent(e));
        }

        let mut cut_off = Vec::new();
        while !self.graph.pendants(v).ygraphs.is_empty()
            && (self.graph.pendants(v).ygraphs.len() + leaves_and_ptwos > 1 || has_permanent)
        {
            stats.count_reduction(ReductionKind::Trr2);
            let e = self
                .graph
                .pendants_mut(v)
                .ygraphs
                .pop_front()
                .expect("loop guard");
            cut_off.push(self.graph.head(e));
            self.delete_edge_into(e, &mut sol);
        }
        for w in cut_off {
            self.graph.delete_component(w);
        }
        sol
    }

    /// While `v` has more than two P2-pendants, cut one off and charge the
    /// budget. The deleted edge is anonymous: after path splits the concrete
    /// choice may differ, so the entry only commits to "an edge at v".
    fn trr3(&mut self, stats: &mut Stats, v: VertexId) -> Solution {
        let mut sol = Solution::new();
        let mut cut_off = Vec::new();
        while self.graph.pendants(v).ptwos.len() > 2 {
            stats.count_reduction(ReductionKind::Trr3);
            let e = self
                .graph
                .pendants_mut(v)
                .ptwos
                .pop_front()
                .expect("loop guard");
            cut_off.push(self.graph.head(e));
            self.graph.delete_edge(e);
            self.k -= 1;
            sol.push(SolutionEdge::Incident(self.graph.label(v).to_owned()));
        }
        for w in cut_off {
            self.graph.delete_component(w);
        }
        sol
    }

    /// Cuts a 2-claw pendant off `v` and charges the budget. The cut can
    /// enable TRR4 at `v`, so the TRRs re-run afterwards.
    fn trr5(&mut self, stats: &mut Stats, v: VertexId) -> Solution {
        let mut sol = Solution::new();
        if let Some(&tc) = self.graph.pendants(v).tclaws.front() {
            stats.count_reduction(ReductionKind::Trr5);
            let w = self.graph.head(tc);
            self.graph.pendants_mut(v).tclaws.pop_front();
            self.delete_edge_into(tc, &mut sol);
            self.graph.delete_component(w);
            sol.extend(self.perform_trrs(stats, v));
        }
        sol
    }

    /// TRR6: deletes every connected component that already is a
    /// caterpillar, meaning a tree without protected vertices in which no
    /// vertex has more than two non-leaf neighbors. Components without a
    /// low-degree entry vertex contain a cycle and are skipped outright.
    pub fn trr6(&mut self) -> bool {
        let mut result = false;
        let mark = self.graph.next_mark();
        let seeds: Vec<VertexId> = self
            .graph
            .vertices()
            .filter(|&v| self.graph.degree(v) <= 1)
            .collect();

        for seed in seeds {
            if !self.graph.contains_vertex(seed) || self.graph.mark(seed) == mark {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = std::collections::VecDeque::new();
            queue.push_back(seed);
            self.graph.set_mark(seed, mark);
            while let Some(u) = queue.pop_front() {
                component.push(u);
                let neighbors: Vec<VertexId> = self.graph.neighbors(u).collect();
                for w in neighbors {
                    if self.graph.mark(w) != mark {
                        self.graph.set_mark(w, mark);
                        queue.push_back(w);
                    }
                }
            }
            let degree_sum: usize = component.iter().map(|&u| self.graph.degree(u)).sum();
            let is_tree = degree_sum / 2 + 1 == component.len();
            let clean = component
                .iter()
                .all(|&u| self.graph.nldeg(u) <= 2 && !self.graph.protected(u));
            if is_tree && clean {
                self.graph.delete_component(seed);
                result = true;
            }
        }
        debug!(
            "TRR6 done, {} vertices and {} edges left",
            self.graph.num_vertices(),
            self.graph.num_edges()
        );
        result
    }

    /// Walks from `v` towards the cyclic core after a cut threw `v` out of
    /// it, applying TRRs and re-registering each finished subtree with its
    /// parent. Stops at `do_not_cross` vertices, protected vertices, the
    /// core, and tree roots.
    pub fn apply_trrs_upwards(
        &mut self,
        stats: &mut Stats,
        mut v: VertexId,
        do_not_cross: &FxHashSet<VertexId>,
    ) -> Solution {
        let mut sol = Solution::new();
        loop {
            if !self.graph.contains_vertex(v) {
                return sol;
            }
            sol.extend(self.perform_trrs(stats, v));
            if do_not_cross.contains(&v) {
                return sol;
            }
            if self.graph.protected(v) {
                return sol;
            }
            if self.graph.degree(v) - self.graph.subtree_nh(v) != 1 {
                return sol;
            }
            let to_parent = match self.graph.get_parent(v) {
                Some(e) => e,
                None => return sol,
            };
            update_infos_from_child(&mut self.graph, to_parent);
            v = self.graph.head(to_parent);
        }
    }

    pub fn apply_trrs_upwards_until(
        &mut self,
        stats: &mut Stats,
        v: VertexId,
        stop: VertexId,
    ) -> Solution {
        let mut do_not_cross = FxHashSet::default();
        do_not_cross.insert(stop);
        self.apply_trrs_upwards(stats, v, &do_not_cross)
    }

    pub fn apply_trrs_upwards_free(&mut self, stats: &mut Stats, v: VertexId) -> Solution {
        self.apply_trrs_upwards(stats, v, &FxHashSet::default())
    }

    /// Applies all tree reduction rules to the whole graph.
    pub fn apply_trrs(&mut self, stats: &mut Stats) -> Solution {
        let sol = self.update_pendant_infos(stats);
        if self.trr6() {
            stats.count_reduction(ReductionKind::Trr6);
        }
        sol
    }
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

    #[test]
    fn classification_test() {
        // triangle with a leaf and a P2 at vertex a
        let mut ins = instance("a b\nb c\nc a\na l\na p1\np1 p2\n", 10);
        let mut stats = Stats::new();
        let sol = ins.apply_trrs(&mut stats);
        // TRR1 deletes the lone leaf because a P2 is present; no charge
        assert!(sol.is_empty());
        assert_eq!(ins.k, 10);
        let a = ins.graph.vertices().find(|&v| ins.graph.label(v) == "a").unwrap();
        assert_eq!(ins.graph.pendants(a).ptwos.len(), 1);
        assert!(ins.graph.pendants(a).leaves.is_empty());
        assert_eq!(ins.graph.subtree_nh(a), 1);
        assert_eq!(ins.graph.cyc_core_degree(a), 2);
        assert!(ins.graph.is_generator(a));
        assert!(ins.graph.on_backbone(a));
        // the P2 connection is committed
        let p1 = ins.graph.vertices().find(|&v| ins.graph.label(v) == "p1").unwrap();
        let e = ins.graph.find_edge(a, p1).unwrap();
        assert!(ins.graph.is_permanent(e));
        // b sits on the core next to a generator, so it separates nothing
        let b = ins.graph.vertices().find(|&v| ins.graph.label(v) == "b").unwrap();
        assert_eq!(ins.graph.cyc_core_degree(b), 2);
        assert!(!ins.graph.is_separator(b));
    }

    #[test]
    fn trr1_keeps_one_leaf_test() {
        let mut ins = instance("a b\nb c\nc a\na l1\na l2\na l3\n", 10);
        let mut stats = Stats::new();
        let sol = ins.apply_trrs(&mut stats);
        assert!(sol.is_empty());
        let a = ins.graph.vertices().find(|&v| ins.graph.label(v) == "a").unwrap();
        assert_eq!(ins.graph.pendants(a).leaves.len(), 1);
        assert_eq!(ins.graph.degree(a), 3);
    }

    #[test]
    fn trr2_cuts_redundant_ygraphs_test() {
        let graph = Graph::read_edge_list(Cursor::new("a b\nb c\nc a\n")).unwrap();
        let mut ins = CfInstance::new(graph, 10);
        let a = ins.graph.vertices().find(|&v| ins.graph.label(v) == "a").unwrap();
        ins.graph.add_y(a, "");
        ins.graph.add_y(a, "other");
        let mut stats = Stats::new();
        let sol = ins.apply_trrs(&mut stats);
        assert_eq!(sol.len(), 1);
        assert_eq!(ins.k, 9);
        assert_eq!(ins.graph.pendants(a).ygraphs.len(), 1);
    }

    #[test]
    fn trr3_cuts_redundant_ptwos_test() {
        // a tree: four P2 legs at one centre
        let mut ins = instance("c x\nx x'\nc y\ny y'\nc z\nz z'\nc w\nw w'\n", 10);
        let mut stats = Stats::new();
        ins.update_pendant_infos(&mut stats);
        assert_eq!(ins.k, 8);
        // the two survivors form a path, TRR6 eats it
        assert!(ins.trr6());
        assert!(ins.graph.is_empty());
    }

    #[test]
    fn trr6_removes_caterpillars_test() {
        let mut ins = instance("a b\nb c\nx y\ny z\nz x\n", 10);
        assert!(ins.trr6());
        // the path is gone, the triangle stays
        assert_eq!(ins.graph.num_vertices(), 3);
        assert_eq!(ins.k, 10);
        assert!(!ins.trr6());
    }

    #[test]
    fn trr6_keeps_protected_components_test() {
        let mut ins = instance("a b\nb c\n", 10);
        let a = ins.graph.vertices().next().unwrap();
        ins.graph.set_protected(a, true);
        assert!(!ins.trr6());
        assert_eq!(ins.graph.num_vertices(), 3);
    }

    #[test]
    fn ygraphify_test() {
        let mut ins = instance("a b\nb c\nc a\n", 10);
        let a = ins.graph.vertices().find(|&v| ins.graph.label(v) == "a").unwrap();
        let b = ins.graph.vertices().find(|&v| ins.graph.label(v) == "b").unwrap();
        let e = ins.graph.find_edge(a, b).unwrap();
        ins.graph.ygraphify(e);
        assert!(ins.graph.label(a).ends_with('\''));
        assert!(ins.graph.pendant_is_y(b));
        assert!(!ins.graph.adjacent(a, b));
        // the Y brings five fresh vertices
        assert_eq!(ins.graph.num_vertices(), 8);
    }
}
