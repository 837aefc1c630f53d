//! Branching rules and branch application.
//!
//! Every rule produces candidate branch operations: a list of branches,
//! each branch a list of graph modifications (edge deletion or replacement
//! by a Y-pendant). The driver picks the operation with the smallest
//! branching number, clones the instance per branch and recurses. After a
//! failed single-deletion branch, the tried edge becomes permanent for the
//! remaining siblings.

use fxhash::FxHashSet;
use log::debug;

use crate::bounded_search::SolvOptions;
use crate::cf_instance::{CfInstance, Solution};
use crate::global_rules::exists_gen_free_path;
use crate::graph::{EdgeId, Graph, VertexId};
use crate::path_reduction::PathInfo;
use crate::statistics::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModKind {
    /// Delete the edge, charging the budget.
    Del,
    /// Replace the edge by a Y-pendant at its head, free of budget.
    Yify,
    /// Keep the whole degree-2 path this edge starts; realised by cutting
    /// the path out and planting P2s on its anchors.
    KeepPath,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphMod {
    pub kind: ModKind,
    pub edge: EdgeId,
}

pub type ModList = Vec<GraphMod>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchType {
    Triangle,
    Claw0,
    Claw1,
    Claw2,
    Claw3,
    Deg2Path,
    Token,
    BBridge,
}

impl BranchType {
    pub const ALL: &'static [BranchType] = &[
        BranchType::Triangle,
        BranchType::Claw0,
        BranchType::Claw1,
        BranchType::Claw2,
        BranchType::Claw3,
        BranchType::Deg2Path,
        BranchType::Token,
        BranchType::BBridge,
    ];
}

impl std::fmt::Display for BranchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BranchType::Triangle => "Triangle",
            BranchType::Claw0 => "Claw0",
            BranchType::Claw1 => "Claw1",
            BranchType::Claw2 => "Claw2",
            BranchType::Claw3 => "Claw3",
            BranchType::Deg2Path => "Deg2Path",
            BranchType::Token => "Token",
            BranchType::BBridge => "B-bridge",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct BranchOp {
    pub kind: BranchType,
    pub branches: Vec<ModList>,
    pub bnum: f64,
}

impl BranchOp {
    fn new(kind: BranchType) -> Self {
        BranchOp {
            kind,
            branches: Vec::new(),
            bnum: 0.0,
        }
    }
}

/// The branching number of a branch-size vector: the positive root `x` of
/// `sum x^(-b_i) = 1`, found by bisection on `t = 1/x`. Empty branches
/// count as size one.
pub fn branch_number(sizes: &[usize]) -> f64 {
    if sizes.is_empty() {
        return f64::MAX;
    }
    if sizes.len() == 1 {
        return 1.0;
    }
    let poly = |t: f64| -> f64 { sizes.iter().map(|&b| t.powi(b.max(1) as i32)).sum() };
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..64 {
        let mid = (lo + hi) / 2.0;
        if poly(mid) < 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    2.0 / (lo + hi)
}

pub fn branch_number_of(bop: &BranchOp) -> f64 {
    let sizes: Vec<usize> = bop.branches.iter().map(|ml| ml.len()).collect();
    branch_number(&sizes)
}

/// Appends one branch to `bop`, dropping A-bridges: they are never part of
/// an optimal deletion set.
fn add_branch(graph: &Graph, bop: &mut BranchOp, edges: &[EdgeId], kind: ModKind) {
    let ml: ModList = edges
        .iter()
        .copied()
        .filter(|&e| !graph.is_abridge(e))
        .map(|e| GraphMod { kind, edge: e })
        .collect();
    bop.branches.push(ml);
}

/// Walks a degree-2 path from `direction` until a branching vertex or
/// `do_not_cross` is met; returns the last edge walked.
pub fn skip_deg2path(graph: &Graph, mut direction: EdgeId, do_not_cross: VertexId) -> EdgeId {
    loop {
        let to = graph.head(direction);
        if to == do_not_cross || graph.cyc_core_degree(to) != 2 {
            return direction;
        }
        direction = graph.next_on_deg2path(direction);
    }
}

// BRR1: triangles.

/// A triangle `u - v - w` branches its two `v`-edges together when `v` is
/// an inner vertex carrying a Y, or when all three corners are bare.
fn triangle_is_degenerate(graph: &Graph, v: VertexId, u: VertexId, w: VertexId) -> bool {
    if graph.cyc_core_degree(v) == 2 && graph.pendant_is_y(v) {
        return true;
    }
    graph.cyc_core_degree(u) == 2
        && graph.cyc_core_degree(w) == 2
        && graph.pendants(v).count() == 0
        && graph.pendants(u).count() == 0
        && graph.pendants(w).count() == 0
}

/// Finds a cyclic triangle at `v` and enumerates its deletion branches,
/// skipping permanent edges.
fn brr1(graph: &Graph, v: VertexId, ops: &mut Vec<BranchOp>) -> bool {
    let non_bridges = graph.cyclic_neighbors(v);
    for (i, &a) in non_bridges.iter().enumerate() {
        for &b in &non_bridges[i + 1..] {
            let c = match graph.find_edge(graph.head(a), graph.head(b)) {
                Some(c) => c,
                None => continue,
            };
            let mut bop = BranchOp::new(BranchType::Triangle);
            if triangle_is_degenerate(graph, v, graph.head(a), graph.head(b)) {
                if !graph.is_permanent(a) && !graph.is_permanent(b) {
                    bop.branches.push(vec![
                        GraphMod {
                            kind: ModKind::Del,
                            edge: a,
                        },
                        GraphMod {
                            kind: ModKind::Del,
                            edge: b,
                        },
                    ]);
                }
                if !graph.is_permanent(c) {
                    bop.branches.push(vec![GraphMod {
                        kind: ModKind::Del,
                        edge: c,
                    }]);
                }
            } else {
                for e in [a, b, c] {
                    if !graph.is_permanent(e) {
                        bop.branches.push(vec![GraphMod {
                            kind: ModKind::Del,
                            edge: e,
                        }]);
                    }
                }
            }
            if !bop.branches.is_empty() {
                // the exact root gains nothing over the branch count here
                bop.bnum = bop.branches.len() as f64;
                ops.push(bop);
                // one triangle per vertex is enough
                return true;
            }
        }
    }
    false
}

// BRR2-5: 2-claws.

struct ClawLeg {
    head: EdgeId,
    e_set: Vec<EdgeId>,
}

/// Branching heads must not be leaves and must not point into a Y-pendant
/// sitting on a degree-2 path.
fn is_eligible_branching_head(graph: &Graph, e: EdgeId) -> bool {
    if graph.degree(graph.head(e)) == 1 {
        return false;
    }
    let v = graph.tail(e);
    if graph.non_bridge_degree(v) == 2 && graph.pendant_is_y(v) {
        if graph.pendants(v).ygraphs[0] == e {
            return false;
        }
    }
    true
}

fn get_non_abridge_branching_heads(graph: &Graph, v: VertexId) -> Vec<EdgeId> {
    graph
        .adj(v)
        .filter(|&e| !graph.is_abridge(e) && is_eligible_branching_head(graph, e))
        .collect()
}

/// If deleting `el[i]` would turn `el[j]` into a bridge, demote `el[j]`.
/// An empty list afterwards means no valid head triple exists.
fn bring_in_order(graph: &Graph, el: &mut Vec<EdgeId>, i: usize, j: usize) {
    let v = graph.tail(el[i]);
    let e = skip_deg2path(graph, el[i], v);
    if e == graph.twin(el[j]) {
        if j + 1 >= el.len() {
            el.clear();
        } else {
            el.swap(j, j + 1);
        }
    }
}

/// Orders the candidate heads and keeps the best three, so that degree-2
/// heads trail and no head turns a later head into an A-bridge.
fn select_branching_heads(graph: &Graph, el: &mut Vec<EdgeId>) -> bool {
    let v = graph.tail(el[0]);
    let ptwos = graph.pendants(v).ptwos.len();
    if el.len() + ptwos < 3 {
        return false;
    }
    debug_assert!(ptwos < 3);

    el.sort_by_key(|&e| {
        let head = graph.head(e);
        let deg = graph.degree(head);
        let pendant = !graph.pendants(head).leaves.is_empty()
            || !graph.pendants(head).ptwos.is_empty();
        (deg != 2, !pendant, usize::MAX - deg)
    });

    if ptwos == 0 {
        if graph.degree(graph.head(el[0])) == 2 {
            bring_in_order(graph, el, 0, 1);
        }
        if el.is_empty() {
            return false;
        }
        if graph.degree(graph.head(el[0])) > 2 && graph.degree(graph.head(el[1])) == 2 {
            bring_in_order(graph, el, 1, 2);
        }
        if el.is_empty() {
            return false;
        }
    }
    el.truncate(3 - ptwos);
    true
}

/// Every edge at the head of `ei` except the connection back.
fn compute_ei(graph: &Graph, ei: EdgeId) -> Vec<EdgeId> {
    let vi = graph.head(ei);
    let back = graph.twin(ei);
    graph.adj(vi).filter(|&e| e != back).collect()
}

fn brr2(graph: &Graph, legs: &[ClawLeg], ops: &mut Vec<BranchOp>) -> bool {
    let mut bop = BranchOp::new(BranchType::Claw0);
    let mut heads = Vec::new();
    for leg in legs {
        if leg.e_set.len() != 1 {
            return false;
        }
        add_branch(graph, &mut bop, &leg.e_set, ModKind::Del);
        heads.push(leg.head);
    }
    if heads.len() > 2 {
        add_branch(graph, &mut bop, &heads, ModKind::Del);
    }
    debug!("BRR2 built a {}-branch op", bop.branches.len());
    ops.push(bop);
    true
}

fn brr3(graph: &Graph, legs: &[ClawLeg], ops: &mut Vec<BranchOp>) -> bool {
    let mut big_vertices = 0;
    let mut bop = BranchOp::new(BranchType::Claw1);
    let mut small_heads = Vec::new();
    for leg in legs {
        if leg.e_set.len() > 1 {
            big_vertices += 1;
            if big_vertices > 1 {
                return false;
            }
            add_branch(graph, &mut bop, &leg.e_set, ModKind::Del);
            add_branch(graph, &mut bop, &[leg.head], ModKind::Del);
        } else {
            add_branch(graph, &mut bop, &leg.e_set, ModKind::Del);
            small_heads.push(leg.head);
        }
    }
    if small_heads.len() > 1 {
        add_branch(graph, &mut bop, &small_heads, ModKind::Del);
    }
    ops.push(bop);
    true
}

fn brr4(graph: &Graph, legs: &[ClawLeg], ops: &mut Vec<BranchOp>) -> bool {
    let mut big_vertices = 0;
    let mut bop = BranchOp::new(BranchType::Claw2);
    for leg in legs {
        if leg.e_set.len() > 1 {
            big_vertices += 1;
            if big_vertices > 2 {
                return false;
            }
            add_branch(graph, &mut bop, &leg.e_set, ModKind::Del);
            add_branch(graph, &mut bop, &[leg.head], ModKind::Del);
        } else {
            add_branch(graph, &mut bop, &leg.e_set, ModKind::Del);
        }
    }
    ops.push(bop);
    true
}

fn brr5(graph: &Graph, legs: &[ClawLeg], ops: &mut Vec<BranchOp>) {
    let mut bop = BranchOp::new(BranchType::Claw3);
    for leg in legs {
        add_branch(graph, &mut bop, &leg.e_set, ModKind::Del);
        add_branch(graph, &mut bop, &[leg.head], ModKind::Del);
    }
    ops.push(bop);
}

/// Branches on a 2-claw at `v`: pick three branching heads and split on
/// which of their edge sets leaves the solution.
fn brr2_to_5(graph: &Graph, v: VertexId, ops: &mut Vec<BranchOp>) -> bool {
    if graph.nldeg(v) < 3 {
        return false;
    }
    let mut heads = get_non_abridge_branching_heads(graph, v);
    if heads.is_empty() {
        return false;
    }
    if !select_branching_heads(graph, &mut heads) {
        return false;
    }
    let legs: Vec<ClawLeg> = heads
        .iter()
        .map(|&e| ClawLeg {
            head: e,
            e_set: compute_ei(graph, e),
        })
        .collect();
    if brr2(graph, &legs, ops) {
        return true;
    }
    if brr3(graph, &legs, ops) {
        return true;
    }
    if brr4(graph, &legs, ops) {
        return true;
    }
    brr5(graph, &legs, ops);
    true
}

// BRR6: the token rule.

/// Deduplicates `v`'s neighborhood for the token rule: A-bridges and
/// second entries to the same degree-2 loop are dropped, and the first
/// path carrying a separator becomes the `disallowed` leg that every
/// branch must keep.
fn get_clean_neighbors_and_disallowed(
    graph: &Graph,
    v: VertexId,
) -> (Vec<EdgeId>, Option<EdgeId>) {
    let mut used: FxHashSet<VertexId> = FxHashSet::default();
    let mut clean = Vec::new();
    let mut disallowed = None;
    let has_p2 = !graph.pendants(v).ptwos.is_empty();

    for e in graph.adj(v) {
        if graph.is_abridge(e) {
            continue;
        }
        if graph.is_bridge(e) || has_p2 {
            used.insert(graph.head(e));
            clean.push(e);
            if disallowed.is_none() {
                let mut f = e;
                if skip_deg2path_finding_separators(graph, &mut f, v) {
                    disallowed = Some(e);
                }
            }
        } else {
            let mut f = e;
            let has_separator = skip_deg2path_finding_separators(graph, &mut f, v);
            // drop the second entry of a loop that comes back to v
            if graph.head(f) != v || !used.contains(&graph.tail(f)) {
                used.insert(graph.head(e));
                clean.push(e);
                if has_separator && disallowed.is_none() {
                    disallowed = Some(e);
                }
            }
        }
    }
    (clean, disallowed)
}

fn skip_deg2path_finding_separators(
    graph: &Graph,
    e: &mut EdgeId,
    do_not_cross: VertexId,
) -> bool {
    let mut result = false;
    loop {
        let head = graph.head(*e);
        if head == do_not_cross || graph.cyc_core_degree(head) >= 3 {
            return result;
        }
        if graph.is_separator(head) {
            result = true;
        }
        *e = graph.next_on_deg2path(*e);
    }
}

/// BRR6: guess which two legs of the caterpillar pass through `v` and
/// Y-graphify all others. Off the backbone, `v` may instead become a leaf,
/// which adds one guess per potential sole neighbor.
fn brr6(graph: &Graph, v: VertexId, ops: &mut Vec<BranchOp>) -> bool {
    if !(graph.on_cyclic_core(v) && graph.nldeg(v) > 2) {
        return false;
    }
    let mut bop = BranchOp::new(BranchType::Token);
    let has_p2 = !graph.pendants(v).ptwos.is_empty();
    debug_assert!(graph.pendants(v).ptwos.len() < 2);

    let (clean_nh, disallowed) = get_clean_neighbors_and_disallowed(graph, v);
    let has_disallowed = disallowed.is_some();
    if clean_nh.len() + (has_p2 as usize) < 3 {
        return false;
    }
    debug!(
        "token rule at {} with {} clean neighbors",
        graph.label(v),
        clean_nh.len()
    );

    // collect the leg sets to keep; a P2 or a separator path occupies one
    // of the two slots
    let mut keep_legs: Vec<FxHashSet<EdgeId>> = Vec::new();
    if has_p2 && has_disallowed {
        keep_legs.push(FxHashSet::default());
    } else {
        for (i, &keep1) in clean_nh.iter().enumerate() {
            if Some(keep1) == disallowed {
                continue;
            }
            if !has_p2 && !has_disallowed {
                for &keep2 in &clean_nh[i + 1..] {
                    let mut legs = FxHashSet::default();
                    legs.insert(keep1);
                    legs.insert(keep2);
                    keep_legs.push(legs);
                }
            } else {
                let mut legs = FxHashSet::default();
                legs.insert(keep1);
                keep_legs.push(legs);
            }
        }
    }

    for mut legs in keep_legs {
        if let Some(d) = disallowed {
            legs.insert(d);
        }
        let branch: Vec<EdgeId> = clean_nh
            .iter()
            .copied()
            .filter(|e| !legs.contains(e))
            .collect();
        add_branch(graph, &mut bop, &branch, ModKind::Yify);
    }

    if !graph.on_backbone(v) {
        let perms: Vec<EdgeId> = graph.adj(v).filter(|&e| graph.is_permanent(e)).collect();
        if perms.len() >= 2 {
            // two committed edges through v: it can never become a leaf
            ops.push(bop);
            return true;
        }
        let all: Vec<EdgeId> = graph.adj(v).collect();
        if let Some(&keep) = perms.first() {
            let el: Vec<EdgeId> = all.iter().copied().filter(|&f| f != keep).collect();
            add_branch(graph, &mut bop, &el, ModKind::Del);
        } else {
            for &e in &all {
                let el: Vec<EdgeId> = all.iter().copied().filter(|&f| f != e).collect();
                add_branch(graph, &mut bop, &el, ModKind::Del);
            }
        }
    }
    ops.push(bop);
    true
}

// BRR7/8: anchored degree-2 paths.

fn bb_branching_applicable(graph: &Graph, info: &PathInfo) -> bool {
    if !info.generators.is_empty() {
        return false;
    }
    let u = graph.tail(info.start);
    let v = graph.head(info.end);
    if !graph.on_backbone(u) || !graph.on_backbone(v) {
        return false;
    }
    // u and v must be weakly separated once the path itself is removed
    let x = graph.head(info.start);
    !exists_gen_free_path(graph, v, u, x)
}

/// BRR7/8: a generator-free path between two backbone anchors either loses
/// its second edge on one of the two sides, or survives whole; the last
/// case is an explicit keep-path branch.
fn brr78(graph: &Graph, info: &PathInfo, ops: &mut Vec<BranchOp>) -> bool {
    if !bb_branching_applicable(graph, info) {
        return false;
    }
    let mut bop = BranchOp::new(BranchType::Deg2Path);
    if info.length > 1 {
        let to_del_left = if graph.is_separator(graph.head(info.start)) {
            info.start
        } else {
            graph.next_on_deg2path(info.start)
        };
        add_branch(graph, &mut bop, &[to_del_left], ModKind::Del);
        if info.length > 2 {
            let rev_end = graph.twin(info.end);
            if graph.is_separator(graph.head(rev_end)) {
                add_branch(graph, &mut bop, &[rev_end], ModKind::Del);
            } else if graph.head(rev_end) != graph.head(to_del_left) {
                add_branch(
                    graph,
                    &mut bop,
                    &[graph.next_on_deg2path(rev_end)],
                    ModKind::Del,
                );
            }
        }
    } else {
        add_branch(graph, &mut bop, &[info.start], ModKind::Del);
    }
    if !bop.branches.is_empty() {
        bop.branches.push(vec![GraphMod {
            kind: ModKind::KeepPath,
            edge: info.start,
        }]);
    }
    debug!("BRR78 built a {}-branch op", bop.branches.len());
    ops.push(bop);
    true
}

// Best-op selection.

fn single_branches(bop: &BranchOp) -> usize {
    bop.branches
        .iter()
        .filter(|ml| ml.len() == 1 && ml[0].kind == ModKind::Del)
        .count()
}

/// Smallest branching number wins; ties break towards fewer single-delete
/// branches. The winner's branches are ordered singles-first with the
/// largest branch rotated to the front.
fn select_best_branch(ops: &[BranchOp]) -> (BranchOp, f64) {
    let mut best_idx = 0;
    let mut best_bnum = f64::MAX;
    let mut best_singles = usize::MAX;
    for (i, bop) in ops.iter().enumerate() {
        let bnum = if bop.bnum != 0.0 {
            bop.bnum
        } else {
            branch_number_of(bop)
        };
        if bnum > best_bnum {
            continue;
        }
        let singles = single_branches(bop);
        if bnum < best_bnum || singles < best_singles {
            best_bnum = bnum;
            best_singles = singles;
            best_idx = i;
        }
    }
    let mut best = ops[best_idx].clone();
    best.branches.sort_by_key(|ml| (ml.len() != 1, ml.len()));
    if let Some(largest) = best.branches.pop() {
        best.branches.insert(0, largest);
    }
    (best, best_bnum)
}

/// Collects branch operations from BRR6, BRR7/8, BRR1 and BRR2-5, in that
/// order, short-circuiting on any size-1 operation (a reduction in
/// disguise). With `quick_select`, the scan stops early once an operation
/// at or below `branch_threshold` is found.
pub fn get_best_branch_op(
    graph: &Graph,
    path_infos: &[PathInfo],
    quick_select: bool,
    branch_threshold: f64,
) -> Option<BranchOp> {
    let mut ops: Vec<BranchOp> = Vec::new();
    let verts: Vec<VertexId> = graph.vertices().collect();

    // the token rule produces the best size-1 commitments, try it first
    for &v in &verts {
        if brr6(graph, v, &mut ops) {
            if ops.last().expect("just pushed").branches.len() == 1 {
                return ops.pop();
            }
        }
    }
    if quick_select && !ops.is_empty() {
        let (best, bnum) = select_best_branch(&ops);
        if bnum <= branch_threshold {
            return Some(best);
        }
        ops = vec![best];
    }

    for info in path_infos {
        if brr78(graph, info, &mut ops) {
            if ops.last().expect("just pushed").branches.len() == 1 {
                return ops.pop();
            }
        }
    }
    if quick_select && !ops.is_empty() {
        let (best, bnum) = select_best_branch(&ops);
        if bnum <= branch_threshold {
            return Some(best);
        }
        ops = vec![best];
    }

    for &v in &verts {
        if graph.on_cycle(v) && brr1(graph, v, &mut ops) {
            if ops.last().expect("just pushed").branches.len() == 1 {
                return ops.pop();
            }
        }
    }
    for &v in &verts {
        if graph.on_cycle(v) && brr2_to_5(graph, v, &mut ops) {
            if ops.last().expect("just pushed").branches.len() == 1 {
                return ops.pop();
            }
        }
    }

    if ops.is_empty() {
        return None;
    }
    Some(select_best_branch(&ops).0)
}

// Branch application.

fn apply_del(ins: &mut CfInstance, e: EdgeId, sol: &mut Solution) {
    ins.delete_edge_into(e, sol);
}

/// Replaces the edge by a Y-pendant at its head. A permanent edge cannot
/// go, so everything else at the head goes instead.
fn apply_yify(ins: &mut CfInstance, e: EdgeId, sol: &mut Solution) {
    let v = ins.graph.tail(e);
    let u = ins.graph.head(e);
    let u_name = ins.graph.label(u).to_owned();
    let v_name = ins.graph.label(v).to_owned();

    if !ins.graph.is_permanent(e) {
        ins.graph.delete_edge(e);
        ins.graph.add_y(u, &v_name);
    } else {
        let keep = ins.graph.twin(e);
        let edges: Vec<EdgeId> = ins.graph.adj(u).collect();
        for f in edges {
            if f != keep {
                apply_del(ins, f, sol);
            }
        }
    }
    if !ins.graph.on_backbone(v) {
        let marker = format!("{}*", u_name);
        ins.graph.add_leaf(v, &marker);
    }
}

/// Cuts out the whole degree-2 path starting with `to_del` and plants P2
/// pendants on both anchors: the branch that guesses the path survives in
/// the caterpillar. No budget is charged.
fn apply_keep_path(ins: &mut CfInstance, mut to_del: EdgeId) {
    let u = ins.graph.tail(to_del);
    while ins.graph.cyc_core_degree(ins.graph.head(to_del)) < 3 && ins.graph.head(to_del) != u {
        let next = ins.graph.next_on_deg2path(to_del);
        ins.graph.delete_edge(to_del);
        to_del = next;
    }
    let v = ins.graph.head(to_del);
    ins.graph.delete_edge(to_del);
    ins.graph.add_p2(u, "");
    ins.graph.add_p2(v, "");
}

pub fn apply_one_branch(ins: &mut CfInstance, ml: &ModList, sol: &mut Solution) {
    for m in ml {
        match m.kind {
            ModKind::Del => apply_del(ins, m.edge, sol),
            ModKind::Yify => apply_yify(ins, m.edge, sol),
            ModKind::KeepPath => apply_keep_path(ins, m.edge),
        }
    }
}

/// Clones the instance per branch, applies the branch's modifications and
/// recurses, keeping the smallest successful solution. Once a
/// single-deletion branch is done, its edge is committed as permanent for
/// the remaining branches.
pub fn apply_branch_op(
    bop: &BranchOp,
    ins: &mut CfInstance,
    stats: &mut Stats,
    opts: &SolvOptions,
    depth: usize,
) -> Option<Solution> {
    let mut min_sol: Option<Solution> = None;
    let mut known_solution = ins.k + 1;

    for ml in &bop.branches {
        // branches that already exceed the budget cannot win; the token
        // and path rules carry free modifications and are exempt
        if bop.kind != BranchType::Token && bop.kind != BranchType::Deg2Path {
            if ml.len() as i64 > ins.k.min(known_solution - 1) {
                continue;
            }
        }
        debug!("depth {} branch of size {}", depth, ml.len());

        let mut probe = ins.clone();
        probe.k = ins.k.min(known_solution - 1);
        let mut branch_sol = Solution::new();
        apply_one_branch(&mut probe, ml, &mut branch_sol);
        if let Some(rest) = probe.run_search(stats, opts, depth + 1) {
            branch_sol.extend(rest);
            known_solution = branch_sol.len() as i64;
            min_sol = Some(branch_sol);
        }

        // the sibling branches may now assume this edge stays
        if ml.len() == 1 && ml[0].kind == ModKind::Del {
            ins.graph.mark_permanent(ml[0].edge);
        }
    }
    min_sol
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cf_instance::CfInstance;
    use crate::statistics::Stats;
    use std::io::Cursor;

    #[test]
    fn branch_number_test() {
        // two unit branches halve the budget: x = 2
        assert!((branch_number(&[1, 1]) - 2.0).abs() < 1e-4);
        // the golden ratio
        assert!((branch_number(&[1, 2]) - 1.6180).abs() < 1e-4);
        // three double branches: x = sqrt(3)
        assert!((branch_number(&[2, 2, 2]) - 3f64.sqrt()).abs() < 1e-4);
        // the defining equation holds to the required precision
        for sizes in [&[1usize, 1, 1][..], &[2, 3, 4], &[1, 4]] {
            let x = branch_number(sizes);
            let sum: f64 = sizes.iter().map(|&b| x.powi(-(b as i32))).sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn branch_number_degenerate_test() {
        assert_eq!(branch_number(&[]), f64::MAX);
        assert_eq!(branch_number(&[5]), 1.0);
    }

    #[test]
    fn brr1_on_bare_triangle_test() {
        let graph = crate::graph::Graph::read_edge_list(Cursor::new("a b\nb c\nc a\n")).unwrap();
        let mut ins = CfInstance::new(graph, 10);
        let mut stats = Stats::new();
        ins.update_pendant_infos(&mut stats);
        let mut ops = Vec::new();
        let v = ins.graph.vertices().next().unwrap();
        assert!(brr1(&ins.graph, v, &mut ops));
        let bop = &ops[0];
        assert_eq!(bop.kind, BranchType::Triangle);
        // all three corners are bare: the degenerate pairing applies
        assert_eq!(bop.branches.len(), 2);
        assert_eq!(bop.branches[0].len(), 2);
        assert_eq!(bop.branches[1].len(), 1);
    }

    #[test]
    fn brr1_on_shared_corner_test() {
        let graph =
            crate::graph::Graph::read_edge_list(Cursor::new("a b\nb c\nc a\nc d\nd e\ne c\n"))
                .unwrap();
        let mut ins = CfInstance::new(graph, 10);
        let mut stats = Stats::new();
        ins.update_pendant_infos(&mut stats);
        let mut ops = Vec::new();
        let v = ins.graph.vertices().next().unwrap();
        assert!(brr1(&ins.graph, v, &mut ops));
        // the shared corner has core degree four, so the triangle is not
        // degenerate and every edge branches alone
        assert_eq!(ops[0].branches.len(), 3);
        assert!(ops[0].branches.iter().all(|ml| ml.len() == 1));
    }

    #[test]
    fn permanent_edges_shrink_branching_test() {
        let graph =
            crate::graph::Graph::read_edge_list(Cursor::new("a b\nb c\nc a\nc d\nd e\ne c\n"))
                .unwrap();
        let mut ins = CfInstance::new(graph, 10);
        let mut stats = Stats::new();
        ins.update_pendant_infos(&mut stats);
        let a = ins.graph.vertices().next().unwrap();
        let b = ins.graph.neighbors(a).next().unwrap();
        let e = ins.graph.find_edge(a, b).unwrap();
        ins.graph.mark_permanent(e);
        let mut ops = Vec::new();
        assert!(brr1(&ins.graph, a, &mut ops));
        for ml in &ops[0].branches {
            for m in ml {
                assert!(!ins.graph.is_permanent(m.edge));
            }
        }
    }

    #[test]
    fn select_best_branch_test() {
        let mut cheap = BranchOp::new(BranchType::Claw0);
        cheap.branches = vec![
            vec![GraphMod {
                kind: ModKind::Del,
                edge: 0,
            }],
            vec![
                GraphMod {
                    kind: ModKind::Del,
                    edge: 2,
                },
                GraphMod {
                    kind: ModKind::Del,
                    edge: 4,
                },
            ],
        ];
        let mut costly = BranchOp::new(BranchType::Claw3);
        costly.branches = vec![
            vec![GraphMod {
                kind: ModKind::Del,
                edge: 6,
            }],
            vec![GraphMod {
                kind: ModKind::Del,
                edge: 8,
            }],
        ];
        // (1,2) branches at the golden ratio, (1,1) at two
        let (best, bnum) = select_best_branch(&[costly, cheap]);
        assert_eq!(best.kind, BranchType::Claw0);
        assert!((bnum - 1.6180).abs() < 1e-3);
        // the largest branch leads
        assert_eq!(best.branches[0].len(), 2);
    }
}
