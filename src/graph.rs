//! A mutable, simple, undirected graph with the incremental bookkeeping the
//! reduction engine needs: bridge marks, permanence marks, pendant
//! classification storage and a reusable generation counter for traversals.
//!
//! Vertices and half-edges live in flat arenas and are addressed by opaque
//! indices. Half-edges are allocated in twin pairs, so the reverse of edge
//! `e` is always `e ^ 1`. Cloning a graph keeps all indices valid, which is
//! what lets the search hand edge references down into cloned branches.

use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;

use fxhash::FxHashMap;
use log::trace;

use crate::cust_error::ImportError;

/// Index of a vertex in the vertex arena. Stable over the vertex's lifetime.
pub type VertexId = usize;
/// Index of a half-edge in the edge arena. The twin half-edge is `e ^ 1`.
pub type EdgeId = usize;

/// Which pendant subtrees hang off a vertex, one list per pendant shape.
/// Each entry is the edge from the vertex towards the pendant's root.
/// Newly classified pendants are pushed to the front; the rules rely on
/// this so that older, already-committed pendants survive trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendantInfo {
    pub leaves: VecDeque<EdgeId>,
    pub ptwos: VecDeque<EdgeId>,
    pub ygraphs: VecDeque<EdgeId>,
    pub tclaws: VecDeque<EdgeId>,
}

impl PendantInfo {
    pub fn count(&self) -> usize {
        self.leaves.len() + self.ptwos.len() + self.ygraphs.len() + self.tclaws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
            && self.ptwos.is_empty()
            && self.ygraphs.is_empty()
            && self.tclaws.is_empty()
    }

    pub fn clear(&mut self) {
        self.leaves.clear();
        self.ptwos.clear();
        self.ygraphs.clear();
        self.tclaws.clear();
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    label: String,
    protected: bool,
    mark: u32,
    incident_bridges: usize,
    degree: usize,
    first_edge: Option<EdgeId>,
    /// Cached edge towards the parent in the pendant forest. A hint only;
    /// invalidated on any structural change around the vertex.
    parent: Option<EdgeId>,
    pendants: PendantInfo,
}

impl Vertex {
    fn new(label: String) -> Self {
        Vertex {
            label,
            protected: false,
            mark: 0,
            incident_bridges: 0,
            degree: 0,
            first_edge: None,
            parent: None,
            pendants: PendantInfo::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct HalfEdge {
    head: VertexId,
    prev: Option<EdgeId>,
    next: Option<EdgeId>,
    bridge: bool,
    permanent: bool,
}

impl HalfEdge {
    fn new(head: VertexId) -> Self {
        HalfEdge {
            head,
            prev: None,
            next: None,
            bridge: false,
            permanent: false,
        }
    }
}

/// The graph itself. `cc_count` is only meaningful while `bridges_fresh`
/// holds; `pendants_fresh` guards the pendant classification in the same
/// way. Any structural edit drops both flags.
#[derive(Debug, Clone)]
pub struct Graph {
    verts: Vec<Option<Vertex>>,
    edges: Vec<Option<HalfEdge>>,
    live_verts: usize,
    num_edges: usize,
    pub cc_count: usize,
    pub bridges_fresh: bool,
    pub pendants_fresh: bool,
    mark_counter: u32,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

// Construction and basic accessors.
impl Graph {
    pub fn new() -> Self {
        Graph {
            verts: Vec::new(),
            edges: Vec::new(),
            live_verts: 0,
            num_edges: 0,
            cc_count: 0,
            bridges_fresh: false,
            pendants_fresh: false,
            mark_counter: 0,
        }
    }

    fn vert(&self, v: VertexId) -> &Vertex {
        self.verts[v].as_ref().expect("vertex was deleted")
    }

    fn vert_mut(&mut self, v: VertexId) -> &mut Vertex {
        self.verts[v].as_mut().expect("vertex was deleted")
    }

    fn half(&self, e: EdgeId) -> &HalfEdge {
        self.edges[e].as_ref().expect("edge was deleted")
    }

    fn half_mut(&mut self, e: EdgeId) -> &mut HalfEdge {
        self.edges[e].as_mut().expect("edge was deleted")
    }

    /// Adds an isolated vertex and returns its id.
    pub fn add_vertex<S: Into<String>>(&mut self, label: S) -> VertexId {
        let id = self.verts.len();
        self.verts.push(Some(Vertex::new(label.into())));
        self.live_verts += 1;
        id
    }

    /// Returns an `Iterator` over all vertices that have not been deleted,
    /// in ascending id order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.verts
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|_| i))
    }

    pub fn num_vertices(&self) -> usize {
        self.live_verts
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn is_empty(&self) -> bool {
        self.live_verts == 0
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.verts.get(v).map_or(false, Option::is_some)
    }

    pub fn edge_exists(&self, e: EdgeId) -> bool {
        self.edges.get(e).map_or(false, Option::is_some)
    }

    pub fn label(&self, v: VertexId) -> &str {
        &self.vert(v).label
    }

    /// Appends a marker to a vertex label, used when a rule duplicates or
    /// rewrites a vertex and its old name must stay recognisable.
    pub fn append_label(&mut self, v: VertexId, suffix: &str) {
        self.vert_mut(v).label.push_str(suffix);
    }

    pub fn protected(&self, v: VertexId) -> bool {
        self.vert(v).protected
    }

    pub fn set_protected(&mut self, v: VertexId, prot: bool) {
        self.vert_mut(v).protected = prot;
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.vert(v).degree
    }

    pub fn incident_bridges(&self, v: VertexId) -> usize {
        self.vert(v).incident_bridges
    }

    /// Removes every vertex and edge. The empty graph is trivially fresh.
    pub fn clear(&mut self) {
        self.verts.clear();
        self.edges.clear();
        self.live_verts = 0;
        self.num_edges = 0;
        self.cc_count = 0;
        self.bridges_fresh = true;
        self.pendants_fresh = true;
    }
}

// Generation marks.
impl Graph {
    /// Returns a fresh mark value guaranteed not to be set on any vertex.
    /// On counter wrap-around all vertex marks are reset to zero first.
    pub fn next_mark(&mut self) -> u32 {
        self.mark_counter = self.mark_counter.wrapping_add(1);
        if self.mark_counter == 0 {
            for slot in self.verts.iter_mut() {
                if let Some(v) = slot {
                    v.mark = 0;
                }
            }
            self.mark_counter = 1;
        }
        self.mark_counter
    }

    pub fn mark(&self, v: VertexId) -> u32 {
        self.vert(v).mark
    }

    pub fn set_mark(&mut self, v: VertexId, mark: u32) {
        self.vert_mut(v).mark = mark;
    }
}

// Half-edge navigation.
impl Graph {
    /// The twin (reversed) half-edge.
    #[inline]
    pub fn twin(&self, e: EdgeId) -> EdgeId {
        e ^ 1
    }

    /// The vertex this half-edge points to.
    #[inline]
    pub fn head(&self, e: EdgeId) -> VertexId {
        self.half(e).head
    }

    /// The vertex this half-edge points away from.
    #[inline]
    pub fn tail(&self, e: EdgeId) -> VertexId {
        self.half(e ^ 1).head
    }

    pub fn is_bridge(&self, e: EdgeId) -> bool {
        self.half(e).bridge
    }

    pub fn is_permanent(&self, e: EdgeId) -> bool {
        self.half(e).permanent
    }

    /// Commits an edge: it may never be deleted within the current branch.
    pub fn mark_permanent(&mut self, e: EdgeId) {
        self.half_mut(e).permanent = true;
        self.half_mut(e ^ 1).permanent = true;
    }

    fn set_bridge(&mut self, e: EdgeId, mark: bool) {
        let (head, tail) = (self.head(e), self.tail(e));
        self.half_mut(e).bridge = mark;
        self.half_mut(e ^ 1).bridge = mark;
        if mark {
            self.vert_mut(head).incident_bridges += 1;
            self.vert_mut(tail).incident_bridges += 1;
        } else {
            self.vert_mut(head).incident_bridges -= 1;
            self.vert_mut(tail).incident_bridges -= 1;
        }
    }

    /// First half-edge in `v`'s adjacency list.
    pub fn first_edge(&self, v: VertexId) -> Option<EdgeId> {
        self.vert(v).first_edge
    }

    /// Successor of `e` within the adjacency list of `e`'s tail.
    pub fn next_edge(&self, e: EdgeId) -> Option<EdgeId> {
        self.half(e).next
    }

    /// Iterates over the half-edges leaving `v`. Collect the ids first if
    /// the loop body mutates the graph.
    pub fn adj(&self, v: VertexId) -> AdjIter<'_> {
        AdjIter {
            graph: self,
            cur: self.vert(v).first_edge,
        }
    }

    /// Iterates over the neighbors of `v`.
    pub fn neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.adj(v).map(move |e| self.head(e))
    }

    /// Iterates over one canonical half-edge per edge.
    pub fn canonical_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len())
            .step_by(2)
            .filter(move |&e| self.edges[e].is_some())
    }

    pub fn find_edge(&self, u: VertexId, v: VertexId) -> Option<EdgeId> {
        self.adj(u).find(|&e| self.head(e) == v)
    }

    pub fn adjacent(&self, u: VertexId, v: VertexId) -> bool {
        self.find_edge(u, v).is_some()
    }

    /// A readable `u->v` form for diagnostics and the solution list.
    pub fn edge_name(&self, e: EdgeId) -> String {
        format!("{}->{}", self.label(self.tail(e)), self.label(self.head(e)))
    }
}

pub struct AdjIter<'a> {
    graph: &'a Graph,
    cur: Option<EdgeId>,
}

impl<'a> Iterator for AdjIter<'a> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<EdgeId> {
        let e = self.cur?;
        self.cur = self.graph.half(e).next;
        Some(e)
    }
}

// Structural edits.
impl Graph {
    fn link_half(&mut self, tail: VertexId, e: EdgeId) {
        let old_first = self.vert(tail).first_edge;
        if let Some(f) = old_first {
            self.half_mut(f).prev = Some(e);
        }
        {
            let h = self.half_mut(e);
            h.prev = None;
            h.next = old_first;
        }
        let v = self.vert_mut(tail);
        v.first_edge = Some(e);
        v.degree += 1;
    }

    fn unlink_half(&mut self, tail: VertexId, e: EdgeId) {
        let (prev, next) = {
            let h = self.half(e);
            (h.prev, h.next)
        };
        match prev {
            Some(p) => self.half_mut(p).next = next,
            None => self.vert_mut(tail).first_edge = next,
        }
        if let Some(n) = next {
            self.half_mut(n).prev = prev;
        }
        self.vert_mut(tail).degree -= 1;
    }

    /// Adds the edge `{u, w}` without checking for duplicates or loops.
    /// Returns the half-edge from `u` to `w`.
    pub fn add_edge(&mut self, u: VertexId, w: VertexId) -> EdgeId {
        let e = self.edges.len();
        self.edges.push(Some(HalfEdge::new(w)));
        self.edges.push(Some(HalfEdge::new(u)));
        self.link_half(u, e);
        self.link_half(w, e + 1);
        self.num_edges += 1;
        self.bridges_fresh = false;
        self.pendants_fresh = false;
        e
    }

    /// Adds `{u, w}` with the given flags, used when copying components.
    pub fn add_edge_like(
        &mut self,
        u: VertexId,
        w: VertexId,
        permanent: bool,
        bridge: bool,
    ) -> EdgeId {
        let e = self.add_edge(u, w);
        if permanent {
            self.mark_permanent(e);
        }
        if bridge {
            self.set_bridge(e, true);
        }
        e
    }

    /// Adds `{u, w}` unless it would create a loop or a parallel edge.
    pub fn try_add_edge(&mut self, u: VertexId, w: VertexId) -> Option<EdgeId> {
        if u == w || self.adjacent(u, w) {
            return None;
        }
        Some(self.add_edge(u, w))
    }

    /// Deletes an edge and returns the successor of `e` in the adjacency
    /// list of `e`'s tail, so callers may keep walking while deleting.
    pub fn delete_edge(&mut self, e: EdgeId) -> Option<EdgeId> {
        let t = self.twin(e);
        let w = self.head(e);
        let u = self.head(t);
        trace!("deleting edge {}", self.edge_name(e));

        if self.is_bridge(e) {
            self.vert_mut(u).incident_bridges -= 1;
            self.vert_mut(w).incident_bridges -= 1;
            self.cc_count += 1;
        }

        if self.vert(u).parent == Some(e) {
            self.vert_mut(u).parent = None;
        }
        if self.vert(w).parent == Some(t) {
            self.vert_mut(w).parent = None;
        }

        self.num_edges -= 1;
        self.bridges_fresh = false;
        self.pendants_fresh = false;

        let next = self.half(e).next;
        self.unlink_half(u, e);
        self.unlink_half(w, t);
        self.edges[e] = None;
        self.edges[t] = None;
        next
    }

    /// Deletes a vertex together with all incident edges.
    pub fn delete_vertex(&mut self, v: VertexId) {
        trace!("deleting vertex {}", self.label(v));
        while let Some(e) = self.vert(v).first_edge {
            self.delete_edge(e);
        }
        self.verts[v] = None;
        self.live_verts -= 1;
    }
}

// Pendant classification and the derived vertex predicates.
impl Graph {
    pub fn pendants(&self, v: VertexId) -> &PendantInfo {
        &self.vert(v).pendants
    }

    pub fn pendants_mut(&mut self, v: VertexId) -> &mut PendantInfo {
        &mut self.vert_mut(v).pendants
    }

    pub fn subtree_nh(&self, v: VertexId) -> usize {
        self.vert(v).pendants.count()
    }

    /// Degree of `v` restricted to the cyclic core; a vertex whose whole
    /// remainder is a single non-pendant neighbor is itself pendant and
    /// counts as zero.
    pub fn cyc_core_degree(&self, v: VertexId) -> usize {
        let d = self.degree(v) - self.subtree_nh(v);
        if d == 1 {
            0
        } else {
            d
        }
    }

    pub fn on_cyclic_core(&self, v: VertexId) -> bool {
        self.cyc_core_degree(v) > 0
    }

    pub fn non_bridge_degree(&self, v: VertexId) -> usize {
        self.degree(v) - self.vert(v).incident_bridges
    }

    pub fn on_cycle(&self, v: VertexId) -> bool {
        self.non_bridge_degree(v) > 0
    }

    /// Number of non-leaf neighbors. Counted from plain degrees since the
    /// pendant lists may be stale when this is needed.
    pub fn nldeg(&self, v: VertexId) -> usize {
        self.adj(v).filter(|&e| self.degree(self.head(e)) > 1).count()
    }

    pub fn is_generator(&self, v: VertexId) -> bool {
        !self.vert(v).pendants.ptwos.is_empty()
    }

    pub fn on_backbone(&self, v: VertexId) -> bool {
        let p = &self.vert(v).pendants;
        !(p.leaves.is_empty() && p.ptwos.is_empty())
    }

    pub fn pendant_is_y(&self, v: VertexId) -> bool {
        !self.vert(v).pendants.ygraphs.is_empty()
    }

    /// Whether `v` merely segments a degree-2 path instead of generating a
    /// token on it.
    pub fn is_separator(&self, v: VertexId) -> bool {
        if self.cyc_core_degree(v) != 2 {
            return false;
        }
        let p = &self.vert(v).pendants;
        if p.ptwos.len() > 1 {
            return true;
        }
        if !p.ptwos.is_empty() {
            return false;
        }
        if !p.ygraphs.is_empty() {
            return false;
        }
        if !p.leaves.is_empty() {
            return true;
        }
        // only plain degree-2 vertices remain from here on
        for e in self.adj(v) {
            let w = self.head(e);
            if self.is_generator(w) || self.cyc_core_degree(w) > 2 {
                return false;
            }
        }
        true
    }

    pub fn is_incident_to_bbridge(&self, v: VertexId) -> bool {
        self.adj(v).any(|e| self.is_bbridge(e))
    }

    pub fn first_cyclic_core_neighbor(&self, v: VertexId) -> Option<EdgeId> {
        self.adj(v).find(|&e| self.on_cyclic_core(self.head(e)))
    }

    pub fn first_cyclic_core_neighbor_except(
        &self,
        v: VertexId,
        except: VertexId,
    ) -> Option<EdgeId> {
        self.adj(v)
            .find(|&e| self.head(e) != except && self.on_cyclic_core(self.head(e)))
    }

    pub fn first_non_bridge_neighbor_except(
        &self,
        v: VertexId,
        except: VertexId,
    ) -> Option<EdgeId> {
        self.adj(v)
            .find(|&e| !self.is_bridge(e) && self.head(e) != except)
    }

    /// All non-bridge edges at `v`.
    pub fn cyclic_neighbors(&self, v: VertexId) -> Vec<EdgeId> {
        self.adj(v).filter(|&e| !self.is_bridge(e)).collect()
    }

    /// All edges at `v` whose head is on the cyclic core.
    pub fn cyclic_core_neighbors(&self, v: VertexId) -> Vec<EdgeId> {
        self.adj(v)
            .filter(|&e| self.on_cyclic_core(self.head(e)))
            .collect()
    }

    pub fn parent_hint(&self, v: VertexId) -> Option<EdgeId> {
        self.vert(v).parent
    }

    pub fn set_parent(&mut self, v: VertexId, e: EdgeId) {
        self.vert_mut(v).parent = Some(e);
    }

    pub fn invalidate_parent(&mut self, v: VertexId) {
        self.vert_mut(v).parent = None;
    }

    /// The edge from `v` towards its parent in the pendant forest, assuming
    /// all of `v`'s subtrees have registered `v` as their parent. Returns
    /// `None` for cyclic-core vertices and tree roots.
    pub fn get_parent(&mut self, v: VertexId) -> Option<EdgeId> {
        if self.on_cyclic_core(v) {
            return None;
        }
        if let Some(p) = self.vert(v).parent {
            return Some(p);
        }
        let candidates: Vec<EdgeId> = self.adj(v).collect();
        for e in candidates {
            let w = self.head(e);
            // a neighbor that has us as its parent is a child, anyone else
            // is the parent we are looking for
            let is_parent = match self.vert(w).parent {
                Some(wp) => wp != self.twin(e),
                None => true,
            };
            if is_parent {
                self.vert_mut(v).parent = Some(e);
                return Some(e);
            }
        }
        None
    }
}

// Bridges.
impl Graph {
    pub fn is_bbridge(&self, e: EdgeId) -> bool {
        self.is_bridge(e) && self.on_cyclic_core(self.tail(e)) && self.on_cyclic_core(self.head(e))
    }

    pub fn is_abridge(&self, e: EdgeId) -> bool {
        self.is_bridge(e) && !self.is_bbridge(e)
    }

    /// An A-bridge is only a legal branching candidate if its tail is a
    /// degree-2 core vertex next to some B-bridge.
    pub fn is_relevant_abridge(&self, e: EdgeId) -> bool {
        if !self.is_abridge(e) {
            return false;
        }
        let v = self.tail(e);
        self.cyc_core_degree(v) == 2 && self.is_incident_to_bbridge(v)
    }

    /// Recomputes all bridge flags, incident-bridge counters and the
    /// component count. Returns every bridge together with the number of
    /// vertices on its head side once the bridge is removed.
    pub fn compute_bridges(&mut self) -> Vec<(EdgeId, usize)> {
        // drop stale marks; edge insertions may have closed cycles
        let flagged: Vec<EdgeId> = self
            .canonical_edges()
            .filter(|&e| self.is_bridge(e))
            .collect();
        for e in flagged {
            self.set_bridge(e, false);
        }

        self.cc_count = 0;
        let mut scratch = BridgeScratch::new(self.verts.len());
        let mut bridges = Vec::new();

        let roots: Vec<VertexId> = self.vertices().collect();
        for v in roots {
            if scratch.disc[v] == 0 {
                self.cc_count += 1;
                self.bridge_dfs(v, None, &mut scratch, &mut bridges);
            }
        }

        trace!(
            "found {} bridges in {} components",
            bridges.len(),
            self.cc_count
        );
        self.bridges_fresh = true;
        bridges
    }

    fn bridge_dfs(
        &mut self,
        v: VertexId,
        parent: Option<VertexId>,
        scratch: &mut BridgeScratch,
        bridges: &mut Vec<(EdgeId, usize)>,
    ) {
        scratch.counter += 1;
        scratch.disc[v] = scratch.counter;
        scratch.low[v] = scratch.counter;
        scratch.high[v] = scratch.counter;
        scratch.nd[v] = 1;

        let mut cursor = self.first_edge(v);
        while let Some(e) = cursor {
            let w = self.head(e);
            if scratch.disc[w] == 0 {
                self.bridge_dfs(w, Some(v), scratch, bridges);
                scratch.nd[v] += scratch.nd[w];
                scratch.low[v] = scratch.low[v].min(scratch.low[w]);
                scratch.high[v] = scratch.high[v].max(scratch.high[w]);
                // no back edge escapes the subtree of w: {v, w} is a bridge
                if scratch.low[w] == scratch.disc[w]
                    && scratch.high[w] < scratch.disc[w] + scratch.nd[w]
                {
                    self.set_bridge(e, true);
                    bridges.push((e, scratch.nd[w] as usize));
                }
            } else if Some(w) != parent {
                scratch.low[v] = scratch.low[v].min(scratch.low[w]);
                scratch.high[v] = scratch.high[v].max(scratch.high[w]);
            }
            cursor = self.next_edge(e);
        }
    }

    /// Marks all bridges unless the marking is still fresh.
    pub fn mark_bridges(&mut self) {
        if !self.bridges_fresh {
            self.compute_bridges();
        }
    }

    pub fn get_bridges(&mut self) -> Vec<EdgeId> {
        self.compute_bridges().into_iter().map(|(e, _)| e).collect()
    }

    pub fn weighted_bbridges(&mut self) -> Vec<(EdgeId, usize)> {
        let bridges = self.compute_bridges();
        bridges
            .into_iter()
            .filter(|&(e, _)| self.is_bbridge(e))
            .collect()
    }

    pub fn bbridges(&mut self) -> Vec<EdgeId> {
        self.weighted_bbridges()
            .into_iter()
            .map(|(e, _)| e)
            .collect()
    }
}

struct BridgeScratch {
    counter: u32,
    disc: Vec<u32>,
    low: Vec<u32>,
    high: Vec<u32>,
    nd: Vec<u32>,
}

impl BridgeScratch {
    fn new(n: usize) -> Self {
        BridgeScratch {
            counter: 0,
            disc: vec![0; n],
            low: vec![0; n],
            high: vec![0; n],
            nd: vec![0; n],
        }
    }
}

// Connected components.
impl Graph {
    /// Deletes the connected component containing `seed`.
    pub fn delete_component(&mut self, seed: VertexId) {
        let mark = self.next_mark();
        let mut queue = VecDeque::new();
        let mut doomed = Vec::new();
        queue.push_back(seed);
        self.set_mark(seed, mark);
        while let Some(u) = queue.pop_front() {
            doomed.push(u);
            let neighbors: Vec<VertexId> = self.neighbors(u).collect();
            for w in neighbors {
                if self.mark(w) != mark {
                    self.set_mark(w, mark);
                    queue.push_back(w);
                }
            }
        }
        for u in doomed {
            self.delete_vertex(u);
        }
        self.cc_count = self.cc_count.saturating_sub(1);
    }

    /// Copies the connected component containing `seed` into `dest`,
    /// recording the id translation in `map`.
    pub fn copy_component(
        &mut self,
        seed: VertexId,
        dest: &mut Graph,
        map: &mut FxHashMap<VertexId, VertexId>,
    ) {
        let mark = self.next_mark();
        let mut queue = VecDeque::new();
        queue.push_back(seed);
        while let Some(u) = queue.pop_front() {
            if self.mark(u) == mark {
                continue;
            }
            self.set_mark(u, mark);
            let new_u = dest.add_vertex(self.label(u).to_owned());
            dest.set_protected(new_u, self.protected(u));
            map.insert(u, new_u);
            let edges: Vec<EdgeId> = self.adj(u).collect();
            for e in edges {
                let w = self.head(e);
                if self.mark(w) != mark {
                    queue.push_back(w);
                } else {
                    // w is already copied, so the edge can be drawn now
                    dest.add_edge_like(new_u, map[&w], self.is_permanent(e), self.is_bridge(e));
                }
            }
        }
        dest.bridges_fresh = false;
        dest.pendants_fresh = false;
    }

    /// Number of vertices in the connected component of `seed`.
    pub fn component_size(&mut self, seed: VertexId) -> usize {
        let mark = self.next_mark();
        let mut queue = VecDeque::new();
        let mut count = 0;
        queue.push_back(seed);
        self.set_mark(seed, mark);
        while let Some(u) = queue.pop_front() {
            count += 1;
            let neighbors: Vec<VertexId> = self.neighbors(u).collect();
            for w in neighbors {
                if self.mark(w) != mark {
                    self.set_mark(w, mark);
                    queue.push_back(w);
                }
            }
        }
        count
    }

    /// Splits one connected component off into its own graph, or returns
    /// `None` if the graph is connected or empty. Only meaningful while the
    /// component count is fresh.
    pub fn split_off_component(&mut self) -> Option<Graph> {
        if self.cc_count < 2 || self.is_empty() {
            return None;
        }
        let seed = self.vertices().next().expect("graph is not empty");
        let mut comp = Graph::new();
        let mut map = FxHashMap::default();
        self.copy_component(seed, &mut comp, &mut map);
        comp.cc_count = 1;
        self.delete_component(seed);
        Some(comp)
    }
}

/// Translates an edge of one graph into the corresponding edge of a copy
/// produced by [`Graph::copy_component`].
pub fn convert_edge(
    from: &Graph,
    e: EdgeId,
    to: &Graph,
    map: &FxHashMap<VertexId, VertexId>,
) -> EdgeId {
    to.find_edge(map[&from.tail(e)], map[&from.head(e)])
        .expect("edge has a counterpart in the copy")
}

// Feedback edge sets and degree-2 path navigation.
impl Graph {
    /// Cyclomatic complexity `|E| + cc - |V|`, the size of any minimum
    /// feedback edge set.
    pub fn fes_size(&mut self) -> usize {
        self.mark_bridges();
        self.num_edges + self.cc_count - self.live_verts
    }

    /// A concrete feedback edge set obtained from a spanning forest.
    /// Permanent edges are grown into the forest first so they never land
    /// in the returned set.
    pub fn spanning_forest_fes(&mut self) -> Vec<EdgeId> {
        let mut parent: Vec<usize> = (0..self.verts.len()).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        let mut fes = Vec::new();
        let canonical: Vec<EdgeId> = self.canonical_edges().collect();
        for pass_permanent in [true, false] {
            for &e in &canonical {
                if self.is_permanent(e) != pass_permanent {
                    continue;
                }
                let ru = find(&mut parent, self.tail(e));
                let rv = find(&mut parent, self.head(e));
                if ru == rv {
                    fes.push(e);
                } else {
                    parent[ru] = rv;
                }
            }
        }
        fes
    }

    /// Continues along a degree-2 path of the cyclic core through the head
    /// of `e`. The head must be a degree-2 core vertex.
    pub fn next_on_deg2path(&self, e: EdgeId) -> EdgeId {
        let v = self.head(e);
        if self.cyc_core_degree(v) != 2 {
            panic!(
                "next_on_deg2path called through {} whose head has core degree {}",
                self.edge_name(e),
                self.cyc_core_degree(v)
            );
        }
        self.first_cyclic_core_neighbor_except(v, self.tail(e))
            .expect("a degree-2 core vertex continues its path")
    }

    /// Continues along a cycle (non-bridge edges) through the head of `e`.
    pub fn next_on_cycle(&self, e: EdgeId) -> EdgeId {
        self.first_non_bridge_neighbor_except(self.head(e), self.tail(e))
            .expect("a cycle vertex continues its cycle")
    }
}

// Input and output.
impl Graph {
    /// Reads a whitespace edge list: one edge per line, two labels each.
    /// Duplicate edges and self-loops are ignored, labels are kept.
    pub fn read_edge_list<R: BufRead>(input: R) -> Result<Graph, ImportError> {
        let mut graph = Graph::new();
        let mut by_label: FxHashMap<String, VertexId> = FxHashMap::default();
        for line in input.lines() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            let (a, b) = match (tokens.next(), tokens.next()) {
                (None, _) => continue,
                (Some(a), Some(b)) => (a, b),
                _ => return Err(ImportError::InputMalformed),
            };
            if tokens.next().is_some() {
                return Err(ImportError::InputMalformed);
            }
            let u = *by_label
                .entry(a.to_owned())
                .or_insert_with(|| graph.add_vertex(a));
            let v = *by_label
                .entry(b.to_owned())
                .or_insert_with(|| graph.add_vertex(b));
            graph.try_add_edge(u, v);
        }
        Ok(graph)
    }

    pub fn write_to_stream<W: std::io::Write>(
        &self,
        out: &mut W,
        verbose: bool,
    ) -> std::io::Result<()> {
        if verbose {
            writeln!(out, "number of vertices: {}", self.num_vertices())?;
            writeln!(out, "number of edges: {}", self.num_edges())?;
        }
        for e in self.canonical_edges() {
            write!(out, "{}", self.edge_name(e))?;
            if verbose {
                if self.is_permanent(e) {
                    write!(out, " (P)")?;
                }
                if self.is_bridge(e) {
                    write!(out, " (B)")?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in self.canonical_edges() {
            writeln!(f, "{}", self.edge_name(e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn path_graph(n: usize) -> Graph {
        let mut g = Graph::new();
        let vs: Vec<VertexId> = (0..n).map(|i| g.add_vertex(i.to_string())).collect();
        for w in vs.windows(2) {
            g.add_edge(w[0], w[1]);
        }
        g
    }

    #[test]
    fn read_edge_list_test() {
        let input = Cursor::new("a b\nb c\nc a\na a\nb a\n");
        let g = Graph::read_edge_list(input).unwrap();
        assert_eq!(g.num_vertices(), 3);
        // the self-loop and the duplicate were dropped
        assert_eq!(g.num_edges(), 3);
    }

    #[test]
    fn bridges_in_path_test() {
        let mut g = path_graph(5);
        let bridges = g.compute_bridges();
        assert_eq!(bridges.len(), 4);
        assert_eq!(g.cc_count, 1);
        // every edge of a path is a bridge
        for v in g.vertices().collect::<Vec<_>>() {
            let flagged = g.adj(v).filter(|&e| g.is_bridge(e)).count();
            assert_eq!(g.incident_bridges(v), flagged);
            assert_eq!(flagged, g.degree(v));
        }
    }

    #[test]
    fn bridge_example_test() {
        let mut g = Graph::new();
        let vs: Vec<VertexId> = (0..6).map(|i| g.add_vertex(i.to_string())).collect();
        for (a, b) in [(0, 1), (0, 2), (2, 1), (1, 3), (3, 4), (4, 5), (5, 3)] {
            g.add_edge(vs[a], vs[b]);
        }
        let bridges = g.compute_bridges();
        assert_eq!(bridges.len(), 1);
        let (e, split) = bridges[0];
        assert_eq!(
            (g.tail(e).min(g.head(e)), g.tail(e).max(g.head(e))),
            (vs[1], vs[3])
        );
        assert_eq!(split, 3);
    }

    #[test]
    fn delete_edge_updates_components_test() {
        let mut g = path_graph(4);
        g.mark_bridges();
        assert_eq!(g.cc_count, 1);
        let e = g.find_edge(1, 2).unwrap();
        g.delete_edge(e);
        // the bridge bit keeps the component count usable until recompute
        assert_eq!(g.cc_count, 2);
        g.mark_bridges();
        assert_eq!(g.cc_count, 2);
    }

    #[test]
    fn clone_keeps_handles_test() {
        let input = Cursor::new("a b\nb c\nc a\nc d\n");
        let mut g = Graph::read_edge_list(input).unwrap();
        g.mark_bridges();
        let e = g.canonical_edges().next().unwrap();
        g.mark_permanent(e);
        let clone = g.clone();
        for f in g.canonical_edges() {
            assert_eq!(g.tail(f), clone.tail(f));
            assert_eq!(g.head(f), clone.head(f));
            assert_eq!(g.is_bridge(f), clone.is_bridge(f));
            assert_eq!(g.is_permanent(f), clone.is_permanent(f));
        }
    }

    #[test]
    fn copy_component_translates_test() {
        let input = Cursor::new("a b\nb c\nc a\nx y\n");
        let mut g = Graph::read_edge_list(input).unwrap();
        g.mark_bridges();
        assert_eq!(g.cc_count, 2);
        let seed = g.vertices().find(|&v| g.label(v) == "x").unwrap();
        let mut comp = Graph::new();
        let mut map = FxHashMap::default();
        g.copy_component(seed, &mut comp, &mut map);
        assert_eq!(comp.num_vertices(), 2);
        assert_eq!(comp.num_edges(), 1);
        let e = g
            .find_edge(seed, g.neighbors(seed).next().unwrap())
            .unwrap();
        let f = convert_edge(&g, e, &comp, &map);
        assert_eq!(comp.label(comp.tail(f)), g.label(g.tail(e)));
        assert_eq!(comp.label(comp.head(f)), g.label(g.head(e)));
        assert_eq!(comp.is_bridge(f), g.is_bridge(e));
    }

    #[test]
    fn split_off_component_test() {
        let input = Cursor::new("a b\nb c\nc a\nx y\ny z\nz x\n");
        let mut g = Graph::read_edge_list(input).unwrap();
        g.mark_bridges();
        let comp = g.split_off_component().unwrap();
        assert_eq!(comp.num_vertices(), 3);
        assert_eq!(g.num_vertices(), 3);
    }

    #[test]
    fn fes_test() {
        let input = Cursor::new("a b\nb c\nc a\n");
        let mut g = Graph::read_edge_list(input).unwrap();
        assert_eq!(g.fes_size(), 1);
        assert_eq!(g.spanning_forest_fes().len(), 1);
    }

    #[test]
    fn fes_spanning_forest_covers_all_components_test() {
        let input = Cursor::new("a b\nb c\nc a\nx y\ny z\nz x\n");
        let mut g = Graph::read_edge_list(input).unwrap();
        assert_eq!(g.fes_size(), 2);
        assert_eq!(g.spanning_forest_fes().len(), 2);
    }

    #[test]
    fn fes_avoids_permanent_edges_test() {
        let input = Cursor::new("a b\nb c\nc a\n");
        let mut g = Graph::read_edge_list(input).unwrap();
        let ab = g.canonical_edges().find(|&e| {
            let mut ends = [g.label(g.tail(e)), g.label(g.head(e))];
            ends.sort();
            ends == ["a", "b"]
        });
        g.mark_permanent(ab.unwrap());
        let fes = g.spanning_forest_fes();
        assert_eq!(fes.len(), 1);
        assert!(!g.is_permanent(fes[0]));
    }
}
