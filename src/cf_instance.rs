//! The solver instance: a graph together with the remaining deletion budget,
//! and the textual solution the search accumulates.

use std::fmt;

use itertools::Itertools;

use crate::graph::{EdgeId, Graph};

/// One entry of a solution. Most deletions name a concrete edge; some rules
/// only commit to a deletion count without naming the edge, and those
/// entries stay as placeholders for the verifier to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionEdge {
    /// A concrete edge, identified by the labels of its endpoints.
    Named { tail: String, head: String },
    /// Some edge incident to the named vertex.
    Incident(String),
    /// Some edge on the compressed path between the two named vertices.
    Between(String, String),
    /// Some non-bridge edge, emitted by the greedy upper bound.
    NonBridge,
}

impl SolutionEdge {
    pub fn named(graph: &Graph, e: EdgeId) -> Self {
        SolutionEdge::Named {
            tail: graph.label(graph.tail(e)).to_owned(),
            head: graph.label(graph.head(e)).to_owned(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        !matches!(self, SolutionEdge::Named { .. })
    }
}

impl fmt::Display for SolutionEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionEdge::Named { tail, head } => write!(f, "{}->{}", tail, head),
            SolutionEdge::Incident(v) => write!(f, "{}->?", v),
            SolutionEdge::Between(u, v) => write!(f, "[some edge between {} and {}]", u, v),
            SolutionEdge::NonBridge => write!(f, "[a non-bridge]"),
        }
    }
}

pub type Solution = Vec<SolutionEdge>;

pub fn format_solution(sol: &Solution) -> String {
    sol.iter().map(|e| e.to_string()).join(", ")
}

/// A graph plus the remaining edge-deletion budget. A negative budget marks
/// a failed search branch.
#[derive(Debug, Clone)]
pub struct CfInstance {
    pub graph: Graph,
    pub k: i64,
}

impl CfInstance {
    pub fn new(graph: Graph, k: i64) -> Self {
        CfInstance { graph, k }
    }

    /// Deletes an edge, charging the budget. Returns the successor of `e`
    /// in the adjacency list of `e`'s tail.
    pub fn delete_edge(&mut self, e: EdgeId) -> Option<EdgeId> {
        self.k -= 1;
        self.graph.delete_edge(e)
    }

    /// Deletes an edge, charging the budget and naming the edge in `sol`.
    pub fn delete_edge_into(&mut self, e: EdgeId, sol: &mut Solution) -> Option<EdgeId> {
        sol.push(SolutionEdge::named(&self.graph, e));
        self.delete_edge(e)
    }

    pub fn delete_edges_into(&mut self, edges: &[EdgeId], sol: &mut Solution) {
        for &e in edges {
            self.delete_edge_into(e, sol);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn solution_entry_display_test() {
        let named = SolutionEdge::Named {
            tail: "a".into(),
            head: "b".into(),
        };
        assert_eq!(named.to_string(), "a->b");
        assert_eq!(SolutionEdge::Incident("v".into()).to_string(), "v->?");
        assert_eq!(
            SolutionEdge::Between("u".into(), "v".into()).to_string(),
            "[some edge between u and v]"
        );
        assert_eq!(SolutionEdge::NonBridge.to_string(), "[a non-bridge]");
        assert!(!named.is_placeholder());
        assert!(SolutionEdge::NonBridge.is_placeholder());
    }

    #[test]
    fn delete_edge_charges_budget_test() {
        let g = Graph::read_edge_list(Cursor::new("a b\nb c\n")).unwrap();
        let mut ins = CfInstance::new(g, 2);
        let e = ins.graph.canonical_edges().next().unwrap();
        let mut sol = Solution::new();
        ins.delete_edge_into(e, &mut sol);
        assert_eq!(ins.k, 1);
        assert_eq!(sol.len(), 1);
        assert_eq!(ins.graph.num_edges(), 1);
    }
}
