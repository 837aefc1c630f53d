//! Random connected test instances for the `rand` mode of the solver
//! binary: a random attachment tree plus a number of additional edges.

use rand::{thread_rng, Rng};

use crate::cust_error::ProcessingError;
use crate::graph::{Graph, VertexId};

/// Builds a connected graph on `n` vertices labelled `0..n`, with `n - 1`
/// tree edges and `extra_edges` additional distinct edges.
pub fn random_connected_graph(n: usize, extra_edges: usize) -> Result<Graph, ProcessingError> {
    if n == 0 {
        return Err(ProcessingError::InvalidParameter(
            "a random graph needs at least one vertex".to_owned(),
        ));
    }
    let max_extra = n * (n - 1) / 2 - (n - 1);
    if extra_edges > max_extra {
        return Err(ProcessingError::InvalidParameter(format!(
            "{} additional edges do not fit into a simple graph on {} vertices",
            extra_edges, n
        )));
    }

    let mut rng = thread_rng();
    let mut graph = Graph::new();
    let verts: Vec<VertexId> = (0..n).map(|i| graph.add_vertex(i.to_string())).collect();
    for i in 1..n {
        let j = rng.gen_range(0..i);
        graph.add_edge(verts[i], verts[j]);
    }
    let mut added = 0;
    while added < extra_edges {
        let u = verts[rng.gen_range(0..n)];
        let v = verts[rng.gen_range(0..n)];
        if graph.try_add_edge(u, v).is_some() {
            added += 1;
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_connected_graphs_test() {
        for (n, m) in [(1, 0), (2, 0), (10, 5), (20, 30)] {
            let mut g = random_connected_graph(n, m).unwrap();
            assert_eq!(g.num_vertices(), n);
            assert_eq!(g.num_edges(), n - 1 + m);
            g.mark_bridges();
            assert_eq!(g.cc_count, 1);
        }
    }

    #[test]
    fn rejects_oversized_requests_test() {
        assert!(random_connected_graph(0, 0).is_err());
        assert!(random_connected_graph(4, 4).is_err());
        assert!(random_connected_graph(4, 3).is_ok());
    }
}
