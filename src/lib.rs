pub mod graph;
pub mod cust_error;
pub mod cf_instance;
pub mod kernelization;
pub mod path_reduction;
pub mod global_rules;
pub mod branching;
pub mod heuristics;
pub mod bounded_search;
pub mod statistics;
pub mod verify;
pub mod random_graphs;
