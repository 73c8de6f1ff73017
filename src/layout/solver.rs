//! Optional external layered solver (dagre).
//!
//! The solver is untrusted: a panic inside it, or any node coming back
//! without finite coordinates, counts as failure and the caller falls back
//! to the deterministic column placement.

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use thiserror::Error;

use crate::config::LayoutConfig;
use crate::ir::Position;

use super::normalize::NormalizedGraph;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("nothing to lay out")]
    Empty,
    #[error("solver panicked: {0}")]
    Panicked(String),
    #[error("solver returned no position for '{0}'")]
    MissingNode(String),
    #[error("solver returned a non-finite position for '{0}'")]
    NonFinite(String),
}

/// Edge `minlen` keeps stage columns apart inside the solver.
fn edge_minlen(
    source: &str,
    target: &str,
    column_of: &HashMap<String, usize>,
) -> f32 {
    match (column_of.get(source), column_of.get(target)) {
        (Some(from), Some(to)) if to > from => (to - from) as f32,
        _ => 1.0,
    }
}

fn run_dagre(
    graph: &NormalizedGraph,
    column_of: &HashMap<String, usize>,
    config: &LayoutConfig,
) -> HashMap<String, (f32, f32)> {
    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some("LR".to_string());
    graph_config.nodesep = Some(config.solver.node_spacing);
    graph_config.ranksep = Some(config.solver.rank_spacing);
    graph_config.marginx = Some(config.margin);
    graph_config.marginy = Some(config.margin);
    dagre_graph.set_graph(graph_config);

    for node in &graph.nodes {
        let mut dagre_node = DagreNode::default();
        dagre_node.width = config.node_width;
        dagre_node.height = config.node_height;
        dagre_graph.set_node(node.id.clone(), Some(dagre_node));
    }

    let mut edge_set: HashSet<(String, String)> = HashSet::new();
    for edge in &graph.edges {
        if !edge_set.insert((edge.source.clone(), edge.target.clone())) {
            continue;
        }
        let mut edge_label = DagreEdge::default();
        edge_label.minlen = Some(edge_minlen(&edge.source, &edge.target, column_of));
        let _ = dagre_graph.set_edge(&edge.source, &edge.target, Some(edge_label), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    let mut centers = HashMap::new();
    for node in &graph.nodes {
        if let Some(dagre_node) = dagre_graph.node(&node.id) {
            centers.insert(node.id.clone(), (dagre_node.x, dagre_node.y));
        }
    }
    centers
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Top-left positions from the solver, or the reason it could not be used.
pub(super) fn solve(
    graph: &NormalizedGraph,
    column_of: &HashMap<String, usize>,
    config: &LayoutConfig,
) -> Result<HashMap<String, Position>, SolverError> {
    if graph.nodes.is_empty() {
        return Err(SolverError::Empty);
    }

    let centers = catch_unwind(AssertUnwindSafe(|| run_dagre(graph, column_of, config)))
        .map_err(|payload| SolverError::Panicked(panic_message(payload.as_ref())))?;

    let mut positions = HashMap::new();
    for node in &graph.nodes {
        let Some((cx, cy)) = centers.get(&node.id).copied() else {
            return Err(SolverError::MissingNode(node.id.clone()));
        };
        let position = Position::new(cx - config.node_width / 2.0, cy - config.node_height / 2.0);
        if !position.is_finite() {
            return Err(SolverError::NonFinite(node.id.clone()));
        }
        positions.insert(node.id.clone(), position);
    }
    Ok(positions)
}
