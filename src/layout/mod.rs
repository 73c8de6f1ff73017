mod boundary;
pub mod classify;
pub mod normalize;
mod placement;
mod ports;
pub mod provider;
mod ranking;
mod solver;
pub(crate) mod types;

pub use classify::{PropagationOutcome, StageRule, StageRules, propagate_stages};
pub use normalize::{
    DroppedEdge, DroppedNode, EdgeDropReason, NodeDropReason, NormalizeReport, NormalizedGraph,
    normalize,
};
pub use ports::{anchor_point, select_ports};
pub use solver::SolverError;
pub use types::*;

use std::collections::{BTreeMap, HashMap};

use crate::config::{LayoutConfig, LayoutStrategy};
use crate::ir::{Graph, Position};
use crate::theme::Theme;

use placement::{bucket_columns, place_columns};

pub fn compute_layout(graph: &Graph, theme: &Theme, config: &LayoutConfig) -> Layout {
    compute_layout_with_edits(graph, &UserEdits::default(), theme, config)
}

/// Runs the whole pipeline: classify, normalize, propagate stages, place,
/// fit boundaries, then choose ports.
pub fn compute_layout_with_edits(
    graph: &Graph,
    edits: &UserEdits,
    theme: &Theme,
    config: &LayoutConfig,
) -> Layout {
    let raw_stages: Vec<f32> = graph
        .nodes
        .iter()
        .map(|node| classify::classify(node, config))
        .collect();

    let normalized = normalize(graph);
    let mut stages: HashMap<String, f32> = normalized
        .nodes
        .iter()
        .map(|node| {
            let stage = raw_stages
                .get(node.input_index)
                .copied()
                .unwrap_or(config.default_stage);
            (node.id.clone(), stage)
        })
        .collect();

    let max_passes = config
        .propagation_max_passes
        .unwrap_or(normalized.nodes.len());
    let outcome = propagate_stages(
        &mut stages,
        &normalized.edge_pairs(),
        config.stage_increment,
        max_passes,
    );
    tracing::debug!(
        passes = outcome.passes,
        raised = outcome.raised,
        converged = outcome.converged,
        "stage propagation finished"
    );

    let explicit = has_explicit_positions(&normalized);
    let (positions, placement) = if explicit {
        let positions: HashMap<String, Position> = normalized
            .nodes
            .iter()
            .filter_map(|node| node.position.map(|p| (node.id.clone(), p)))
            .collect();
        (positions, PlacementSource::Explicit)
    } else {
        place_nodes(&normalized, &stages, config)
    };

    let mut nodes = build_node_layouts(&normalized, &positions, &stages, config);
    let pinned = apply_pins(&mut nodes, edits);

    let mut boundaries = boundary::build_boundaries(&normalized, &mut nodes, !explicit, theme, config);
    if !explicit && pinned == 0 {
        shift_into_view(&mut nodes, &mut boundaries, config.margin);
    }

    let edges = normalized
        .edges
        .iter()
        .filter_map(|edge| {
            let source = nodes.get(&edge.source)?;
            let target = nodes.get(&edge.target)?;
            Some(ports::route_edge(edge, source, target, &config.ports))
        })
        .collect::<Vec<_>>();

    let (width, height) = bounds(&nodes, &boundaries, config.margin);
    tracing::debug!(
        nodes = nodes.len(),
        boundaries = boundaries.len(),
        edges = edges.len(),
        ?placement,
        width,
        height,
        "layout complete"
    );

    Layout {
        node_order: normalized.nodes.iter().map(|node| node.id.clone()).collect(),
        nodes,
        boundaries,
        edges,
        width,
        height,
        placement,
        report: normalized.report,
    }
}

fn has_explicit_positions(graph: &NormalizedGraph) -> bool {
    !graph.nodes.is_empty()
        && graph
            .nodes
            .iter()
            .all(|node| node.position.is_some_and(|p| p.is_finite()))
}

fn place_nodes(
    graph: &NormalizedGraph,
    stages: &HashMap<String, f32>,
    config: &LayoutConfig,
) -> (HashMap<String, Position>, PlacementSource) {
    match config.strategy {
        LayoutStrategy::Columns => (place_columns(graph, stages, config), PlacementSource::Columns),
        LayoutStrategy::Solver => {
            let columns = bucket_columns(graph, stages, &HashMap::new(), config.default_stage);
            let column_of: HashMap<String, usize> = columns
                .iter()
                .enumerate()
                .flat_map(|(col, bucket)| bucket.iter().map(move |id| (id.clone(), col)))
                .collect();
            match solver::solve(graph, &column_of, config) {
                Ok(positions) => (positions, PlacementSource::Solver),
                Err(err) => {
                    tracing::warn!(error = %err, "layered solver failed; using stage columns");
                    (
                        place_columns(graph, stages, config),
                        PlacementSource::SolverFallback,
                    )
                }
            }
        }
    }
}

fn build_node_layouts(
    graph: &NormalizedGraph,
    positions: &HashMap<String, Position>,
    stages: &HashMap<String, f32>,
    config: &LayoutConfig,
) -> BTreeMap<String, NodeLayout> {
    graph
        .nodes
        .iter()
        .map(|node| {
            let position = positions
                .get(&node.id)
                .copied()
                .unwrap_or(Position::new(config.margin, config.margin));
            let layout = NodeLayout {
                id: node.id.clone(),
                label: node.label.clone(),
                component_type: node.component_type.clone(),
                shape: node.shape,
                x: position.x,
                y: position.y,
                width: config.node_width,
                height: config.node_height,
                stage: stages.get(&node.id).copied().unwrap_or(config.default_stage),
                provider: None,
                pinned: false,
            };
            (node.id.clone(), layout)
        })
        .collect()
}

/// Applies user-dragged positions; returns how many pins landed.
fn apply_pins(nodes: &mut BTreeMap<String, NodeLayout>, edits: &UserEdits) -> usize {
    if edits.is_empty() {
        return 0;
    }
    let mut applied = 0;
    for (id, position) in &edits.pinned {
        match nodes.get_mut(id) {
            Some(node) if position.is_finite() => {
                node.x = position.x;
                node.y = position.y;
                node.pinned = true;
                applied += 1;
            }
            Some(_) => tracing::warn!(id = %id, "ignoring non-finite pinned position"),
            None => tracing::debug!(id = %id, "ignoring pin for unknown node"),
        }
    }
    applied
}

/// Translates everything so nothing sits above or left of the margin.
fn shift_into_view(
    nodes: &mut BTreeMap<String, NodeLayout>,
    boundaries: &mut [BoundaryLayout],
    margin: f32,
) {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    for node in nodes.values() {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
    }
    for boundary in boundaries.iter() {
        min_x = min_x.min(boundary.x);
        min_y = min_y.min(boundary.y);
    }
    if min_x == f32::MAX {
        return;
    }

    let shift_x = if min_x < margin { margin - min_x } else { 0.0 };
    let shift_y = if min_y < margin { margin - min_y } else { 0.0 };
    if shift_x == 0.0 && shift_y == 0.0 {
        return;
    }

    for node in nodes.values_mut() {
        node.x += shift_x;
        node.y += shift_y;
    }
    for boundary in boundaries.iter_mut() {
        boundary.x += shift_x;
        boundary.y += shift_y;
    }
}

fn bounds(
    nodes: &BTreeMap<String, NodeLayout>,
    boundaries: &[BoundaryLayout],
    margin: f32,
) -> (f32, f32) {
    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    for node in nodes.values() {
        max_x = max_x.max(node.right());
        max_y = max_y.max(node.bottom());
    }
    for boundary in boundaries {
        max_x = max_x.max(boundary.x + boundary.width);
        max_y = max_y.max(boundary.y + boundary.height);
    }
    (max_x + margin, max_y + margin)
}
